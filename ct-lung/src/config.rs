//! 流水线配置.
//!
//! 配置以 JSON 文件给出, 缺省字段取 [`PipelineConfig::default`] 中的值.
//! 示例:
//!
//! ```json
//! {
//!     "smoothing": { "domain_sigma": 2.0, "range_sigma": 50.0 },
//!     "threshold": [450, 1000],
//!     "growth": { "connectivity": "slice" },
//!     "seeds": [
//!         { "slices": [17, 19], "seeds": [[192, 275], [358, 216]], "band": [-600, -100] },
//!         { "slice": 20, "seeds": [[192, 275], [358, 212]], "band": [-600, -100] }
//!     ],
//!     "loader": { "spacing": [2.5, 0.7, 0.7], "rescale": { "slope": 1.0, "intercept": -1024.0 } },
//!     "previews": "middle"
//! }
//! ```

use crate::consts::defaults;
use crate::data::is_valid_spacing;
use crate::error::ConfigError;
use crate::filter::SmoothingParams;
use crate::grow::Connectivity;
use crate::seeds::{SeedEntry, SeedTable, SliceSpan};
use crate::threshold::Band;
use crate::CtWindow;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 区域生长配置.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrowthConfig {
    /// 邻接方式.
    pub connectivity: Connectivity,
}

/// 线性强度重映射 `v * slope + intercept`, 在加载时施加.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Rescale {
    /// 斜率.
    pub slope: f32,

    /// 截距.
    pub intercept: f32,
}

impl Default for Rescale {
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl Rescale {
    /// 是否为恒等映射?
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.slope == 1.0 && self.intercept == 0.0
    }

    /// 施加映射.
    #[inline]
    pub fn apply(&self, v: f32) -> f32 {
        v * self.slope + self.intercept
    }
}

/// 体数据加载配置.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// `[z, 高, 宽]` 体素间距 (毫米). 对切片目录缺省为单位间距;
    /// 对 nifti 文件, 给出时覆盖 header 中的值.
    pub spacing: Option<[f64; 3]>,

    /// 强度重映射.
    pub rescale: Rescale,
}

/// 要输出哪些中间结果预览.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Previews {
    /// 只输出平滑结果和阈值结果的中间层.
    #[default]
    Middle,

    /// 输出每一层的平滑结果和阈值结果.
    All,
}

/// 预览窗口.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    /// 窗位.
    pub level: f32,

    /// 窗宽.
    pub width: f32,
}

/// 流水线完整配置.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// 双边滤波参数.
    pub smoothing: SmoothingParams,

    /// 全局阈值区间.
    pub threshold: Band,

    /// 区域生长配置.
    pub growth: GrowthConfig,

    /// 切片种子表.
    pub seeds: SeedTable,

    /// 加载配置.
    pub loader: LoaderConfig,

    /// 预览范围.
    pub previews: Previews,

    /// 扫描切片预览窗口. 缺省时每张图按自身强度范围取窗.
    pub window: Option<WindowConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // 常量区间都满足 lower <= upper, 种子表非空.
        let band = |lower, upper| Band::new(lower, upper).unwrap_or_else(|e| panic!("{e}"));
        let entry = SeedEntry::new(
            SliceSpan::Slice(0),
            defaults::SEEDS.to_vec(),
            band(defaults::GROW_LOWER, defaults::GROW_UPPER),
        );
        Self {
            smoothing: SmoothingParams::default(),
            threshold: band(defaults::THRESHOLD_LOWER, defaults::THRESHOLD_UPPER),
            growth: GrowthConfig::default(),
            seeds: SeedTable::new(vec![entry]).unwrap_or_else(|e| panic!("{e}")),
            loader: LoaderConfig::default(),
            previews: Previews::default(),
            window: None,
        }
    }
}

impl PipelineConfig {
    /// 从 JSON 文本解析并校验.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件读取并校验.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// 校验反序列化阶段无法覆盖的约束. 区间与种子表在构建时已经校验过.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.smoothing.validate()?;
        if let Some(spacing) = self.loader.spacing {
            if !is_valid_spacing(&spacing) {
                return Err(ConfigError::InvalidSpacing(spacing));
            }
        }
        let Rescale { slope, intercept } = self.loader.rescale;
        if !(slope.is_finite() && intercept.is_finite()) || slope == 0.0 {
            return Err(ConfigError::InvalidRescale { slope, intercept });
        }
        self.preview_window()?;
        Ok(())
    }

    /// 获取配置的预览窗口. 未配置时返回 `Ok(None)`.
    pub fn preview_window(&self) -> Result<Option<CtWindow>, ConfigError> {
        match self.window {
            None => Ok(None),
            Some(WindowConfig { level, width }) => CtWindow::new(level, width)
                .map(Some)
                .ok_or(ConfigError::InvalidWindow { level, width }),
        }
    }
}

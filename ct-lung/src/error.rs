//! 运行时错误.
//!
//! 只有 [`LoadError`] 和 [`ConfigError`] 是致命的; [`GeometryError`] 与 [`SinkError`]
//! 会在发生处被记录, 流水线继续处理其余种子/切片/预览图.

use crate::seeds::Seed;
use crate::Idx3d;
use std::path::PathBuf;
use thiserror::Error;

/// 配置错误. 在流水线开始处理体数据之前报告.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 区间下限大于上限, 或区间端点不是有限值.
    #[error("invalid band [{lower}, {upper}]: lower must not exceed upper and both must be finite")]
    InvalidBand {
        /// 下限.
        lower: f32,
        /// 上限.
        upper: f32,
    },

    /// 切片区间首尾颠倒.
    #[error("invalid slice range [{first}, {last}]")]
    InvalidSliceRange {
        /// 起始切片.
        first: usize,
        /// 终止切片 (含).
        last: usize,
    },

    /// 种子表为空.
    #[error("seed table has no entries")]
    EmptySeedTable,

    /// 某个种子表项没有种子.
    #[error("seed table entry #{0} lists no seeds")]
    EmptySeedList(usize),

    /// 种子表项没有给出, 或同时给出了 `slice` 与 `slices`.
    #[error("seed table entry must give exactly one of `slice` or `slices`")]
    AmbiguousSpan,

    /// 滤波参数非法.
    #[error("invalid smoothing parameter `{name}` = {value}: must be positive and finite")]
    InvalidSmoothing {
        /// 参数名.
        name: &'static str,
        /// 参数值.
        value: f64,
    },

    /// 体素间距非法.
    #[error("invalid voxel spacing {0:?}: every axis must be positive and finite")]
    InvalidSpacing([f64; 3]),

    /// 线性重映射参数非法.
    #[error("invalid rescale: slope = {slope}, intercept = {intercept}")]
    InvalidRescale {
        /// 斜率.
        slope: f32,
        /// 截距.
        intercept: f32,
    },

    /// 预览窗口参数非法.
    #[error("invalid preview window: level = {level}, width = {width}")]
    InvalidWindow {
        /// 窗位.
        level: f32,
        /// 窗宽.
        width: f32,
    },

    /// 配置文件读取失败.
    #[error("cannot read config `{path}`: {source}")]
    Io {
        /// 配置文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 配置文件格式错误.
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 几何错误. 目前只有种子越界一种.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// 种子越界. `shape` 为体数据形状 `(z, 高, 宽)`.
    #[error("seed {seed} lies outside volume of shape {shape:?}")]
    SeedOutOfBounds {
        /// 越界种子.
        seed: Seed,
        /// 体数据形状.
        shape: Idx3d,
    },
}

/// 体数据加载错误. 致命.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 路径不存在.
    #[error("input `{0}` does not exist")]
    Missing(PathBuf),

    /// 目录中没有可识别的切片文件.
    #[error("input directory `{0}` contains no slice images")]
    Empty(PathBuf),

    /// 既不是目录也不是 nifti 文件.
    #[error("input `{0}` is neither a directory nor a nifti file")]
    Unsupported(PathBuf),

    /// 覆盖用的体素间距不是正的有限值.
    #[error("invalid voxel spacing override {0:?}: every axis must be positive and finite")]
    InvalidSpacing([f64; 3]),

    /// 切片尺寸不一致.
    #[error("slice `{path}` has shape {found:?}, expected {expected:?}")]
    InconsistentGeometry {
        /// 出问题的切片.
        path: PathBuf,
        /// 期望形状 `(高, 宽)`.
        expected: (usize, usize),
        /// 实际形状 `(高, 宽)`.
        found: (usize, usize),
    },

    /// nifti 数据不是三维的.
    #[error("nifti `{path}` has {dims} dimensions, expected 3")]
    NotVolume {
        /// 文件路径.
        path: PathBuf,
        /// 实际维数.
        dims: u16,
    },

    /// 读取目录或文件失败.
    #[error("cannot read `{path}`: {source}")]
    Io {
        /// 出错路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 切片图像解码失败.
    #[error("cannot decode slice `{path}`: {source}")]
    Decode {
        /// 出错路径.
        path: PathBuf,
        /// 底层错误.
        source: image::ImageError,
    },

    /// nifti 解析失败.
    #[error("cannot read nifti `{path}`: {source}")]
    Nifti {
        /// 出错路径.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// 数组形状错误.
    #[error("cannot assemble volume: {0}")]
    Layout(#[from] ndarray::ShapeError),
}

/// 预览图持久化错误. 记录后跳过.
#[derive(Debug, Error)]
pub enum SinkError {
    /// 无法创建输出目录.
    #[error("cannot prepare output directory `{path}`: {source}")]
    Io {
        /// 目录路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// 图像编码或写入失败.
    #[error("cannot write `{path}`: {source}")]
    Image {
        /// 目标文件.
        path: PathBuf,
        /// 底层错误.
        source: image::ImageError,
    },
}

//! 体数据加载.
//!
//! 支持两种输入:
//!
//! 1. 目录: 每个可识别的图像文件是一层切片, 按文件名的自然顺序 (数字段按数值比较) 叠放;
//! 2. `.nii` / `.nii.gz` 文件.
//!
//! 两种输入都会在最后施加配置中的强度重映射.

mod directory;
mod nii;

use crate::config::LoaderConfig;
use crate::data::is_valid_spacing;
use crate::error::LoadError;
use crate::{Volume, VolumeAttr};
use std::path::Path;

pub use directory::{natural_key, NameChunk};

/// 从 `path` 加载体数据.
///
/// # 错误
///
/// - 路径不存在: [`LoadError::Missing`];
/// - 目录中没有切片: [`LoadError::Empty`];
/// - 切片尺寸不一致: [`LoadError::InconsistentGeometry`];
/// - `options.spacing` 含非正或非有限分量: [`LoadError::InvalidSpacing`];
/// - 解码失败或读写失败: 其它变体.
pub fn load<P: AsRef<Path>>(path: P, options: &LoaderConfig) -> Result<Volume, LoadError> {
    let path = path.as_ref();
    if let Some(spacing) = options.spacing.filter(|s| !is_valid_spacing(s)) {
        return Err(LoadError::InvalidSpacing(spacing));
    }
    if !path.exists() {
        return Err(LoadError::Missing(path.to_owned()));
    }
    let volume = if path.is_dir() {
        directory::load_dir(path, options.spacing)?
    } else if nii::is_nifti(path) {
        nii::load_file(path, options.spacing)?
    } else {
        return Err(LoadError::Unsupported(path.to_owned()));
    };

    let volume = if options.rescale.is_identity() {
        volume
    } else {
        let spacing = volume.spacing();
        let rescale = options.rescale;
        let mut raw = volume.into_raw();
        raw.mapv_inplace(|v| rescale.apply(v));
        Volume::with_spacing(raw, spacing)
    };
    log::info!(
        "loaded `{}`: shape {:?}, spacing {:?}",
        path.display(),
        volume.shape(),
        volume.spacing()
    );
    Ok(volume)
}

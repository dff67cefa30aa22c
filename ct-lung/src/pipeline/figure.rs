//! 预览图记录.

use crate::{Idx2d, OwnedMaskSlice, OwnedScanSlice};

/// 平滑结果中间层的标签.
pub const SMOOTHED_MIDDLE: &str = "Smoothed Lung Image (Middle Slice)";

/// 阈值结果中间层的标签.
pub const BINARY_MIDDLE: &str = "Binary Lung Image (Middle Slice)";

/// 第 `z` 层平滑结果的标签.
#[inline]
pub fn smoothed_label(z: usize) -> String {
    format!("Smoothed Lung Image (Slice {z})")
}

/// 第 `z` 层阈值结果的标签.
#[inline]
pub fn binary_label(z: usize) -> String {
    format!("Binary Lung Image (Slice {z})")
}

/// 第 `z` 层区域生长结果的标签.
#[inline]
pub fn grown_label(z: usize) -> String {
    format!("Region Grown Lung Image (Slice {z})")
}

/// 预览图内容.
#[derive(Clone, Debug, PartialEq)]
pub enum FigureImage {
    /// 强度切片.
    Scan(OwnedScanSlice),

    /// 掩膜切片.
    Mask(OwnedMaskSlice),
}

/// 一张待输出的预览图: 二维切片与标签. 队列顺序即生成顺序.
#[derive(Clone, Debug, PartialEq)]
pub struct FigureRecord {
    /// 切片.
    pub image: FigureImage,

    /// 标签, 同时用作输出文件名.
    pub label: String,
}

impl FigureRecord {
    /// 强度切片预览.
    #[inline]
    pub fn scan<S: Into<String>>(slice: OwnedScanSlice, label: S) -> Self {
        Self {
            image: FigureImage::Scan(slice),
            label: label.into(),
        }
    }

    /// 掩膜切片预览.
    #[inline]
    pub fn mask<S: Into<String>>(slice: OwnedMaskSlice, label: S) -> Self {
        Self {
            image: FigureImage::Mask(slice),
            label: label.into(),
        }
    }

    /// 切片形状 (高, 宽).
    pub fn shape(&self) -> Idx2d {
        match &self.image {
            FigureImage::Scan(s) => s.as_immutable().shape(),
            FigureImage::Mask(m) => m.as_immut().shape(),
        }
    }
}

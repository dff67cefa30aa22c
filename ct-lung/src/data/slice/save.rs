//! 图像的持久化存储.

use crate::{CtWindow, MaskSlice, ScanSlice};
use image::{GrayImage, ImageResult, Luma};
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 对于 [`MaskSlice`] 这类仅存在 0, 1 像素值的图像, 在保存时会映射为黑白;
/// 对于扫描切片, 在保存时会经过 CT 窗口规范化, 见 [`WindowedScan`].
pub trait ImgWriteVis {
    /// 按照一定的可视化规则渲染为 8-bit 灰度图.
    fn render(&self) -> GrayImage;

    /// 按照一定的可视化规则将图片保存到 `path` 路径. 格式由扩展名决定.
    #[inline]
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.render().save(path)
    }
}

/// 使像素更有利于单通道可视化.
#[inline]
pub(crate) fn pretty(label: u8) -> u8 {
    use crate::consts::gray::*;
    match label {
        MASK_BACKGROUND => BLACK,
        MASK_FOREGROUND => WHITE,
        any_else => panic!("只允许掩膜存在 0, 1 像素, 但发现了 `{any_else}`"),
    }
}

/// 会将背景/前景像素分别映射为黑色/白色. 不允许其他颜色.
impl ImgWriteVis for MaskSlice<'_> {
    fn render(&self) -> GrayImage {
        let (height, width) = self.shape();
        let mut buf = GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            buf.put_pixel(w as u32, h as u32, Luma([pretty(pix)]));
        }
        buf
    }
}

/// 带 CT 窗口的扫描切片, 用于渲染.
pub struct WindowedScan<'a> {
    slice: ScanSlice<'a>,
    window: CtWindow,
}

impl<'a> ScanSlice<'a> {
    /// 以 `window` 渲染该切片. 若 `window` 为 `None`,
    /// 则用切片自身的有限值范围构造窗口 (全常量或全非有限值的切片退化为单位窗口).
    pub fn windowed(self, window: Option<CtWindow>) -> WindowedScan<'a> {
        let window = window
            .or_else(|| {
                self.finite_range()
                    .and_then(|(lo, hi)| CtWindow::from_range(lo, hi))
            })
            .unwrap_or_else(CtWindow::unit);
        WindowedScan {
            slice: self,
            window,
        }
    }
}

/// 非有限值 (NaN, inf) 渲染为黑色.
impl ImgWriteVis for WindowedScan<'_> {
    fn render(&self) -> GrayImage {
        let (height, width) = self.slice.shape();
        let mut buf = GrayImage::new(width as u32, height as u32);
        for ((h, w), &v) in self.slice.indexed_iter() {
            let gray = self.window.eval(v).unwrap_or(u8::MIN);
            buf.put_pixel(w as u32, h as u32, Luma([gray]));
        }
        buf
    }
}

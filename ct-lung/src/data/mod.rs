use std::ops::Index;

use ndarray::{Array2, Array3, ArrayView, Axis, Ix3};

use crate::consts::gray::*;
use crate::{Idx2d, Idx3d};

pub mod slice;
pub mod window;

pub use slice::{ImgWriteVis, MaskSlice, OwnedMaskSlice, OwnedScanSlice, ScanSlice, WindowedScan};

pub(crate) use slice::PosIter;

pub use window::CtWindow;

/// 缺省体素分辨率 (毫米), 用于没有几何信息的输入.
pub const UNIT_SPACING: [f64; 3] = [1.0; 3];

/// 体数据几何信息的共用属性和部分通用操作.
///
/// [`Volume`] 和 [`Mask`] 共享同一套几何: 由某个 `Volume` 派生的掩膜形状与其完全相同.
pub trait VolumeAttr {
    /// 获取数据形状大小 `(z, 高, 宽)`.
    fn shape(&self) -> Idx3d;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    fn spacing(&self) -> [f64; 3];

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }
}

/// 间距是否每个分量都是正的有限值?
#[inline]
pub(crate) fn is_valid_spacing(spacing: &[f64; 3]) -> bool {
    spacing.iter().all(|s| s.is_finite() && *s > 0.0)
}

/// 3D 强度体数据, 以 `f32` 保存, 按 `(z, 高, 宽)` 组织.
///
/// 构建后不可修改. 各处理阶段总是产生新的 `Volume`.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array3<f32>,
    spacing: [f64; 3],
}

impl VolumeAttr for Volume {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    #[inline]
    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }
}

impl Index<Idx3d> for Volume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Volume {
    /// 以单位间距构建体数据.
    #[inline]
    pub fn new(data: Array3<f32>) -> Self {
        Self::with_spacing(data, UNIT_SPACING)
    }

    /// 以给定的 `[z, 高, 宽]` 间距 (毫米) 构建体数据.
    ///
    /// 如果任一间距不是正的有限值, 则程序 panic.
    pub fn with_spacing(data: Array3<f32>, spacing: [f64; 3]) -> Self {
        assert!(is_valid_spacing(&spacing), "非法体素间距: {spacing:?}");
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };
        Self { data, spacing }
    }

    /// 将一组同尺寸的水平切片按顺序叠成体数据.
    ///
    /// 如果切片为空或尺寸不一致, 则返回 `Err`.
    pub fn from_slices(
        slices: &[Array2<f32>],
        spacing: [f64; 3],
    ) -> Result<Self, ndarray::ShapeError> {
        let views: Vec<_> = slices.iter().map(|s| s.view()).collect();
        let data = ndarray::stack(Axis(0), &views)?;
        Ok(Self::with_spacing(data, spacing))
    }

    /// 获取体素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx3d) -> Option<&f32> {
        self.data.get(pos)
    }

    /// 获取 3D 扫描 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ScanSlice<'_> {
        ScanSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取中间层切片视图. 对偶数层数取靠后的一层.
    ///
    /// 当体数据没有切片时 panic.
    #[inline]
    pub fn middle_slice(&self) -> ScanSlice<'_> {
        self.slice_at(self.len_z() / 2)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<f32> {
        self.data
    }

    /// 以 `(最小值, 最大值)` 返回体数据的有限值范围. 不存在有限值时返回 `None`.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        finite_range(self.data.iter().copied())
    }
}

/// 求有限值的 `(最小值, 最大值)`.
pub(crate) fn finite_range<I: IntoIterator<Item = f32>>(it: I) -> Option<(f32, f32)> {
    it.into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// 3D 二值掩膜, 以 `u8` 保存. 只包含 [`MASK_BACKGROUND`] 和 [`MASK_FOREGROUND`].
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array3<u8>,
    spacing: [f64; 3],
}

impl VolumeAttr for Mask {
    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    #[inline]
    fn spacing(&self) -> [f64; 3] {
        self.spacing
    }
}

impl Index<Idx3d> for Mask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl Mask {
    /// 直接初始化. 调用方负责保证取值只有 0 和 1.
    #[inline]
    pub(crate) fn from_raw(data: Array3<u8>, spacing: [f64; 3]) -> Self {
        debug_assert!(data.iter().all(|p| *p <= MASK_FOREGROUND));
        Self { data, spacing }
    }

    /// 将逐层的切片掩膜叠成 3D 掩膜. `None` 层视为全背景.
    ///
    /// 如果 `slices.len()` 或任一切片尺寸与 `geometry` 不符, 则程序 panic.
    pub fn from_slices<G: VolumeAttr>(geometry: &G, slices: &[Option<&OwnedMaskSlice>]) -> Self {
        assert_eq!(slices.len(), geometry.len_z(), "切片数不符");
        let mut data = Array3::zeros(geometry.shape());
        for (mut dst, src) in data.axis_iter_mut(Axis(0)).zip(slices.iter()) {
            if let Some(src) = src {
                dst.assign(&src.as_immut().array_view());
            }
        }
        Self::from_raw(data, geometry.spacing())
    }

    /// 获取 3D 掩膜 z 空间的第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> MaskSlice<'_> {
        MaskSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取中间层切片视图.
    ///
    /// 当掩膜没有切片时 panic.
    #[inline]
    pub fn middle_slice(&self) -> MaskSlice<'_> {
        self.slice_at(self.len_z() / 2)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 给定位置是否为前景. 越界视为背景.
    #[inline]
    pub fn is_foreground_at(&self, pos: Idx3d) -> bool {
        self.data.get(pos).is_some_and(|p| is_foreground(*p))
    }

    /// 统计前景体素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_volume_geometry() {
        let v = Volume::with_spacing(Array3::zeros((3, 4, 5)), [2.5, 0.5, 0.5]);
        assert_eq!(v.shape(), (3, 4, 5));
        assert_eq!(v.slice_shape(), (4, 5));
        assert_eq!(v.size(), 60);
        assert!(v.check(&(2, 3, 4)));
        assert!(!v.check(&(3, 0, 0)));
        assert_eq!(v.middle_slice().shape(), (4, 5));
    }

    #[test]
    #[should_panic]
    fn test_volume_rejects_bad_spacing() {
        let _ = Volume::with_spacing(Array3::zeros((1, 1, 1)), [1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_finite_range_skips_nan() {
        let mut raw = Array3::<f32>::zeros((1, 2, 2));
        raw[(0, 0, 0)] = f32::NAN;
        raw[(0, 0, 1)] = -3.0;
        raw[(0, 1, 1)] = 7.0;
        assert_eq!(Volume::new(raw).finite_range(), Some((-3.0, 7.0)));
        assert_eq!(finite_range([f32::NAN]), None);
    }

    #[test]
    fn test_mask_from_slices() {
        let geometry = Volume::new(Array3::zeros((2, 2, 2)));
        let mut raw = ndarray::Array2::<u8>::zeros((2, 2));
        raw[(1, 0)] = MASK_FOREGROUND;
        let sli = OwnedMaskSlice::from_raw(raw);
        let mask = Mask::from_slices(&geometry, &[None, Some(&sli)]);
        assert_eq!(mask.count_foreground(), 1);
        assert!(mask.is_foreground_at((1, 1, 0)));
        assert!(!mask.is_foreground_at((0, 1, 0)));
        assert!(!mask.is_foreground_at((9, 9, 9)));
    }
}

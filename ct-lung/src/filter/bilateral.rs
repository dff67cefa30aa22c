//! 三维双边滤波 (边缘保持平滑).
//!
//! 输出体素是窗口内邻居的加权平均, 权重为两项高斯之积:
//!
//! - 空间 (domain) 权重: 按物理距离衰减, 距离由体素间距换算;
//! - 强度 (range) 权重: 按与中心体素的强度差衰减. 强度差远大于 `range_sigma`
//!   的邻居几乎不参与平均, 边缘因此得以保留.
//!
//! 窗口在三个轴上同时展开, 层间边缘与层内边缘受到同样的保护.
//! 越界邻居按 clamp-to-edge 取样.

use crate::consts::defaults;
use crate::data::PosIter;
use crate::error::ConfigError;
use crate::{Volume, VolumeAttr};
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};
use serde::Deserialize;

/// 双边滤波参数.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmoothingParams {
    /// 空间高斯标准差, 以毫米为单位.
    pub domain_sigma: f64,

    /// 强度高斯标准差.
    pub range_sigma: f64,

    /// 单轴窗口半径为 `ceil(radius_factor * domain_sigma / 间距)`,
    /// 并被限制在 `[1, MAX_RADIUS]` 内.
    pub radius_factor: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            domain_sigma: defaults::DOMAIN_SIGMA,
            range_sigma: defaults::RANGE_SIGMA,
            radius_factor: defaults::RADIUS_FACTOR,
        }
    }
}

impl SmoothingParams {
    /// 校验参数: 三个参数都必须是正的有限值.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("domain_sigma", self.domain_sigma),
            ("range_sigma", self.range_sigma),
            ("radius_factor", self.radius_factor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidSmoothing { name, value });
            }
        }
        Ok(())
    }

    /// 按体素间距 `[z, 高, 宽]` 求各轴窗口半径.
    fn radii(&self, spacing: [f64; 3]) -> [usize; 3] {
        spacing.map(|s| {
            let r = (self.radius_factor * self.domain_sigma / s).ceil();
            // NaN/inf 在 `validate` 与间距校验之后不会出现.
            (r as usize).clamp(1, defaults::MAX_RADIUS)
        })
    }
}

/// 空间核的一个采样点: 偏移与空间权重.
#[derive(Copy, Clone, Debug)]
struct Tap {
    dz: isize,
    dh: isize,
    dw: isize,
    weight: f64,
}

/// 预先计算的空间核.
fn domain_kernel(params: &SmoothingParams, spacing: [f64; 3]) -> Vec<Tap> {
    let [rz, rh, rw] = params.radii(spacing).map(|r| r as isize);
    let denom = 2.0 * params.domain_sigma * params.domain_sigma;
    let [sz, sh, sw] = spacing;

    let mut taps = Vec::with_capacity(((2 * rz + 1) * (2 * rh + 1) * (2 * rw + 1)) as usize);
    for dz in -rz..=rz {
        for dh in -rh..=rh {
            for dw in -rw..=rw {
                let (pz, ph, pw) = (dz as f64 * sz, dh as f64 * sh, dw as f64 * sw);
                let dist2 = pz * pz + ph * ph + pw * pw;
                taps.push(Tap {
                    dz,
                    dh,
                    dw,
                    weight: (-dist2 / denom).exp(),
                });
            }
        }
    }
    taps
}

/// 将 `i + d` 截断到 `[0, len)`.
#[inline]
fn clamp_offset(i: usize, d: isize, len: usize) -> usize {
    (i as isize + d).clamp(0, len as isize - 1) as usize
}

/// 滤波第 `z` 层, 写入 `dst`.
fn filter_slice(
    src: &ArrayView3<f32>,
    taps: &[Tap],
    range_denom: f64,
    z: usize,
    mut dst: ArrayViewMut2<f32>,
) {
    let (depth, height, width) = src.dim();
    for (h, w) in PosIter::new((height, width)) {
        let center = src[(z, h, w)] as f64;

        // 以 `center + Σ w·(v - center) / Σ w` 计算加权平均:
        // 常量区域的强度差恒为 0, 输出与输入逐位相同.
        let mut num = 0.0f64;
        let mut den = 0.0f64;
        for tap in taps {
            let nz = clamp_offset(z, tap.dz, depth);
            let nh = clamp_offset(h, tap.dh, height);
            let nw = clamp_offset(w, tap.dw, width);
            let diff = src[(nz, nh, nw)] as f64 - center;
            let weight = tap.weight * (-(diff * diff) / range_denom).exp();
            num += weight * diff;
            den += weight;
        }
        dst[(h, w)] = if den > 0.0 {
            (center + num / den) as f32
        } else {
            center as f32
        };
    }
}

/// 对整个体数据做三维双边滤波, 返回同形状、同间距的新体数据.
///
/// 参数非法时在处理任何体素之前返回 `Err`. 启用 `rayon` feature 时按切片并行.
pub fn smooth(volume: &Volume, params: &SmoothingParams) -> Result<Volume, ConfigError> {
    params.validate()?;
    let spacing = volume.spacing();
    let taps = domain_kernel(params, spacing);
    let range_denom = 2.0 * params.range_sigma * params.range_sigma;
    log::debug!(
        "bilateral: radii {:?}, {} taps per voxel",
        params.radii(spacing),
        taps.len()
    );

    let src = volume.data();
    let mut out = Array3::<f32>::zeros(volume.shape());

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            use ndarray::parallel::prelude::*;

            out.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(z, dst)| filter_slice(&src, &taps, range_denom, z, dst));
        } else {
            for (z, dst) in out.axis_iter_mut(Axis(0)).enumerate() {
                filter_slice(&src, &taps, range_denom, z, dst);
            }
        }
    }

    Ok(Volume::with_spacing(out, spacing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> SmoothingParams {
        SmoothingParams::default()
    }

    #[test]
    fn test_constant_volume_unchanged() {
        let v = Volume::with_spacing(Array3::from_elem((3, 6, 7), -723.25), [2.5, 0.7, 0.7]);
        let s = smooth(&v, &params()).unwrap();
        assert_eq!(s, v);
    }

    #[test]
    fn test_shape_and_spacing_preserved() {
        let raw = Array3::from_shape_fn((2, 3, 4), |(z, h, w)| (z * 100 + h * 10 + w) as f32);
        let v = Volume::with_spacing(raw, [3.0, 1.0, 1.0]);
        let s = smooth(&v, &params()).unwrap();
        assert_eq!(s.shape(), v.shape());
        assert_eq!(s.spacing(), v.spacing());
    }

    #[test]
    fn test_rejects_bad_params() {
        let v = Volume::new(Array3::zeros((1, 1, 1)));
        for bad in [
            SmoothingParams { domain_sigma: 0.0, ..params() },
            SmoothingParams { range_sigma: -1.0, ..params() },
            SmoothingParams { radius_factor: f64::NAN, ..params() },
        ] {
            assert!(matches!(smooth(&v, &bad), Err(ConfigError::InvalidSmoothing { .. })));
        }
    }

    #[test]
    fn test_edge_preserved_noise_reduced() {
        // 左半 0, 右半 1000, 左半加入幅度 10 的棋盘噪声.
        let raw = Array3::from_shape_fn((3, 8, 8), |(z, h, w)| {
            if w >= 4 {
                1000.0
            } else if (z + h + w) % 2 == 0 {
                10.0
            } else {
                -10.0
            }
        });
        let v = Volume::new(raw);
        let s = smooth(&v, &params()).unwrap();
        for ((z, h, w), &out) in s.data().indexed_iter() {
            if w >= 4 {
                // 强度差 1000 >> range_sigma, 几乎不受左半影响.
                assert!((out - 1000.0).abs() < 1e-3, "({z}, {h}, {w}) -> {out}");
            } else {
                assert!(out.abs() < 10.0, "({z}, {h}, {w}) -> {out}");
            }
        }
    }

    #[test]
    fn test_filter_is_three_dimensional() {
        // 只有中间一层的中心体素不同; 三维窗口应当让相邻层的同位置也受到影响.
        let mut raw = Array3::<f32>::zeros((3, 5, 5));
        raw[(1, 2, 2)] = 40.0;
        let s = smooth(&Volume::new(raw), &params()).unwrap();
        assert!(s[(0, 2, 2)] > 0.0);
        assert!(s[(2, 2, 2)] > 0.0);
        assert!(s[(1, 2, 2)] < 40.0);
    }

    #[test]
    fn test_radii_follow_spacing() {
        let p = params();
        // 2.5 * 2.0 / 2.5 = 2, 2.5 * 2.0 / 0.5 = 10 -> 8
        assert_eq!(p.radii([2.5, 0.5, 5.0]), [2, 8, 1]);
    }

    #[test]
    fn test_clamp_offset() {
        assert_eq!(clamp_offset(0, -2, 5), 0);
        assert_eq!(clamp_offset(4, 3, 5), 4);
        assert_eq!(clamp_offset(2, 1, 5), 3);
    }
}

//! 全局阈值分割, 以及阈值分割和区域生长共用的强度区间 [`Band`].

use crate::consts::gray::*;
use crate::error::ConfigError;
use crate::{Mask, Volume, VolumeAttr};
use serde::Deserialize;
use std::fmt;

/// 强度闭区间 `[lower, upper]`.
///
/// 只能通过 [`Band::new`] (或反序列化) 构建, 因此 `lower <= upper` 且两端均为有限值.
/// 颠倒的区间会被拒绝, 而不是被悄悄交换.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "[f32; 2]")]
pub struct Band {
    lower: f32,
    upper: f32,
}

impl Band {
    /// 构建区间. 若 `lower > upper` 或任一端不是有限值, 返回 [`ConfigError::InvalidBand`].
    pub fn new(lower: f32, upper: f32) -> Result<Self, ConfigError> {
        if lower.is_finite() && upper.is_finite() && lower <= upper {
            Ok(Self { lower, upper })
        } else {
            Err(ConfigError::InvalidBand { lower, upper })
        }
    }

    /// 下限 (含).
    #[inline]
    pub fn lower(&self) -> f32 {
        self.lower
    }

    /// 上限 (含).
    #[inline]
    pub fn upper(&self) -> f32 {
        self.upper
    }

    /// `v` 是否落在区间内 (两端都包含). NaN 永远不在区间内.
    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        self.lower <= v && v <= self.upper
    }
}

impl TryFrom<[f32; 2]> for Band {
    type Error = ConfigError;

    #[inline]
    fn try_from([lower, upper]: [f32; 2]) -> Result<Self, Self::Error> {
        Self::new(lower, upper)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// 以 `[lower, upper]` 对整个体数据做二值化. 区间内为 [`MASK_FOREGROUND`], 否则为
/// [`MASK_BACKGROUND`].
///
/// 区间非法时在处理任何体素之前返回 `Err`.
#[inline]
pub fn threshold(volume: &Volume, lower: f32, upper: f32) -> Result<Mask, ConfigError> {
    Ok(threshold_band(volume, Band::new(lower, upper)?))
}

/// 同 [`threshold`], 但区间已经过校验.
pub fn threshold_band(volume: &Volume, band: Band) -> Mask {
    let data = volume.data().mapv(|v| {
        if band.contains(v) {
            MASK_FOREGROUND
        } else {
            MASK_BACKGROUND
        }
    });
    Mask::from_raw(data, volume.spacing())
}

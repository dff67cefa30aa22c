//! 面相邻邻居索引.

use crate::{Idx2d, Idx3d};

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界: 下溢会回绕为 `usize::MAX`,
/// 由调用方通过 `get` 过滤.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 获得 `(z, h, w)` 的 6-邻居索引. 不检查越界, 规则同 [`neighbour4`].
#[inline]
pub(crate) fn neighbour6((z, h, w): Idx3d) -> [Idx3d; 6] {
    [
        (z.wrapping_sub(1), h, w),
        (z.saturating_add(1), h, w),
        (z, h.wrapping_sub(1), w),
        (z, h.saturating_add(1), w),
        (z, h, w.wrapping_sub(1)),
        (z, h, w.saturating_add(1)),
    ]
}

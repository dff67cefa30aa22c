//! 多种子区域生长.
//!
//! 从每个种子出发做广度优先搜索, 只经过强度落在 [`Band`] 闭区间内的体素.
//! 切片模式使用 4-邻接, 体模式使用 6-邻接 (面相邻). 所有种子在同一遍内生长,
//! 结果取并集, 因此互不相连的两块结构 (例如左右两肺) 可以同时被标记.

mod neighbour;

use crate::consts::gray::*;
use crate::seeds::{Seed, ValidSeeds};
use crate::threshold::Band;
use crate::{Idx3d, Mask, OwnedMaskSlice, Volume, VolumeAttr};
use ndarray::{Array2, Array3};
use serde::Deserialize;
use std::collections::VecDeque;

use neighbour::{neighbour4, neighbour6};

/// 邻接方式.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// 仅在种子所在切片内生长, 4-邻接.
    #[default]
    Slice,

    /// 在整个体数据内生长, 6-邻接.
    Volume,
}

/// 单个种子在生长中的表现.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeedStatus {
    /// 种子本身在区间内, 参与了生长.
    InBand,

    /// 种子本身不在区间内, 不贡献任何体素.
    OutOfBand,

    /// 种子不在被生长的切片上, 不贡献任何体素.
    OffSlice,
}

/// 单个种子的诊断信息.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SeedReport {
    /// 种子.
    pub seed: Seed,

    /// 种子位置的强度.
    pub value: f32,

    /// 种子是否参与生长.
    pub status: SeedStatus,
}

/// 生长结果: 掩膜, 以及与输入顺序一致的逐种子诊断.
#[derive(Clone, Debug)]
pub struct Growth<M> {
    /// 生长得到的掩膜.
    pub mask: M,

    /// 逐种子诊断.
    pub seeds: Vec<SeedReport>,
}

/// 区域生长器. 持有只读体数据与生长区间, 可被多个线程共享.
///
/// 每次生长都使用私有的访问标记, 因此结果只取决于 (体数据, 种子集合, 区间),
/// 与种子顺序和遍历顺序无关.
#[derive(Copy, Clone, Debug)]
pub struct RegionGrower<'a> {
    volume: &'a Volume,
    band: Band,
}

impl<'a> RegionGrower<'a> {
    /// 初始化.
    #[inline]
    pub fn new(volume: &'a Volume, band: Band) -> Self {
        Self { volume, band }
    }

    /// 生长区间.
    #[inline]
    pub fn band(&self) -> Band {
        self.band
    }

    /// 对单个种子做诊断. `on_slice` 为 `None` 表示体模式.
    fn inspect(&self, (seed, pos): (Seed, Idx3d), on_slice: Option<usize>) -> SeedReport {
        // `ValidSeeds` 保证不越界.
        let value = self.volume[pos];
        let status = match on_slice {
            Some(z) if z != pos.0 => SeedStatus::OffSlice,
            _ if self.band.contains(value) => SeedStatus::InBand,
            _ => SeedStatus::OutOfBand,
        };
        SeedReport {
            seed,
            value,
            status,
        }
    }

    /// 在切片 `z` 上以 4-邻接生长. 不在切片 `z` 上的种子不贡献体素.
    ///
    /// 当 `z` 越界时 panic.
    pub fn grow_slice(&self, z: usize, seeds: &ValidSeeds) -> Growth<OwnedMaskSlice> {
        let sli = self.volume.slice_at(z);
        let reports: Vec<SeedReport> = seeds.iter().map(|s| self.inspect(s, Some(z))).collect();

        // 掩膜兼作访问标记: 只有区间内的像素会被标记, 且每个像素至多入队一次.
        let mut mask = Array2::<u8>::zeros(sli.shape());
        let mut q = VecDeque::with_capacity(64);
        for ((_, (_, h, w)), report) in seeds.iter().zip(&reports) {
            if report.status != SeedStatus::InBand {
                continue;
            }
            let start = (h, w);
            if is_foreground(mask[start]) {
                // 已被之前的种子覆盖.
                continue;
            }
            mask[start] = MASK_FOREGROUND;
            q.push_back(start);
            while let Some(cur) = q.pop_front() {
                for neigh in neighbour4(cur) {
                    let Some(&v) = sli.get(neigh) else {
                        continue;
                    };
                    if is_background(mask[neigh]) && self.band.contains(v) {
                        mask[neigh] = MASK_FOREGROUND;
                        q.push_back(neigh);
                    }
                }
            }
        }
        log::trace!(
            "slice {z}: grew {} pixels from {} seeds",
            mask.iter().filter(|p| is_foreground(**p)).count(),
            seeds.len()
        );
        Growth {
            mask: OwnedMaskSlice::from_raw(mask),
            seeds: reports,
        }
    }

    /// 在整个体数据内以 6-邻接生长.
    pub fn grow_volume(&self, seeds: &ValidSeeds) -> Growth<Mask> {
        let reports: Vec<SeedReport> = seeds.iter().map(|s| self.inspect(s, None)).collect();

        let mut mask = Array3::<u8>::zeros(self.volume.shape());
        let mut q = VecDeque::with_capacity(256);
        for ((_, start), report) in seeds.iter().zip(&reports) {
            if report.status != SeedStatus::InBand {
                continue;
            }
            if is_foreground(mask[start]) {
                continue;
            }
            mask[start] = MASK_FOREGROUND;
            q.push_back(start);
            while let Some(cur) = q.pop_front() {
                for neigh in neighbour6(cur) {
                    let Some(&v) = self.volume.get(neigh) else {
                        continue;
                    };
                    if is_background(mask[neigh]) && self.band.contains(v) {
                        mask[neigh] = MASK_FOREGROUND;
                        q.push_back(neigh);
                    }
                }
            }
        }
        Growth {
            mask: Mask::from_raw(mask, self.volume.spacing()),
            seeds: reports,
        }
    }

    /// 按 `connectivity` 生长, 并取切片 `z` 的结果.
    ///
    /// 体模式下会在整个体数据内生长后截取第 `z` 层, 因此其它切片上连通的区域
    /// 也可能经由层间路径出现在第 `z` 层.
    pub fn grow_at(
        &self,
        z: usize,
        seeds: &ValidSeeds,
        connectivity: Connectivity,
    ) -> Growth<OwnedMaskSlice> {
        match connectivity {
            Connectivity::Slice => self.grow_slice(z, seeds),
            Connectivity::Volume => {
                let Growth { mask, seeds } = self.grow_volume(seeds);
                Growth {
                    mask: mask.slice_at(z).to_owned(),
                    seeds,
                }
            }
        }
    }
}

/// 以 `band` 从 `seeds` 出发在整个体数据内生长. 见 [`RegionGrower::grow_volume`].
#[inline]
pub fn grow(volume: &Volume, seeds: &ValidSeeds, band: Band) -> Growth<Mask> {
    RegionGrower::new(volume, band).grow_volume(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::validate_seeds;
    use ndarray::Array3;

    /// `depth` 层 10x10, 每层中心 4x4 方块 (行列 3..7) 取值 500, 其余为 0.
    fn square_volume(depth: usize) -> Volume {
        let mut raw = Array3::<f32>::zeros((depth, 10, 10));
        for z in 0..depth {
            for h in 3..7 {
                for w in 3..7 {
                    raw[(z, h, w)] = 500.0;
                }
            }
        }
        Volume::new(raw)
    }

    fn valid(volume: &Volume, seeds: &[Seed]) -> ValidSeeds {
        validate_seeds(volume, seeds.iter().copied()).valid.unwrap()
    }

    fn band(lower: f32, upper: f32) -> Band {
        Band::new(lower, upper).unwrap()
    }

    #[test]
    fn test_grow_square() {
        let v = square_volume(3);
        let grower = RegionGrower::new(&v, band(400.0, 600.0));
        for z in 0..3 {
            let g = grower.grow_slice(z, &valid(&v, &[Seed::new(5, 5, z as i64)]));
            assert_eq!(g.mask.count_foreground(), 16);
            let pos: Vec<_> = g.mask.as_immut().foreground_pos();
            let expected: Vec<_> = (3..7).flat_map(|h| (3..7).map(move |w| (h, w))).collect();
            assert_eq!(pos, expected);
            assert_eq!(g.seeds[0].status, SeedStatus::InBand);
            assert_eq!(g.seeds[0].value, 500.0);
        }
    }

    #[test]
    fn test_seed_on_background() {
        let v = square_volume(3);
        let grower = RegionGrower::new(&v, band(400.0, 600.0));
        let g = grower.grow_slice(1, &valid(&v, &[Seed::new(0, 0, 1)]));
        assert_eq!(g.mask.count_foreground(), 0);
        assert_eq!(g.seeds[0].status, SeedStatus::OutOfBand);
        assert_eq!(g.seeds[0].value, 0.0);
    }

    #[test]
    fn test_bad_seed_does_not_affect_others() {
        let v = square_volume(1);
        let grower = RegionGrower::new(&v, band(400.0, 600.0));
        let g = grower.grow_slice(0, &valid(&v, &[Seed::new(0, 0, 0), Seed::new(4, 4, 0)]));
        assert_eq!(g.mask.count_foreground(), 16);
        assert_eq!(g.seeds[0].status, SeedStatus::OutOfBand);
        assert_eq!(g.seeds[1].status, SeedStatus::InBand);
    }

    #[test]
    fn test_off_slice_seed() {
        let v = square_volume(2);
        let grower = RegionGrower::new(&v, band(400.0, 600.0));
        let g = grower.grow_slice(0, &valid(&v, &[Seed::new(5, 5, 1)]));
        assert_eq!(g.mask.count_foreground(), 0);
        assert_eq!(g.seeds[0].status, SeedStatus::OffSlice);
    }

    /// 两块互不相连的区域: 左块 (行 1..4, 列 1..3) 与右块 (行 5..9, 列 6..9).
    fn two_blobs() -> Volume {
        let mut raw = Array3::<f32>::zeros((1, 10, 10));
        for h in 1..4 {
            for w in 1..3 {
                raw[(0, h, w)] = -300.0;
            }
        }
        for h in 5..9 {
            for w in 6..9 {
                raw[(0, h, w)] = -400.0;
            }
        }
        Volume::new(raw)
    }

    #[test]
    fn test_multi_seed_union() {
        let v = two_blobs();
        let grower = RegionGrower::new(&v, band(-600.0, -100.0));
        let (a, b) = (Seed::new(1, 1, 0), Seed::new(7, 7, 0));
        let left = grower.grow_slice(0, &valid(&v, &[a])).mask;
        let right = grower.grow_slice(0, &valid(&v, &[b])).mask;
        let both = grower.grow_slice(0, &valid(&v, &[a, b])).mask;
        assert_eq!(left.count_foreground(), 6);
        assert_eq!(right.count_foreground(), 12);
        let union = &left.clone().into_raw() | &right.into_raw();
        assert_eq!(both.into_raw(), union);
    }

    #[test]
    fn test_overlapping_seeds_stay_binary() {
        let v = square_volume(1);
        let grower = RegionGrower::new(&v, band(400.0, 600.0));
        let g = grower.grow_slice(
            0,
            &valid(&v, &[Seed::new(3, 3, 0), Seed::new(6, 6, 0), Seed::new(3, 3, 0)]),
        );
        assert_eq!(g.mask.count_foreground(), 16);
        assert!(g.mask.as_immut().iter().all(|p| *p <= 1));
    }

    #[test]
    fn test_deterministic_regardless_of_order() {
        let v = two_blobs();
        let grower = RegionGrower::new(&v, band(-600.0, -100.0));
        let (a, b) = (Seed::new(2, 3, 0), Seed::new(8, 5, 0));
        let ab = grower.grow_slice(0, &valid(&v, &[a, b])).mask;
        let ba = grower.grow_slice(0, &valid(&v, &[b, a])).mask;
        let again = grower.grow_slice(0, &valid(&v, &[a, b])).mask;
        assert_eq!(ab, ba);
        assert_eq!(ab, again);
    }

    #[test]
    fn test_four_connectivity_excludes_diagonal() {
        let mut raw = Array3::<f32>::zeros((1, 3, 3));
        raw[(0, 0, 0)] = 1.0;
        raw[(0, 1, 1)] = 1.0;
        let v = Volume::new(raw);
        let g = RegionGrower::new(&v, band(1.0, 1.0)).grow_slice(0, &valid(&v, &[Seed::new(0, 0, 0)]));
        assert_eq!(g.mask.count_foreground(), 1);
    }

    #[test]
    fn test_grow_volume_six_connected() {
        // 一根沿 z 方向的柱子, 外加一个只与柱子斜向相邻的体素.
        let mut raw = Array3::<f32>::zeros((4, 3, 3));
        for z in 0..4 {
            raw[(z, 1, 1)] = 10.0;
        }
        raw[(0, 0, 0)] = 10.0;
        let v = Volume::new(raw);
        let g = grow(&v, &valid(&v, &[Seed::new(1, 1, 2)]), band(5.0, 15.0));
        assert_eq!(g.mask.count_foreground(), 4);
        assert!(!g.mask.is_foreground_at((0, 0, 0)));
        assert_eq!(g.mask.shape(), v.shape());

        let grower = RegionGrower::new(&v, band(5.0, 15.0));
        let at0 = grower.grow_at(0, &valid(&v, &[Seed::new(1, 1, 3)]), Connectivity::Volume);
        assert_eq!(at0.mask.count_foreground(), 1);
        let at0 = grower.grow_at(0, &valid(&v, &[Seed::new(1, 1, 3)]), Connectivity::Slice);
        assert_eq!(at0.mask.count_foreground(), 0);
    }

    #[test]
    fn test_connectivity_deserialize() {
        let c: Connectivity = serde_json::from_str("\"volume\"").unwrap();
        assert_eq!(c, Connectivity::Volume);
        assert_eq!(Connectivity::default(), Connectivity::Slice);
    }
}

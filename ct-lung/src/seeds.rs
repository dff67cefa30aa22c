//! 种子点与切片种子表.
//!
//! 种子表把 "切片 (或切片区间) → 种子 + 生长区间" 作为可版本化的配置加载,
//! 在流水线开始之前校验一次.

use crate::error::{ConfigError, GeometryError};
use crate::threshold::Band;
use crate::{Idx3d, VolumeAttr};
use serde::Deserialize;
use std::fmt;

/// 种子点 `(x, y, z)`. `x` 为列, `y` 为行, `z` 为切片.
///
/// 坐标可以为负: 配置中的种子在校验前不做任何假设, 负坐标与过大的坐标一样按越界处理.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seed {
    /// 列.
    pub x: i64,
    /// 行.
    pub y: i64,
    /// 切片.
    pub z: i64,
}

impl Seed {
    /// 直接初始化.
    #[inline]
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    /// 转换成体数据索引 `(z, 高, 宽)`. 任一坐标为负时返回 `None`.
    #[inline]
    pub fn position(&self) -> Option<Idx3d> {
        let z = usize::try_from(self.z).ok()?;
        let y = usize::try_from(self.y).ok()?;
        let x = usize::try_from(self.x).ok()?;
        Some((z, y, x))
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// 非空且全部位于体数据内的种子集合. 只能通过 [`validate_seeds`] 获得.
///
/// 每个种子都附带其体数据索引 `(z, 高, 宽)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidSeeds(Vec<(Seed, Idx3d)>);

impl ValidSeeds {
    /// 获取能迭代所有 `(种子, 索引)` 的迭代器.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Seed, Idx3d)> + '_ {
        self.0.iter().copied()
    }

    /// 获取能迭代所有种子的迭代器.
    #[inline]
    pub fn seeds(&self) -> impl ExactSizeIterator<Item = Seed> + '_ {
        self.0.iter().map(|&(seed, _)| seed)
    }

    /// 种子个数. 总是 `>= 1`.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 总是 `false`, 为满足 clippy 而提供.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 对种子做越界检查的结果.
#[derive(Clone, Debug)]
pub struct SeedCheck {
    /// 通过检查的种子. 若一个都没有则为 `None`.
    pub valid: Option<ValidSeeds>,

    /// 被拒绝的种子, 每个一条错误, 保持输入顺序.
    pub rejected: Vec<GeometryError>,
}

/// 按 `geometry` 的形状逐个检查种子. 越界 (含负坐标) 种子被拒绝而不是被截断.
pub fn validate_seeds<G, I>(geometry: &G, seeds: I) -> SeedCheck
where
    G: VolumeAttr,
    I: IntoIterator<Item = Seed>,
{
    let shape = geometry.shape();
    let mut valid = Vec::with_capacity(2);
    let mut rejected = Vec::new();
    for seed in seeds {
        match seed.position().filter(|pos| geometry.check(pos)) {
            Some(pos) => valid.push((seed, pos)),
            None => rejected.push(GeometryError::SeedOutOfBounds { seed, shape }),
        }
    }
    SeedCheck {
        valid: (!valid.is_empty()).then_some(ValidSeeds(valid)),
        rejected,
    }
}

/// 种子表项覆盖的切片.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SliceSpan {
    /// 单个切片.
    Slice(usize),

    /// 闭区间 `[first, last]`.
    Slices([usize; 2]),
}

impl SliceSpan {
    /// 起始切片.
    #[inline]
    pub fn first(&self) -> usize {
        match *self {
            SliceSpan::Slice(z) => z,
            SliceSpan::Slices([first, _]) => first,
        }
    }

    /// 终止切片 (含).
    #[inline]
    pub fn last(&self) -> usize {
        match *self {
            SliceSpan::Slice(z) => z,
            SliceSpan::Slices([_, last]) => last,
        }
    }

    /// 覆盖的切片数. 总是 `>= 1`.
    #[inline]
    pub fn width(&self) -> usize {
        self.last().saturating_sub(self.first()) + 1
    }

    /// 是否覆盖切片 `z`?
    #[inline]
    pub fn contains(&self, z: usize) -> bool {
        (self.first()..=self.last()).contains(&z)
    }

    /// `z` 到区间的切片距离. 覆盖时为 0.
    #[inline]
    pub fn distance(&self, z: usize) -> usize {
        if z < self.first() {
            self.first() - z
        } else {
            z.saturating_sub(self.last())
        }
    }
}

impl fmt::Display for SliceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SliceSpan::Slice(z) => write!(f, "slice {z}"),
            SliceSpan::Slices([first, last]) => write!(f, "slices {first}..={last}"),
        }
    }
}

/// 种子表项: 覆盖的切片, 切片内种子 `[x, y]` 列表, 以及生长区间.
///
/// 种子的 `z` 取自正在处理的切片.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawSeedEntry")]
pub struct SeedEntry {
    /// 覆盖的切片.
    pub span: SliceSpan,

    /// 切片内种子 `[x, y]`. 负坐标允许出现, 在生长前被逐个拒绝.
    pub seeds: Vec<[i64; 2]>,

    /// 区域生长区间.
    pub band: Band,
}

/// 配置文件中的表项. `slice` 与 `slices` 必须恰好给出一个.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSeedEntry {
    slice: Option<usize>,
    slices: Option<[usize; 2]>,
    seeds: Vec<[i64; 2]>,
    band: Band,
}

impl TryFrom<RawSeedEntry> for SeedEntry {
    type Error = ConfigError;

    fn try_from(raw: RawSeedEntry) -> Result<Self, Self::Error> {
        let span = match (raw.slice, raw.slices) {
            (Some(z), None) => SliceSpan::Slice(z),
            (None, Some(range)) => SliceSpan::Slices(range),
            _ => return Err(ConfigError::AmbiguousSpan),
        };
        Ok(Self::new(span, raw.seeds, raw.band))
    }
}

impl SeedEntry {
    /// 直接初始化.
    pub fn new(span: SliceSpan, seeds: Vec<[i64; 2]>, band: Band) -> Self {
        Self { span, seeds, band }
    }

    /// 获得切片 `z` 上的三维种子.
    pub fn seeds_at(&self, z: usize) -> impl Iterator<Item = Seed> + '_ {
        // 切片序号不会超出 `i64`.
        let z = z as i64;
        self.seeds.iter().map(move |&[x, y]| Seed::new(x, y, z))
    }
}

/// 表项是如何被选中的.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LookupKind {
    /// 表项覆盖该切片.
    Exact,

    /// 没有表项覆盖该切片, 取最近的表项.
    Nearest,
}

/// 切片种子表. 非空, 每个表项都至少有一个种子, 区间均合法.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Vec<SeedEntry>")]
pub struct SeedTable {
    entries: Vec<SeedEntry>,
}

impl TryFrom<Vec<SeedEntry>> for SeedTable {
    type Error = ConfigError;

    #[inline]
    fn try_from(entries: Vec<SeedEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl SeedTable {
    /// 校验并构建种子表.
    pub fn new(entries: Vec<SeedEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptySeedTable);
        }
        for (index, entry) in entries.iter().enumerate() {
            if let SliceSpan::Slices([first, last]) = entry.span {
                if first > last {
                    return Err(ConfigError::InvalidSliceRange { first, last });
                }
            }
            if entry.seeds.is_empty() {
                return Err(ConfigError::EmptySeedList(index));
            }
        }
        Ok(Self { entries })
    }

    /// 获取全部表项.
    #[inline]
    pub fn entries(&self) -> &[SeedEntry] {
        &self.entries
    }

    /// 查找切片 `z` 的表项, 返回 `(表项序号, 表项, 匹配方式)`.
    ///
    /// 1. 若有表项覆盖 `z`, 取覆盖切片数最少者, 相同时取靠前者;
    /// 2. 否则取距离最近者, 距离相同时优先取位于 `z` 之前的表项, 再相同时取靠前者.
    ///
    /// 种子表非空, 因此总能找到表项.
    pub fn lookup(&self, z: usize) -> (usize, &SeedEntry, LookupKind) {
        let exact = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.span.contains(z))
            .min_by_key(|(_, e)| e.span.width());
        if let Some((index, entry)) = exact {
            return (index, entry, LookupKind::Exact);
        }

        let key = |e: &SeedEntry| (e.span.distance(z), e.span.first() > z);
        let mut best = 0;
        for (index, entry) in self.entries.iter().enumerate().skip(1) {
            if key(entry) < key(&self.entries[best]) {
                best = index;
            }
        }
        (best, &self.entries[best], LookupKind::Nearest)
    }
}

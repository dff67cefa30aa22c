//! 流水线驱动.
//!
//! 平滑 -> 全局阈值 -> 逐切片多种子生长. 切片之间互不依赖, 启用 `rayon` feature 时并行处理,
//! 结果按切片序号收集. 单个种子或单个切片的失败只会被记录, 不会中止流水线.

mod cancel;
mod figure;

pub use cancel::CancelToken;
pub use figure::{
    binary_label, grown_label, smoothed_label, FigureImage, FigureRecord, BINARY_MIDDLE,
    SMOOTHED_MIDDLE,
};

use crate::config::{PipelineConfig, Previews};
use crate::error::{ConfigError, GeometryError};
use crate::filter::smooth;
use crate::grow::{Growth, RegionGrower, SeedReport};
use crate::seeds::{validate_seeds, LookupKind};
use crate::sink::{publish, FigureSink, SinkFailure};
use crate::threshold::{threshold_band, Band};
use crate::{Mask, MaskSlice, OwnedMaskSlice, Volume, VolumeAttr};

/// 单个切片的处理结果.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SliceStatus {
    /// 已生长.
    Grown {
        /// 生长得到的体素数.
        voxels: usize,

        /// 生长体素中同时落在阈值掩膜内的比例. 未生长出任何体素时为 `None`.
        agreement: Option<f64>,
    },

    /// 所有种子都越界, 未生长.
    NoValidSeeds,

    /// 在发布结果前观察到取消.
    Cancelled,
}

/// 该切片使用的种子表项.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntryMatch {
    /// 表项序号.
    pub index: usize,

    /// 匹配方式.
    pub kind: LookupKind,
}

/// 单个切片的完整记录.
#[derive(Clone, Debug)]
pub struct SliceOutcome {
    /// 切片序号.
    pub z: usize,

    /// 使用的表项.
    pub entry: Option<EntryMatch>,

    /// 使用的生长区间.
    pub band: Option<Band>,

    /// 通过越界检查的种子及其强度, 保持表项中的顺序.
    pub seeds: Vec<SeedReport>,

    /// 被拒绝的种子.
    pub rejected: Vec<GeometryError>,

    /// 结果.
    pub status: SliceStatus,

    /// 生长掩膜. 仅 [`SliceStatus::Grown`] 时存在.
    pub mask: Option<OwnedMaskSlice>,
}

impl SliceOutcome {
    #[inline]
    fn bare(z: usize, status: SliceStatus) -> Self {
        Self {
            z,
            entry: None,
            band: None,
            seeds: vec![],
            rejected: vec![],
            status,
            mask: None,
        }
    }

    /// 是否因为没有可用种子而被跳过?
    #[inline]
    pub fn is_skipped(&self) -> bool {
        self.status == SliceStatus::NoValidSeeds
    }

    /// 是否被取消?
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SliceStatus::Cancelled
    }
}

/// 生长掩膜与阈值掩膜的一致率.
fn agreement(grown: MaskSlice, binary: MaskSlice) -> Option<f64> {
    let (mut total, mut both) = (0usize, 0usize);
    for (&g, &b) in grown.iter().zip(binary.iter()) {
        if g != 0 {
            total += 1;
            if b != 0 {
                both += 1;
            }
        }
    }
    (total > 0).then(|| both as f64 / total as f64)
}

/// 已生长, 尚未发布的切片.
struct GrownSlice {
    z: usize,
    entry: EntryMatch,
    band: Band,
    rejected: Vec<GeometryError>,
    growth: Growth<OwnedMaskSlice>,
}

/// 一次完整运行的结果.
#[derive(Clone, Debug)]
pub struct Segmentation {
    smoothed: Volume,
    binary: Mask,
    slices: Vec<SliceOutcome>,
    figures: Vec<FigureRecord>,
}

impl Segmentation {
    /// 平滑后的体数据.
    #[inline]
    pub fn smoothed(&self) -> &Volume {
        &self.smoothed
    }

    /// 全局阈值掩膜.
    #[inline]
    pub fn binary(&self) -> &Mask {
        &self.binary
    }

    /// 逐切片结果, 下标即切片序号.
    #[inline]
    pub fn slices(&self) -> &[SliceOutcome] {
        &self.slices
    }

    /// 按生成顺序排列的预览图.
    #[inline]
    pub fn figures(&self) -> &[FigureRecord] {
        &self.figures
    }

    /// 被跳过的切片序号.
    pub fn skipped_slices(&self) -> Vec<usize> {
        self.slices
            .iter()
            .filter(|o| o.is_skipped())
            .map(|o| o.z)
            .collect()
    }

    /// 被取消的切片序号.
    pub fn cancelled_slices(&self) -> Vec<usize> {
        self.slices
            .iter()
            .filter(|o| o.is_cancelled())
            .map(|o| o.z)
            .collect()
    }

    /// 生长体素总数.
    pub fn grown_voxels(&self) -> usize {
        self.slices
            .iter()
            .filter_map(|o| match o.status {
                SliceStatus::Grown { voxels, .. } => Some(voxels),
                _ => None,
            })
            .sum()
    }

    /// 把各切片的生长掩膜拼成体掩膜. 没有掩膜的切片为背景.
    pub fn region_mask(&self) -> Mask {
        let slices: Vec<Option<&OwnedMaskSlice>> =
            self.slices.iter().map(|o| o.mask.as_ref()).collect();
        Mask::from_slices(&self.smoothed, &slices)
    }

    /// 把预览图依次交给 `sink`. 单张失败只会被记录.
    #[inline]
    pub fn publish<S: FigureSink + ?Sized>(&self, sink: &mut S) -> Vec<SinkFailure> {
        publish(&self.figures, sink)
    }
}

/// 流水线.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    cancel: CancelToken,
}

impl Pipeline {
    /// 校验配置并创建流水线.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancelToken::new(),
        })
    }

    /// 使用外部的取消标记.
    #[inline]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 对 `volume` 运行整个流水线.
    ///
    /// 只有平滑参数错误是致命的; 其余问题都记录在对应切片的 [`SliceOutcome`] 中.
    pub fn run(&self, volume: &Volume) -> Result<Segmentation, ConfigError> {
        log::info!(
            "smoothing {:?} volume (domain sigma {}, range sigma {})",
            volume.shape(),
            self.config.smoothing.domain_sigma,
            self.config.smoothing.range_sigma
        );
        let smoothed = smooth(volume, &self.config.smoothing)?;

        log::info!("thresholding with {}", self.config.threshold);
        let binary = threshold_band(&smoothed, self.config.threshold);
        log::debug!("{} voxels inside threshold", binary.count_foreground());

        let depth = smoothed.len_z();
        log::info!(
            "growing {depth} slices ({:?} connectivity)",
            self.config.growth.connectivity
        );
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                use rayon::prelude::*;
                let slices: Vec<SliceOutcome> = (0..depth)
                    .into_par_iter()
                    .map(|z| self.process_slice(z, &smoothed, &binary))
                    .collect();
            } else {
                let slices: Vec<SliceOutcome> = (0..depth)
                    .map(|z| self.process_slice(z, &smoothed, &binary))
                    .collect();
            }
        }

        let figures = self.collect_figures(&smoothed, &binary, &slices);
        let seg = Segmentation {
            smoothed,
            binary,
            slices,
            figures,
        };
        log::info!(
            "grew {} voxels, {} slices skipped, {} cancelled",
            seg.grown_voxels(),
            seg.skipped_slices().len(),
            seg.cancelled_slices().len()
        );
        Ok(seg)
    }

    /// 处理切片 `z`. 只读共享数据, 只写自己的结果.
    fn process_slice(&self, z: usize, smoothed: &Volume, binary: &Mask) -> SliceOutcome {
        match self.grow_slice(z, smoothed) {
            Ok(grown) => self.finish_slice(grown, binary),
            Err(outcome) => outcome,
        }
    }

    /// 为切片 `z` 选表项, 检查种子并生长. 未生长的切片直接以 `Err` 给出最终结果.
    fn grow_slice(&self, z: usize, smoothed: &Volume) -> Result<GrownSlice, SliceOutcome> {
        if self.cancel.is_cancelled() {
            return Err(SliceOutcome::bare(z, SliceStatus::Cancelled));
        }
        let (index, entry, kind) = self.config.seeds.lookup(z);
        if kind == LookupKind::Nearest {
            log::debug!("slice {z}: no entry covers it, using nearest entry #{index} ({})", entry.span);
        }
        let matched = EntryMatch { index, kind };

        let check = validate_seeds(smoothed, entry.seeds_at(z));
        for e in &check.rejected {
            log::warn!("slice {z}: {e}");
        }
        let Some(valid) = check.valid else {
            log::warn!("slice {z}: no valid seed point, skipped");
            return Err(SliceOutcome {
                entry: Some(matched),
                band: Some(entry.band),
                rejected: check.rejected,
                ..SliceOutcome::bare(z, SliceStatus::NoValidSeeds)
            });
        };

        let growth = RegionGrower::new(smoothed, entry.band).grow_at(
            z,
            &valid,
            self.config.growth.connectivity,
        );
        Ok(GrownSlice {
            z,
            entry: matched,
            band: entry.band,
            rejected: check.rejected,
            growth,
        })
    }

    /// 发布生长结果. 此时已取消则丢弃已完成的计算.
    fn finish_slice(&self, grown: GrownSlice, binary: &Mask) -> SliceOutcome {
        let GrownSlice {
            z,
            entry,
            band,
            rejected,
            growth,
        } = grown;
        if self.cancel.is_cancelled() {
            return SliceOutcome::bare(z, SliceStatus::Cancelled);
        }

        let voxels = growth.mask.count_foreground();
        let agreement = agreement(growth.mask.as_immut(), binary.slice_at(z));
        log::debug!("slice {z}: {voxels} voxels, agreement {agreement:?}");
        SliceOutcome {
            z,
            entry: Some(entry),
            band: Some(band),
            seeds: growth.seeds,
            rejected,
            status: SliceStatus::Grown { voxels, agreement },
            mask: Some(growth.mask),
        }
    }

    /// 中间结果在前, 生长结果按切片顺序在后.
    fn collect_figures(
        &self,
        smoothed: &Volume,
        binary: &Mask,
        slices: &[SliceOutcome],
    ) -> Vec<FigureRecord> {
        let depth = smoothed.len_z();
        let mut figures = Vec::with_capacity(2 * depth + 2);
        match self.config.previews {
            _ if depth == 0 => {}
            Previews::Middle => {
                figures.push(FigureRecord::scan(
                    smoothed.middle_slice().to_owned(),
                    SMOOTHED_MIDDLE,
                ));
                figures.push(FigureRecord::mask(
                    binary.middle_slice().to_owned(),
                    BINARY_MIDDLE,
                ));
            }
            Previews::All => {
                for z in 0..depth {
                    figures.push(FigureRecord::scan(
                        smoothed.slice_at(z).to_owned(),
                        smoothed_label(z),
                    ));
                    figures.push(FigureRecord::mask(
                        binary.slice_at(z).to_owned(),
                        binary_label(z),
                    ));
                }
            }
        }
        for outcome in slices {
            if let Some(mask) = &outcome.mask {
                figures.push(FigureRecord::mask(mask.clone(), grown_label(outcome.z)));
            }
        }
        figures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeds::{SeedEntry, SeedTable, SliceSpan};
    use ndarray::{Array2, Array3};

    #[test]
    fn test_agreement() {
        let grown = OwnedMaskSlice::from_raw(Array2::from_shape_vec((1, 4), vec![1, 1, 1, 0]).unwrap());
        let binary = OwnedMaskSlice::from_raw(Array2::from_shape_vec((1, 4), vec![1, 0, 0, 1]).unwrap());
        let a = agreement(grown.as_immut(), binary.as_immut()).unwrap();
        assert!((a - 1.0 / 3.0).abs() < 1e-12);

        let none = OwnedMaskSlice::from_raw(Array2::zeros((1, 4)));
        assert_eq!(agreement(none.as_immut(), binary.as_immut()), None);
    }

    #[test]
    fn test_bare_outcome_flags() {
        assert!(SliceOutcome::bare(0, SliceStatus::NoValidSeeds).is_skipped());
        assert!(SliceOutcome::bare(0, SliceStatus::Cancelled).is_cancelled());
        assert!(!SliceOutcome::bare(0, SliceStatus::Cancelled).is_skipped());
    }

    /// 单层 6x6, 中心 2x2 取值 500.
    fn pipeline_and_volume() -> (Pipeline, Volume) {
        let mut raw = Array3::<f32>::zeros((1, 6, 6));
        for h in 2..4 {
            for w in 2..4 {
                raw[(0, h, w)] = 500.0;
            }
        }
        let band = Band::new(400.0, 600.0).unwrap();
        let config = PipelineConfig {
            seeds: SeedTable::new(vec![SeedEntry::new(SliceSpan::Slice(0), vec![[2, 2]], band)])
                .unwrap(),
            ..Default::default()
        };
        (Pipeline::new(config).unwrap(), Volume::new(raw))
    }

    #[test]
    fn test_cancel_after_growth_discards_result() {
        let (pipeline, volume) = pipeline_and_volume();
        let token = CancelToken::new();
        let pipeline = pipeline.with_cancel(token.clone());
        let binary = threshold_band(&volume, pipeline.config().threshold);

        let grown = match pipeline.grow_slice(0, &volume) {
            Ok(grown) => grown,
            Err(outcome) => panic!("slice not grown: {outcome:?}"),
        };
        assert_eq!(grown.growth.mask.count_foreground(), 4);

        token.cancel();
        let outcome = pipeline.finish_slice(grown, &binary);
        assert_eq!(outcome.status, SliceStatus::Cancelled);
        assert!(outcome.is_cancelled());
        assert!(outcome.mask.is_none());
        assert!(outcome.seeds.is_empty());
    }

    #[test]
    fn test_finish_without_cancel_publishes_mask() {
        let (pipeline, volume) = pipeline_and_volume();
        let binary = threshold_band(&volume, pipeline.config().threshold);
        let outcome = pipeline.process_slice(0, &volume, &binary);
        assert_eq!(
            outcome.status,
            SliceStatus::Grown {
                voxels: 4,
                agreement: Some(1.0)
            }
        );
        assert_eq!(
            outcome.entry,
            Some(EntryMatch {
                index: 0,
                kind: LookupKind::Exact
            })
        );
        assert!(outcome.mask.is_some());
    }
}

//! 运行结果汇总.

use ct_lung::pipeline::{Segmentation, SliceStatus};
use ct_lung::sink::SinkFailure;
use std::io::{self, Write};
use std::path::PathBuf;

/// 运行结果汇总.
pub struct Summary {
    slices: usize,
    grown_slices: usize,
    grown_voxels: usize,
    mean_agreement: Option<f64>,
    skipped: Vec<usize>,
    cancelled: Vec<usize>,
    figures: usize,
    failures: Vec<SinkFailure>,
    out_dir: PathBuf,
}

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.6}"),
        None => "/".to_string(),
    }
}

#[inline]
fn list_to_display(v: &[usize]) -> String {
    if v.is_empty() {
        "none".to_string()
    } else {
        v.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
    }
}

impl Summary {
    /// 从分割结果与输出失败记录汇总.
    pub fn new(seg: &Segmentation, failures: Vec<SinkFailure>, out_dir: PathBuf) -> Self {
        let agreements: Vec<f64> = seg
            .slices()
            .iter()
            .filter_map(|o| match o.status {
                SliceStatus::Grown { agreement, .. } => agreement,
                _ => None,
            })
            .collect();
        let mean_agreement = (!agreements.is_empty())
            .then(|| agreements.iter().sum::<f64>() / agreements.len() as f64);
        Self {
            slices: seg.slices().len(),
            grown_slices: seg
                .slices()
                .iter()
                .filter(|o| matches!(o.status, SliceStatus::Grown { .. }))
                .count(),
            grown_voxels: seg.grown_voxels(),
            mean_agreement,
            skipped: seg.skipped_slices(),
            cancelled: seg.cancelled_slices(),
            figures: seg.figures().len(),
            failures,
            out_dir,
        }
    }

    /// 将汇总写进 `w` 中.
    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(w, "Segmentation summary:")?;
        writeln!(w, "{S4}Slices: {}", self.slices)?;
        writeln!(w, "{S4}Grown slices: {}", self.grown_slices)?;
        writeln!(w, "{S4}Grown voxels: {}", self.grown_voxels)?;
        writeln!(
            w,
            "{S4}Mean threshold agreement: {}",
            f64_to_display(self.mean_agreement)
        )?;
        writeln!(w, "{S4}Skipped slices: {}", list_to_display(&self.skipped))?;
        writeln!(w, "{S4}Cancelled slices: {}", list_to_display(&self.cancelled))?;
        writeln!(
            w,
            "{S4}Figures written: {} of {} to `{}`",
            self.figures - self.failures.len(),
            self.figures,
            self.out_dir.display()
        )?;
        for f in &self.failures {
            writeln!(w, "{S4}Failed to write `{}`: {}", f.label, f.error)?;
        }
        Ok(())
    }

    /// 打印汇总.
    pub fn print(&self) {
        utils::sep();
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        let written = self
            .describe_into(&mut lock)
            .and_then(|()| utils::sep_to(&mut lock));
        if let Err(e) = written {
            log::error!("cannot print summary: {e}");
        }
    }
}

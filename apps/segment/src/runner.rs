//! 程序运行函数.

use crate::summary::Summary;
use ct_lung::dataset;
use ct_lung::error::{ConfigError, LoadError, SinkError};
use ct_lung::pipeline::{Pipeline, Segmentation};
use ct_lung::sink::PngSink;
use std::path::Path;
use thiserror::Error;

/// 致命错误.
#[derive(Debug, Error)]
pub enum RunError {
    /// 配置错误.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 加载错误.
    #[error("cannot load input: {0}")]
    Load(#[from] LoadError),

    /// 无法创建输出目录.
    #[error("cannot prepare output: {0}")]
    Output(#[from] SinkError),
}

/// 实际运行.
pub fn run(input: &Path) -> Result<Summary, RunError> {
    let config = utils::env::load_config(input)?;
    let window = config.preview_window()?;
    let pipeline = Pipeline::new(config)?;

    let volume = dataset::load(input, &pipeline.config().loader)?;
    let seg = pipeline.run(&volume)?;
    print_seed_diagnostics(&pipeline, &seg);

    let out_dir = utils::env::out_dir();
    let mut sink = PngSink::new(&out_dir, window)?;
    log::info!(
        "writing {} figures to `{}`",
        seg.figures().len(),
        out_dir.display()
    );
    let failures = seg.publish(&mut sink);
    Ok(Summary::new(&seg, failures, out_dir))
}

/// 按表项中的顺序逐个打印种子: 有效种子打印其强度, 越界种子打印提示.
fn print_seed_diagnostics(pipeline: &Pipeline, seg: &Segmentation) {
    let entries = pipeline.config().seeds.entries();
    for outcome in seg.slices() {
        let Some(entry) = outcome.entry.and_then(|m| entries.get(m.index)) else {
            continue;
        };
        let z = outcome.z;
        for seed in entry.seeds_at(z) {
            match outcome.seeds.iter().find(|r| r.seed == seed) {
                Some(report) => println!("Slice {z}: Seed Point {seed} Value = {}", report.value),
                None => println!("Invalid seed point for slice {z}: {seed}"),
            }
        }
    }
}

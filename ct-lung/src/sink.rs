//! 预览图输出.
//!
//! 单张图写入失败只会被记录, 不会中断其余图片的输出.

use crate::error::SinkError;
use crate::pipeline::{FigureImage, FigureRecord};
use crate::{CtWindow, ImgWriteVis};
use std::fs;
use std::path::{Path, PathBuf};

/// 预览图接收端.
pub trait FigureSink {
    /// 持久化一张预览图.
    fn emit(&mut self, record: &FigureRecord) -> Result<(), SinkError>;
}

/// 把每张预览图写成 `{dir}/{label}.png` 的接收端.
///
/// 掩膜按黑白输出; 强度切片按 `window` 取窗, 未指定时按每张图自身的强度范围取窗.
#[derive(Clone, Debug)]
pub struct PngSink {
    dir: PathBuf,
    window: Option<CtWindow>,
}

impl PngSink {
    /// 创建接收端, 必要时创建输出目录.
    pub fn new<P: AsRef<Path>>(dir: P, window: Option<CtWindow>) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_owned();
        fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, window })
    }

    /// 标签对应的输出路径. 路径分隔符被替换为 `_`.
    pub fn path_for(&self, label: &str) -> PathBuf {
        let name: String = label
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{name}.png"))
    }
}

impl FigureSink for PngSink {
    fn emit(&mut self, record: &FigureRecord) -> Result<(), SinkError> {
        let path = self.path_for(&record.label);
        let saved = match &record.image {
            FigureImage::Scan(s) => s.as_immutable().windowed(self.window).save(&path),
            FigureImage::Mask(m) => m.as_immut().save(&path),
        };
        saved.map_err(|source| SinkError::Image { path, source })
    }
}

/// 一次失败的输出.
#[derive(Debug)]
pub struct SinkFailure {
    /// 预览图标签.
    pub label: String,

    /// 错误.
    pub error: SinkError,
}

/// 按顺序把 `figures` 交给 `sink`. 返回全部失败记录, 顺序与输入一致.
pub fn publish<S: FigureSink + ?Sized>(figures: &[FigureRecord], sink: &mut S) -> Vec<SinkFailure> {
    let mut failures = Vec::new();
    for record in figures {
        match sink.emit(record) {
            Ok(()) => log::debug!("saved `{}`", record.label),
            Err(error) => {
                log::warn!("cannot save `{}`: {error}", record.label);
                failures.push(SinkFailure {
                    label: record.label.clone(),
                    error,
                });
            }
        }
    }
    failures
}

//! 常用类型的统一导出.

pub use crate::config::{PipelineConfig, Previews};
pub use crate::dataset::load;
pub use crate::error::{ConfigError, GeometryError, LoadError, SinkError};
pub use crate::filter::{smooth, SmoothingParams};
pub use crate::grow::{grow, Connectivity, RegionGrower, SeedReport, SeedStatus};
pub use crate::pipeline::{CancelToken, FigureRecord, Pipeline, Segmentation, SliceStatus};
pub use crate::seeds::{validate_seeds, Seed, SeedTable};
pub use crate::sink::{FigureSink, PngSink};
pub use crate::threshold::{threshold, threshold_band, Band};
pub use crate::{CtWindow, ImgWriteVis, Idx2d, Idx3d, Mask, Volume, VolumeAttr};

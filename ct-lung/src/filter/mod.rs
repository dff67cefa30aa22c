//! 体数据平滑.

mod bilateral;

pub use bilateral::{smooth, SmoothingParams};

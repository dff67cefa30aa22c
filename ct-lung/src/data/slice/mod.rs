//! CT 扫描/掩膜切片对象的操作.

mod core;
mod iter;
mod save;

pub use core::{MaskSlice, OwnedMaskSlice, OwnedScanSlice, ScanSlice};

pub(crate) use iter::PosIter;

pub use save::{ImgWriteVis, WindowedScan};

#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供三维 CT 扫描的肺部分割流水线: 三维双边滤波、全局阈值分割,
//! 以及按切片进行的多种子区域生长.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体数据一律按照 `(z, 高, 宽)` 组织, 即 `(切片, 行, 列)`. 种子点则沿用扫描界常用的
//!   `(x, y, z)` 写法, 其中 `x` 为列, `y` 为行. 二者通过 [`seeds::Seed::position`] 转换.
//! 2. 各阶段均不修改输入, 而是产生新的体数据或切片, 以便后续诊断时回看中间结果.
//! 3. 单个种子或单个切片的失败不会中止整个流水线, 只有加载错误和配置错误是致命的.
//!
//! # 流水线
//!
//! ### 体数据加载
//!
//! 从切片图像目录或单个 nifti 文件构建 [`Volume`].
//!
//! 实现位于 `ct-lung/src/dataset`.
//!
//! ### 三维双边滤波
//!
//! 边缘保持的平滑. 空间权重按体素物理间距计算, 边界按 clamp-to-edge 取样.
//!
//! 实现位于 `ct-lung/src/filter`.
//!
//! ### 全局阈值
//!
//! 闭区间 \[lower, upper\] 二值化.
//!
//! 实现位于 `ct-lung/src/threshold.rs`.
//!
//! ### 多种子区域生长
//!
//! 切片内 4-邻接或体内 6-邻接的广度优先生长, 多个种子的结果取并集.
//!
//! 实现位于 `ct-lung/src/grow`.
//!
//! ### 切片种子表与流水线驱动
//!
//! 由配置文件给出每个切片 (或切片区间) 的种子与生长区间; 驱动按切片并行生长,
//! 并按生成顺序收集预览图.
//!
//! 实现位于 `ct-lung/src/seeds.rs` 和 `ct-lung/src/pipeline`.

/// 二维索引 `(高, 宽)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引 `(z, 高, 宽)`, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D 体数据基础数据结构.
mod data;

pub use data::{
    CtWindow, ImgWriteVis, Mask, MaskSlice, OwnedMaskSlice, OwnedScanSlice, ScanSlice, Volume,
    VolumeAttr, WindowedScan,
};

pub mod config;
pub mod consts;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod grow;
pub mod pipeline;
pub mod prelude;
pub mod seeds;
pub mod sink;
pub mod threshold;

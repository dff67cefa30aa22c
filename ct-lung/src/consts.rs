//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 掩膜中背景的像素值.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 掩膜中目标结构 (前景) 的像素值.
    pub const MASK_FOREGROUND: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        matches!(p, MASK_FOREGROUND)
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 流水线参数的缺省值. 这些值是针对某一组肺部扫描调出来的, 不具备普适性.
pub mod defaults {
    /// 双边滤波空间高斯的标准差, 以毫米为单位.
    pub const DOMAIN_SIGMA: f64 = 2.0;

    /// 双边滤波强度高斯的标准差.
    pub const RANGE_SIGMA: f64 = 50.0;

    /// 空间窗口半径与 `DOMAIN_SIGMA` 的比例.
    pub const RADIUS_FACTOR: f64 = 2.5;

    /// 单轴窗口半径上限 (体素).
    pub const MAX_RADIUS: usize = 8;

    /// 全局阈值下限.
    pub const THRESHOLD_LOWER: f32 = 450.0;

    /// 全局阈值上限.
    pub const THRESHOLD_UPPER: f32 = 1000.0;

    /// 区域生长下限.
    pub const GROW_LOWER: f32 = -600.0;

    /// 区域生长上限.
    pub const GROW_UPPER: f32 = -100.0;

    /// 缺省种子 `(x, y)`: 左肺与右肺各一个.
    pub const SEEDS: [[i64; 2]; 2] = [[192, 275], [358, 216]];
}

/// 切片目录中可以被识别的图像扩展名 (小写).
pub const SLICE_EXTENSIONS: [&str; 7] = ["png", "tif", "tiff", "bmp", "jpg", "jpeg", "pgm"];

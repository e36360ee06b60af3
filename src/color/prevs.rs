//! 图像预处理
//!
//! 从任意宽度的采集帧中居中裁剪出模型输入大小的正方形窗口，
//! 并把像素通道归一化为 NHWC 排布的浮点张量。

use image::{DynamicImage, Pixel, Rgba};
use ndarray::Array4;
use tracing::debug;

use crate::error::{DetectError, Result};

pub const RGB_CHANNELS: usize = 3;

/// 模型输入张量，形状为 `(1, window, window, 3)`
///
/// 由一次检测调用独占，调用结束（包括失败）时随作用域释放。
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    data: Array4<f32>,
}

impl InputTensor {
    /// 窗口边长
    pub fn window_size(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn view(&self) -> ndarray::ArrayView4<'_, f32> {
        self.data.view()
    }

    /// 行优先、通道交错的扁平数据
    pub fn as_slice(&self) -> &[f32] {
        // 由 from_shape_vec 构造，必然是标准布局
        self.data.as_slice().unwrap_or(&[])
    }

    pub fn into_raw_vec(self) -> Vec<f32> {
        let (data, _offset) = self.data.into_raw_vec_and_offset();
        data
    }
}

/// 归一化参数：`(value - mean) / std`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: f32,
    pub std: f32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: crate::config::DEFAULT_IMAGE_MEAN,
            std: crate::config::DEFAULT_IMAGE_STD,
        }
    }
}

impl Normalization {
    #[inline]
    fn apply(&self, value: u8) -> f32 {
        (value as f32 - self.mean) / self.std
    }
}

/// 居中裁剪并归一化
///
/// # 参数
/// * `pixels` - 行优先的像素序列，长度为 `宽 × 高`，多余的尾部像素被忽略
/// * `captured_width` - 采集帧宽度
/// * `window` - 模型输入窗口边长
/// * `norm` - 通道归一化参数
///
/// # 返回值
/// 返回形状为 `(1, window, window, 3)` 的张量，alpha 通道被丢弃
///
/// # 错误处理
/// 宽度为 0、宽度小于窗口或推算高度小于窗口时返回几何错误
pub fn crop<P>(
    pixels: &[P],
    captured_width: usize,
    window: usize,
    norm: Normalization,
) -> Result<InputTensor>
where
    P: Pixel<Subpixel = u8>,
{
    if captured_width == 0 {
        return Err(DetectError::Geometry {
            width: 0,
            height: 0,
            window,
        });
    }
    let height = pixels.len() / captured_width;
    if captured_width < window || height < window {
        return Err(DetectError::Geometry {
            width: captured_width,
            height,
            window,
        });
    }

    // 垂直偏移按像素计算，(height - window) 为奇数时起点落在行中间
    let mut beginning = ((height - window) * captured_width) / 2;
    let left_offset = (captured_width - window) / 2;
    debug!(
        "裁剪 {}x{} 帧, 起始偏移 {}, 左偏移 {}",
        captured_width, height, beginning, left_offset
    );

    let mut values = Vec::with_capacity(window * window * RGB_CHANNELS);
    for _ in 0..window {
        let row = &pixels[beginning + left_offset..beginning + left_offset + window];
        for pixel in row {
            let [r, g, b] = pixel.to_rgb().0;
            values.push(norm.apply(r));
            values.push(norm.apply(g));
            values.push(norm.apply(b));
        }
        beginning += captured_width;
    }

    let data = Array4::from_shape_vec((1, window, window, RGB_CHANNELS), values)
        .map_err(|e| DetectError::config(format!("输入张量形状错误: {}", e)))?;
    Ok(InputTensor { data })
}

/// 加载图像文件
///
/// # 参数
/// * `path` - 图像文件路径
pub fn load_image(path: &str) -> Result<DynamicImage> {
    let img = image::open(path)?;
    debug!("已加载图像 {}: {}x{}", path, img.width(), img.height());
    Ok(img)
}

/// 把图像展开为行优先的 RGBA 像素序列
///
/// # 返回值
/// 返回 `(像素序列, 宽度)`，可直接交给 [`crop`] 或检测器
pub fn image_to_pixels(img: &DynamicImage) -> (Vec<Rgba<u8>>, usize) {
    let rgba = img.to_rgba8();
    let width = rgba.width() as usize;
    (rgba.pixels().copied().collect(), width)
}

use std::future::Future;

use image::{DynamicImage, GenericImageView, Pixel};
use raqote::{DrawOptions, DrawTarget, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};
use tracing::{debug, info};

use crate::color::bounds::BoundingBox;
use crate::color::infer::InferenceEngine;
use crate::color::model::LabelTable;
use crate::color::nms::suppress;
use crate::color::posts::{DecodeOptions, RawOutput, decode};
use crate::color::prevs::{Normalization, crop};
use crate::config::DetectorConfig;
use crate::error::{DetectError, Result};

/// 从像素中检测目标的能力
///
/// 不同模型族的检测器都实现这一个接口。
pub trait Detector {
    /// 对一帧执行检测
    ///
    /// 同一实例同一时刻只允许一次检测；`&mut self` 保证了这一点。
    fn detect<P>(
        &mut self,
        pixels: &[P],
        captured_width: usize,
    ) -> impl Future<Output = Result<Vec<BoundingBox>>> + Send
    where
        P: Pixel<Subpixel = u8> + Sync;
}

/// YOLO目标检测器
///
/// 封装了完整的检测流程：居中裁剪、模型推理、解码和非极大值抑制。
///
/// # 示例
///
/// ```no_run
/// use tagsight::{DetectorConfig, LabelTable, OrtEngine, YoloDetector};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DetectorConfig::default()
///     .with_confidence_threshold(0.5)
///     .with_iou_threshold(0.45);
/// let engine = OrtEngine::from_file("models/markers.onnx", &config)?;
/// let labels = LabelTable::from_file("models/labels.txt")?;
/// let mut detector = YoloDetector::new(engine, config, labels)?;
/// # Ok(())
/// # }
/// ```
pub struct YoloDetector<E> {
    engine: E,
    config: DetectorConfig,
    labels: LabelTable,
}

impl<E: InferenceEngine> YoloDetector<E> {
    /// 创建新的YoloDetector实例
    ///
    /// # 参数
    /// * `engine` - 推理引擎
    /// * `config` - 检测器配置
    /// * `labels` - 标签表，长度不能小于类别数
    ///
    /// # 错误处理
    /// 配置取值非法或标签表过短时返回配置错误
    pub fn new(engine: E, config: DetectorConfig, labels: LabelTable) -> Result<Self> {
        config.validate()?;
        if labels.len() < config.num_classes {
            return Err(DetectError::config(format!(
                "标签表只有 {} 项, 模型有 {} 个类别",
                labels.len(),
                config.num_classes
            )));
        }
        info!(
            "创建检测器: 窗口 {}, {} 类, {} 行",
            config.window_size, config.num_classes, config.num_rows
        );
        Ok(Self {
            engine,
            config,
            labels,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    fn normalization(&self) -> Normalization {
        Normalization {
            mean: self.config.image_mean,
            std: self.config.image_std,
        }
    }

    /// 对推理输出做解码与去重
    pub fn postprocess(&self, output: &RawOutput) -> Result<Vec<BoundingBox>> {
        let table = output.table(
            self.config.output_layout,
            self.config.num_rows,
            self.config.row_width(),
        )?;
        let candidates = decode(table, &self.labels, &DecodeOptions::from(&self.config))?;
        Ok(suppress(
            &candidates,
            self.config.objects_limit,
            self.config.iou_threshold,
        ))
    }

    /// 完整的检测流程：从像素到检测结果
    ///
    /// 几何错误在提交推理之前返回；推理失败时跳过解码与去重。
    /// 输入张量在推理结束后立即释放，不论成功与否。
    pub async fn detect<P>(&mut self, pixels: &[P], captured_width: usize) -> Result<Vec<BoundingBox>>
    where
        P: Pixel<Subpixel = u8> + Sync,
    {
        let input = crop(
            pixels,
            captured_width,
            self.config.window_size,
            self.normalization(),
        )?;

        let output = self.engine.infer(&input).await;
        drop(input);
        let output = output?;

        let boxes = self.postprocess(&output)?;
        debug!("检测到 {} 个目标", boxes.len());
        Ok(boxes)
    }
}

impl<E: InferenceEngine> Detector for YoloDetector<E> {
    fn detect<P>(
        &mut self,
        pixels: &[P],
        captured_width: usize,
    ) -> impl Future<Output = Result<Vec<BoundingBox>>> + Send
    where
        P: Pixel<Subpixel = u8> + Sync,
    {
        YoloDetector::detect(self, pixels, captured_width)
    }
}

/// 裁剪窗口左上角在原始帧中的位置
///
/// 按整行计算。垂直余量为奇数时裁剪起点在行中间（见 [`crop`]），
/// 实际窗口比这里的原点向右偏移约半个帧宽并折行，绘制结果只是近似。
pub fn window_origin(frame_width: u32, frame_height: u32, window: usize) -> (f32, f32) {
    let left = frame_width.saturating_sub(window as u32) / 2;
    let top = frame_height.saturating_sub(window as u32) / 2;
    (left as f32, top as f32)
}

fn label_color(label: &str) -> SolidSource {
    match label {
        "QR" => SolidSource { r: 0x62, g: 0x00, b: 0xEE, a: 0xFF },
        "ArUco" => SolidSource { r: 0x00, g: 0xFF, b: 0xFF, a: 0xFF },
        _ => SolidSource { r: 0xFF, g: 0x00, b: 0x00, a: 0xFF },
    }
}

/// 在图像上绘制检测结果
///
/// 检测框位于裁剪窗口坐标系，绘制时平移回原始帧。按标签使用不同颜色。
///
/// # 参数
/// * `image` - 原始图像
/// * `boxes` - 检测结果
/// * `window` - 模型输入窗口边长
///
/// # 返回值
/// 返回绘制了检测框的图像
pub fn draw_detections(image: &DynamicImage, boxes: &[BoundingBox], window: usize) -> Result<DynamicImage> {
    let (img_width, img_height) = image.dimensions();
    let mut dt = DrawTarget::new(img_width as i32, img_height as i32);

    let rgba_image = image.to_rgba8();
    let image_data: Vec<u32> = rgba_image
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            u32::from_le_bytes([b, g, r, a])
        })
        .collect();
    let img = raqote::Image {
        width: img_width as i32,
        height: img_height as i32,
        data: &image_data,
    };
    dt.draw_image_at(0.0, 0.0, &img, &DrawOptions::new());

    let (left, top) = window_origin(img_width, img_height, window);
    for bbox in boxes {
        let rect = bbox.rect();
        let mut pb = PathBuilder::new();
        pb.rect(left + rect.x1, top + rect.y1, rect.width(), rect.height());
        let path = pb.finish();

        dt.stroke(
            &path,
            &Source::Solid(label_color(&bbox.label)),
            &StrokeStyle {
                join: LineJoin::Round,
                width: 2.0,
                ..StrokeStyle::default()
            },
            &DrawOptions::default(),
        );
    }

    // BGRA 转回 RGBA
    let pixels: Vec<u8> = dt
        .get_data()
        .iter()
        .flat_map(|&pixel| {
            let bytes = pixel.to_le_bytes();
            [bytes[2], bytes[1], bytes[0], bytes[3]]
        })
        .collect();

    image::ImageBuffer::from_raw(img_width, img_height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| DetectError::config("绘制结果尺寸与原图不一致"))
}

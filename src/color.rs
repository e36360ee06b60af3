//! Color模块 - 基于YOLO的标记检测后处理
//!
//! 该模块把一帧像素转换为去重后的带标签检测框：
//! - 居中裁剪与归一化（prevs）
//! - 调用外部推理引擎（infer）
//! - 解码锚点输出表（posts）
//! - 贪心非极大值抑制（nms）
//!
//! # 工作流程
//!
//! 1. 加载配置和标签表
//! 2. 创建推理引擎（如 OrtEngine）
//! 3. 创建YoloDetector实例
//! 4. 调用detect方法执行检测
//! 5. 使用draw_detections绘制检测结果
//!
//! # 示例
//!
//! ```no_run
//! use tagsight::{DetectorConfig, LabelTable, OrtEngine, YoloDetector, image_to_pixels, load_image};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DetectorConfig::from_json_file("models/markers.json")?;
//! let engine = OrtEngine::from_file("models/markers.onnx", &config)?;
//! let labels = LabelTable::from_file("models/labels.txt")?;
//! let mut detector = YoloDetector::new(engine, config, labels)?;
//!
//! let image = load_image("frame.jpg")?;
//! let (pixels, width) = image_to_pixels(&image);
//! let boxes = detector.detect(&pixels, width).await?;
//! # Ok(())
//! # }
//! ```

pub mod bounds;
pub mod detect;
pub mod infer;
pub mod model;
pub mod nms;
pub mod posts;
pub mod prevs;

// 重新导出常用类型和函数
pub use bounds::{BoundingBox, CandidateBox, Dimensions, Rect};
pub use detect::{Detector, YoloDetector, draw_detections};
pub use infer::{InferenceEngine, OrtEngine};
pub use model::{LabelTable, load_model};
pub use nms::suppress;
pub use posts::{DecodeOptions, RawOutput, decode, sigmoid};
pub use prevs::{InputTensor, Normalization, crop, image_to_pixels, load_image};

pub mod color;
pub mod config;
pub mod error;
pub mod runner;
pub mod utils;

// 重新导出color模块中的常用类型和函数
pub use color::{BoundingBox, Detector, InferenceEngine, LabelTable, OrtEngine, YoloDetector};
pub use color::{crop, decode, draw_detections, image_to_pixels, load_image, suppress};
pub use config::DetectorConfig;
pub use error::{DetectError, Result};
pub use runner::{DetectionLoop, Frame};

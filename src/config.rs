use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DetectError, Result};

pub const FRAME_CHANNEL_CAPACITY: usize = 4;
pub const BOX_ATTRIBUTES: usize = 5;

// 目标检测超参数配置
pub const DEFAULT_WINDOW_SIZE: usize = 416;
pub const DEFAULT_CLASS_COUNT: usize = 3;
pub const DEFAULT_OUTPUT_ROWS: usize = 10647;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.25;
pub const DEFAULT_OBJECTS_LIMIT: usize = 20;
pub const DEFAULT_IMAGE_MEAN: f32 = 0.0;
pub const DEFAULT_IMAGE_STD: f32 = 255.0;
pub const DEFAULT_INPUT_NAME: &str = "images";
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// 类别得分在与目标置信度相乘之前的变换方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassScore {
    /// 直接使用网络输出的原始值
    #[default]
    Raw,
    /// 对每个类别分别做 sigmoid
    Sigmoid,
    /// 在所有类别上做 softmax
    Softmax,
}

/// 输出张量的内存布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `[rows, 5 + classes]`，每个锚点一行
    #[default]
    AnchorMajor,
    /// `[5 + classes, rows]`，每个属性一行
    AttributeMajor,
}

/// 检测器配置
///
/// 所有字段都随模型固定，不随单次调用变化。可以从 JSON 文件加载，
/// 缺省字段使用默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 模型输入窗口边长（正方形）
    pub window_size: usize,
    pub num_classes: usize,
    pub num_rows: usize,
    /// 置信度阈值，低于此值的候选框被丢弃
    pub min_confidence: f32,
    /// NMS 的 IoU 阈值，与置信度阈值相互独立
    pub iou_threshold: f32,
    /// 每帧最多返回的检测框数量
    pub objects_limit: usize,
    pub image_mean: f32,
    pub image_std: f32,
    pub input_name: String,
    pub output_name: String,
    pub class_score: ClassScore,
    pub output_layout: OutputLayout,
    /// 输出几何坐标的缩放系数，网络输出不是像素单位时使用
    pub box_scale: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            num_classes: DEFAULT_CLASS_COUNT,
            num_rows: DEFAULT_OUTPUT_ROWS,
            min_confidence: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            objects_limit: DEFAULT_OBJECTS_LIMIT,
            image_mean: DEFAULT_IMAGE_MEAN,
            image_std: DEFAULT_IMAGE_STD,
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            class_score: ClassScore::default(),
            output_layout: OutputLayout::default(),
            box_scale: 1.0,
        }
    }
}

impl DetectorConfig {
    /// 从 JSON 文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回值
    /// 返回经过校验的配置
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: DetectorConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!("已加载检测器配置: {:?}", path);
        Ok(config)
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_model_shape(mut self, num_rows: usize, num_classes: usize) -> Self {
        self.num_rows = num_rows;
        self.num_classes = num_classes;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.min_confidence = threshold;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    pub fn with_objects_limit(mut self, limit: usize) -> Self {
        self.objects_limit = limit;
        self
    }

    pub fn with_normalization(mut self, mean: f32, std: f32) -> Self {
        self.image_mean = mean;
        self.image_std = std;
        self
    }

    pub fn with_class_score(mut self, class_score: ClassScore) -> Self {
        self.class_score = class_score;
        self
    }

    pub fn with_output_layout(mut self, layout: OutputLayout) -> Self {
        self.output_layout = layout;
        self
    }

    pub fn with_tensor_names(mut self, input: &str, output: &str) -> Self {
        self.input_name = input.to_string();
        self.output_name = output.to_string();
        self
    }

    /// 输出表每行的列数：`x, y, w, h, objectness` 加上类别数
    pub fn row_width(&self) -> usize {
        BOX_ATTRIBUTES + self.num_classes
    }

    /// 校验配置取值范围
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(DetectError::config("window_size 必须大于 0"));
        }
        if self.num_classes == 0 {
            return Err(DetectError::config("num_classes 必须大于 0"));
        }
        if self.num_rows == 0 {
            return Err(DetectError::config("num_rows 必须大于 0"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(DetectError::config(format!(
                "min_confidence 超出范围 [0, 1]: {}",
                self.min_confidence
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(DetectError::config(format!(
                "iou_threshold 超出范围 [0, 1]: {}",
                self.iou_threshold
            )));
        }
        if self.objects_limit == 0 {
            return Err(DetectError::config("objects_limit 必须至少为 1"));
        }
        if self.image_std == 0.0 || !self.image_std.is_finite() {
            return Err(DetectError::config(format!(
                "image_std 无效: {}",
                self.image_std
            )));
        }
        if !(self.box_scale.is_finite() && self.box_scale > 0.0) {
            return Err(DetectError::config(format!(
                "box_scale 无效: {}",
                self.box_scale
            )));
        }
        if self.input_name.is_empty() || self.output_name.is_empty() {
            return Err(DetectError::config("输入/输出张量名称不能为空"));
        }
        Ok(())
    }
}

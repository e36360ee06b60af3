//! 错误类型
//!
//! 检测流程中的错误分为三类：
//! - 几何错误：调用方传入的帧不满足裁剪前提条件
//! - 配置错误：模型与标签表、输出张量形状不匹配，对该检测器实例是致命的
//! - 推理错误：外部推理引擎报告失败
//!
//! 另外还有加载配置文件、标签文件和图像时的 I/O 类错误。

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DetectError>;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("帧尺寸无效: 宽度 {width}, 推算高度 {height}, 窗口 {window}")]
    Geometry {
        width: usize,
        height: usize,
        window: usize,
    },
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("类别索引 {index} 超出标签表范围 (共 {len} 个标签)")]
    LabelOutOfRange { index: usize, len: usize },
    #[error("输出张量形状不匹配: 期望 {expected_rows}x{expected_cols}, 实际 {actual:?}")]
    OutputShape {
        expected_rows: usize,
        expected_cols: usize,
        actual: Vec<usize>,
    },
    #[error("推理失败: {0}")]
    Inference(String),
    #[error("检测循环已停止")]
    Closed,
    #[error("检测循环任务异常退出: {0}")]
    TaskFailed(String),
    #[error("ONNX Runtime 错误: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("配置解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("图像错误: {0}")]
    Image(#[from] image::ImageError),
}

impl DetectError {
    pub fn config(msg: impl Into<String>) -> Self {
        DetectError::Configuration(msg.into())
    }

    pub fn inference(msg: impl std::fmt::Display) -> Self {
        DetectError::Inference(msg.to_string())
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self, DetectError::Geometry { .. })
    }

    /// 模型/标签不匹配一类的错误，重试没有意义
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DetectError::Configuration(_)
                | DetectError::LabelOutOfRange { .. }
                | DetectError::OutputShape { .. }
        )
    }

    pub fn is_inference(&self) -> bool {
        matches!(self, DetectError::Inference(_) | DetectError::Ort(_))
    }
}

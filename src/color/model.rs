use std::path::Path;

use ort::session::{Session, builder::GraphOptimizationLevel};
use tracing::info;

use crate::error::Result;

/// 加载YOLO模型
///
/// 加载ONNX格式的YOLO模型，并应用优化配置。
///
/// # 参数
/// * `model_path` - 模型文件路径
///
/// # 返回值
/// 返回加载的Session对象
///
/// # 错误处理
/// 如果模型加载失败会返回Err
pub fn load_model(model_path: impl AsRef<Path>) -> Result<Session> {
    let model_path = model_path.as_ref();
    info!("加载模型文件: {:?}", model_path);
    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .commit_from_file(model_path)?;
    info!("模型加载完成");
    Ok(model)
}

/// 有序的类别名称表
///
/// 检测器生命周期内只读，下标即类别编号。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// 解析标签文本：按换行切分，丢弃空行
    pub fn parse(text: &str) -> Self {
        let labels = text
            .split(['\n', '\r'])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { labels }
    }

    /// 从文件加载标签表
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::parse(&std::fs::read_to_string(path)?);
        info!("已加载 {} 个标签: {:?}", table.len(), path);
        Ok(table)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for LabelTable {
    fn from(labels: Vec<String>) -> Self {
        Self { labels }
    }
}

impl From<&[&str]> for LabelTable {
    fn from(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }
}

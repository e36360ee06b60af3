//! 检测结果解码模块
//!
//! 把推理输出的锚点表解码为经过置信度过滤的候选框。
//! 每行依次为 `[x, y, w, h, objectness, class_0 .. class_{n-1}]`。

use ndarray::{ArrayView1, ArrayView2};
use tracing::debug;

use crate::color::bounds::{CandidateBox, Dimensions};
use crate::color::model::LabelTable;
use crate::config::{BOX_ATTRIBUTES, ClassScore, DetectorConfig, OutputLayout};
use crate::error::{DetectError, Result};

const OBJECTNESS_COLUMN: usize = 4;

/// 推理引擎返回的原始输出
///
/// 数据由引擎拷贝出来，检测流程只在解码期间读取它。
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl RawOutput {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    /// 以锚点为行的二维视图
    ///
    /// 前导的长度为 1 的维度会被忽略，所以 `[1, rows, cols]` 和 `[rows, cols]` 都可接受。
    ///
    /// # 参数
    /// * `layout` - 输出张量的内存布局
    /// * `rows` - 锚点行数
    /// * `cols` - 每行列数
    ///
    /// # 错误处理
    /// 形状与配置不符时返回配置错误
    pub fn table(&self, layout: OutputLayout, rows: usize, cols: usize) -> Result<ArrayView2<'_, f32>> {
        let mut dims: &[usize] = &self.shape;
        while dims.len() > 2 && dims[0] == 1 {
            dims = &dims[1..];
        }
        let (expected_outer, expected_inner) = match layout {
            OutputLayout::AnchorMajor => (rows, cols),
            OutputLayout::AttributeMajor => (cols, rows),
        };
        let mismatch = || DetectError::OutputShape {
            expected_rows: rows,
            expected_cols: cols,
            actual: self.shape.clone(),
        };
        if dims != [expected_outer, expected_inner].as_slice() || self.data.len() != rows * cols {
            return Err(mismatch());
        }

        let view = ArrayView2::from_shape((expected_outer, expected_inner), &self.data)
            .map_err(|_| mismatch())?;
        Ok(match layout {
            OutputLayout::AnchorMajor => view,
            OutputLayout::AttributeMajor => view.reversed_axes(),
        })
    }
}

/// 解码参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    pub num_rows: usize,
    pub num_classes: usize,
    pub min_confidence: f32,
    pub class_score: ClassScore,
    pub box_scale: f32,
}

impl From<&DetectorConfig> for DecodeOptions {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            num_rows: config.num_rows,
            num_classes: config.num_classes,
            min_confidence: config.min_confidence,
            class_score: config.class_score,
            box_scale: config.box_scale,
        }
    }
}

/// `e^v / (1 + e^v)`，按符号分支计算以避免溢出
pub fn sigmoid(value: f32) -> f32 {
    if value >= 0.0 {
        1.0 / (1.0 + (-value).exp())
    } else {
        let k = value.exp();
        k / (1.0 + k)
    }
}

/// 在类别列上取最大值，返回 `(类别下标, 得分)`，相同时取靠前的下标
fn best_class(classes: ArrayView1<'_, f32>, mode: ClassScore) -> (usize, f32) {
    let mut class_id = 0;
    let mut max_logit = classes[0];
    for (i, &logit) in classes.iter().enumerate() {
        if logit > max_logit {
            max_logit = logit;
            class_id = i;
        }
    }

    let score = match mode {
        ClassScore::Raw => max_logit,
        ClassScore::Sigmoid => sigmoid(max_logit),
        ClassScore::Softmax => {
            let sum: f32 = classes.iter().map(|&v| (v - max_logit).exp()).sum();
            1.0 / sum
        }
    };
    (class_id, score)
}

/// 解码输出表
///
/// 对每一行：
/// 1. objectness 经 sigmoid 得到置信度，低于阈值的行直接跳过
/// 2. 在类别列中取最大值，置信度与类别得分之积低于阈值的行跳过
/// 3. 读取几何信息并乘以 `box_scale`，生成候选框
///
/// 输出顺序与行号一致，不做排序。
///
/// # 参数
/// * `table` - 以锚点为行的输出表
/// * `labels` - 标签表
/// * `options` - 解码参数
///
/// # 错误处理
/// 表的形状与配置不符，或类别下标超出标签表时返回配置错误，整次解码失败
///
/// # 示例
///
/// ```
/// use ndarray::array;
/// use tagsight::color::model::LabelTable;
/// use tagsight::color::posts::{decode, DecodeOptions};
/// use tagsight::config::ClassScore;
///
/// let labels = LabelTable::from(vec!["QR".to_string(), "ArUco".to_string()]);
/// let table = array![[10.0, 10.0, 4.0, 4.0, 8.0, 0.9, 0.1]];
/// let options = DecodeOptions {
///     num_rows: 1,
///     num_classes: 2,
///     min_confidence: 0.5,
///     class_score: ClassScore::Raw,
///     box_scale: 1.0,
/// };
/// let candidates = decode(table.view(), &labels, &options).unwrap();
/// assert_eq!(candidates[0].label, "QR");
/// ```
pub fn decode(
    table: ArrayView2<'_, f32>,
    labels: &LabelTable,
    options: &DecodeOptions,
) -> Result<Vec<CandidateBox>> {
    let cols = BOX_ATTRIBUTES + options.num_classes;
    if options.num_classes == 0 || table.nrows() != options.num_rows || table.ncols() != cols {
        return Err(DetectError::OutputShape {
            expected_rows: options.num_rows,
            expected_cols: cols,
            actual: table.shape().to_vec(),
        });
    }

    let mut candidates = Vec::new();
    for row in table.rows() {
        let confidence = sigmoid(row[OBJECTNESS_COLUMN]);
        // 写成取反的比较，NaN 也会被丢弃
        if !(confidence >= options.min_confidence) {
            continue;
        }

        let classes = row.slice(ndarray::s![BOX_ATTRIBUTES..]);
        let (class_id, class_score) = best_class(classes, options.class_score);
        let score = confidence * class_score;
        if !(score >= options.min_confidence) {
            continue;
        }

        let label = labels.get(class_id).ok_or(DetectError::LabelOutOfRange {
            index: class_id,
            len: labels.len(),
        })?;

        let dimensions = Dimensions::new(row[0], row[1], row[2], row[3]).scaled(options.box_scale);
        candidates.push(CandidateBox {
            dimensions,
            confidence,
            class_id,
            label: label.to_string(),
            score,
        });
    }

    debug!("解码得到 {} 个候选框", candidates.len());
    Ok(candidates)
}

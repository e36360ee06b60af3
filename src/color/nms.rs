//! 非极大值抑制

use tracing::debug;

use crate::color::bounds::{BoundingBox, CandidateBox};
use crate::utils::sort::argsort_desc_by_key;

/// 贪心非极大值抑制
///
/// 按置信度降序遍历候选框（置信度相同时原下标小的在前），保留每个仍处于
/// 激活状态的框，并把后面与它 IoU 超过阈值的框标记为失活。结果达到
/// `limit` 个时立即停止。
///
/// # 参数
/// * `candidates` - 候选框列表，不会被修改
/// * `limit` - 最多保留的数量
/// * `iou_threshold` - IoU 阈值，严格大于该值才抑制
///
/// # 返回值
/// 返回按接受顺序（即置信度降序）排列的检测框
pub fn suppress(candidates: &[CandidateBox], limit: usize, iou_threshold: f32) -> Vec<BoundingBox> {
    let mut results = Vec::new();
    if limit == 0 || candidates.is_empty() {
        return results;
    }

    let order = argsort_desc_by_key(candidates, |c| c.confidence);
    // 按排序后的位置索引；active_count 为尚未处理且未被抑制的数量
    let mut active = vec![true; order.len()];
    let mut active_count = order.len();

    for i in 0..order.len() {
        if !active[i] {
            continue;
        }

        let box_a = &candidates[order[i]];
        results.push(BoundingBox::from(box_a));
        active_count -= 1;
        if results.len() >= limit {
            break;
        }

        let rect_a = box_a.rect();
        for j in (i + 1)..order.len() {
            if !active[j] {
                continue;
            }
            let rect_b = candidates[order[j]].rect();
            if rect_a.iou(&rect_b) > iou_threshold {
                active[j] = false;
                active_count -= 1;
            }
        }

        if active_count == 0 {
            break;
        }
    }

    debug!(
        "NMS: {} 个候选框保留 {} 个",
        candidates.len(),
        results.len()
    );
    results
}

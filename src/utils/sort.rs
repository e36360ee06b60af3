use std::cmp::Ordering;

/// 返回按比较函数排序后的下标排列，原切片不变
///
/// 使用稳定排序，比较结果相等的元素保持原有的下标先后顺序。
pub fn argsort_by<T, F>(items: &[T], mut compare: F) -> Vec<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| compare(&items[a], &items[b]));
    order
}

/// 按键值降序的下标排列，键值相同时下标小的在前
pub fn argsort_desc_by_key<T, F>(items: &[T], mut key: F) -> Vec<usize>
where
    F: FnMut(&T) -> f32,
{
    argsort_by(items, |a, b| key(b).total_cmp(&key(a)))
}

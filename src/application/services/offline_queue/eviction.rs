use crate::domain::entities::offline::QueuedAction;
use crate::domain::value_objects::offline::ActionPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    /// 指定インデックスの既存アクションを追い出してから追加する。
    AdmitEvicting(usize),
    Reject,
}

/// 上限に達したキューへ新しいアクションを受け入れるかを決める。
///
/// 新しいアクションが最も低い優先度を上回る場合のみ受け入れ、その優先度帯で最も古い
/// （配列の先頭に近い）ものを追い出す。同じ優先度なら既存側を残す。
pub fn decide_admission(
    pending: &[QueuedAction],
    incoming: ActionPriority,
    capacity: usize,
) -> Admission {
    if pending.len() < capacity {
        return Admission::Admit;
    }

    match lowest_priority_index(pending) {
        Some(index) if incoming > pending[index].priority => Admission::AdmitEvicting(index),
        _ => Admission::Reject,
    }
}

/// 上限を超えている分を同じ規則で追い出し、追い出したものを返す。
pub fn trim_to_capacity(pending: &mut Vec<QueuedAction>, capacity: usize) -> Vec<QueuedAction> {
    let mut evicted = Vec::new();
    while pending.len() > capacity {
        match lowest_priority_index(pending) {
            Some(index) => evicted.push(pending.remove(index)),
            None => break,
        }
    }
    evicted
}

fn lowest_priority_index(pending: &[QueuedAction]) -> Option<usize> {
    // min_by_key は同値なら最初の要素を返す
    pending
        .iter()
        .enumerate()
        .min_by_key(|(_, action)| action.priority)
        .map(|(index, _)| index)
}

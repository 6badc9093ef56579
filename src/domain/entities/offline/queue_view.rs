use super::QueuedAction;
use crate::domain::value_objects::offline::OfflineActionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 監視者へ渡すキュー状態のコピー。内部状態への参照は持たない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueView {
    pub pending: Vec<QueuedAction>,
    pub dead_lettered: Vec<OfflineActionId>,
    pub last_sync: Option<DateTime<Utc>>,
    pub is_online: bool,
    pub is_processing: bool,
}

impl QueueView {
    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn is_dead_lettered(&self, id: &OfflineActionId) -> bool {
        self.dead_lettered.contains(id)
    }
}

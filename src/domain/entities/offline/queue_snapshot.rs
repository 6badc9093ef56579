use super::QueuedAction;
use crate::domain::value_objects::offline::OfflineActionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 永続化の単位。保存・復元は常にこのスナップショット全体で行う。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    #[serde(default)]
    pub actions: Vec<QueuedAction>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_actions: Vec<OfflineActionId>,
}

impl QueueSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.failed_actions.is_empty() && self.last_sync.is_none()
    }

    /// 復元時の整合性補正。pending と dead-letter の ID 集合を素に保ち、重複を除く。
    pub fn normalized(mut self) -> Self {
        let mut seen_pending = HashSet::new();
        self.actions
            .retain(|action| seen_pending.insert(action.id.clone()));

        let mut seen_failed = HashSet::new();
        self.failed_actions
            .retain(|id| !seen_pending.contains(id) && seen_failed.insert(id.clone()));

        self
    }
}

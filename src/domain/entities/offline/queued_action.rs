use crate::domain::value_objects::offline::{
    ActionPriority, ActionTarget, EntityId, OfflineActionId, OfflineActionKind, OfflinePayload,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// キューへ追加する際のドラフト。
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueRequest {
    pub kind: OfflineActionKind,
    pub target: ActionTarget,
    pub payload: OfflinePayload,
    pub options: EnqueueOptions,
}

impl EnqueueRequest {
    pub fn new(kind: OfflineActionKind, target: ActionTarget, payload: OfflinePayload) -> Self {
        Self {
            kind,
            target,
            payload,
            options: EnqueueOptions::default(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.options.priority = Some(ActionPriority::new(priority));
        self
    }

    pub fn with_entity(mut self, entity_id: EntityId, entity_version: u64) -> Self {
        self.options.entity_id = Some(entity_id);
        self.options.entity_version = Some(entity_version);
        self
    }

    pub fn skip_on_conflict(mut self, skip: bool) -> Self {
        self.options.skip_on_conflict = skip;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnqueueOptions {
    pub priority: Option<ActionPriority>,
    pub entity_id: Option<EntityId>,
    pub entity_version: Option<u64>,
    pub skip_on_conflict: bool,
}

/// 送信待ちの変更1件。生成後に変化するのは再試行メタデータのみ。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub id: OfflineActionId,
    pub kind: OfflineActionKind,
    pub target: ActionTarget,
    pub payload: OfflinePayload,
    pub queued_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub last_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: ActionPriority,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub entity_version: Option<u64>,
    #[serde(default)]
    pub skip_on_conflict: bool,
}

impl QueuedAction {
    pub fn from_request(
        id: OfflineActionId,
        request: EnqueueRequest,
        queued_at: DateTime<Utc>,
    ) -> Self {
        let EnqueueRequest {
            kind,
            target,
            payload,
            options,
        } = request;

        Self {
            id,
            kind,
            target,
            payload,
            queued_at,
            retry_count: 0,
            last_retry_at: None,
            priority: options.priority.unwrap_or_default(),
            entity_id: options.entity_id,
            entity_version: options.entity_version,
            skip_on_conflict: options.skip_on_conflict,
        }
    }

    /// 競合検出に必要な (entity_id, entity_version) が揃っている場合のみ返す。
    pub fn version_guard(&self) -> Option<(&EntityId, u64)> {
        match (&self.entity_id, self.entity_version) {
            (Some(entity_id), Some(version)) => Some((entity_id, version)),
            _ => None,
        }
    }

    pub fn record_failure(&mut self, at: DateTime<Utc>) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_retry_at = Some(at);
    }

    pub fn has_exhausted(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}

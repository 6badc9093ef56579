use crate::application::ports::KeyValueStore;
use crate::domain::entities::offline::QueueSnapshot;
use crate::infrastructure::offline::metrics::OfflineDrainMetricsSnapshot;
use std::sync::Arc;

const DRAIN_HISTORY_SUFFIX: &str = ".drain_metrics";

/// キュー全体のスナップショットを1キーで読み書きする。
///
/// 読み込み失敗・破損は空のキューとして扱い、保存失敗はログに残して握りつぶす。
/// どちらも呼び出し側へエラーを返さない。
/// ドレインの累計は `<key>.drain_metrics` に別に保存する。
#[derive(Clone)]
pub struct SnapshotStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    history_key: String,
}

impl SnapshotStore {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            store,
            history_key: format!("{key}{DRAIN_HISTORY_SUFFIX}"),
            key,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn history_key(&self) -> &str {
        &self.history_key
    }

    pub async fn load(&self) -> QueueSnapshot {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::warn!(
                    target: "offline::store",
                    key = %self.key,
                    "no persisted offline queue found; starting empty"
                );
                return QueueSnapshot::empty();
            }
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    key = %self.key,
                    error = %err,
                    "failed to read offline queue; starting empty"
                );
                return QueueSnapshot::empty();
            }
        };

        match serde_json::from_str::<QueueSnapshot>(&raw) {
            Ok(snapshot) => {
                let snapshot = snapshot.normalized();
                tracing::debug!(
                    target: "offline::store",
                    key = %self.key,
                    pending = snapshot.actions.len(),
                    dead_lettered = snapshot.failed_actions.len(),
                    "restored offline queue"
                );
                snapshot
            }
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    key = %self.key,
                    error = %err,
                    "persisted offline queue is corrupt; starting empty"
                );
                QueueSnapshot::empty()
            }
        }
    }

    pub async fn save(&self, snapshot: &QueueSnapshot) -> bool {
        let encoded = match serde_json::to_string(snapshot) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    key = %self.key,
                    error = %err,
                    "failed to encode offline queue"
                );
                return false;
            }
        };

        match self.store.set(&self.key, &encoded).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    key = %self.key,
                    error = %err,
                    "failed to persist offline queue; keeping in-memory state"
                );
                false
            }
        }
    }

    /// 読めない・壊れている場合は空の累計から始める。
    pub async fn load_drain_history(&self) -> OfflineDrainMetricsSnapshot {
        let raw = match self.store.get(&self.history_key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return OfflineDrainMetricsSnapshot::default(),
            Err(err) => {
                tracing::warn!(
                    target: "offline::store",
                    key = %self.history_key,
                    error = %err,
                    "failed to read drain history; starting from zero"
                );
                return OfflineDrainMetricsSnapshot::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(
                target: "offline::store",
                key = %self.history_key,
                error = %err,
                "persisted drain history is corrupt; starting from zero"
            );
            OfflineDrainMetricsSnapshot::default()
        })
    }

    pub async fn save_drain_history(&self, history: &OfflineDrainMetricsSnapshot) -> bool {
        let result = match serde_json::to_string(history) {
            Ok(encoded) => self.store.set(&self.history_key, &encoded).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            tracing::warn!(
                target: "offline::store",
                key = %self.history_key,
                error = %err,
                "failed to persist drain history"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::offline::{EnqueueRequest, QueuedAction};
    use crate::domain::value_objects::offline::{
        ActionTarget, HttpVerb, OfflineActionId, OfflineActionKind, OfflinePayload,
    };
    use crate::infrastructure::offline::MemoryKeyValueStore;
    use crate::shared::error::AppError;
    use async_trait::async_trait;
    use chrono::Utc;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::Storage("disk unavailable".into()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::Storage("disk full".into()))
        }

        async fn delete(&self, _key: &str) -> Result<bool, AppError> {
            Err(AppError::Storage("disk unavailable".into()))
        }
    }

    fn action(id: &str) -> QueuedAction {
        QueuedAction::from_request(
            OfflineActionId::parse(id).unwrap(),
            EnqueueRequest::new(
                OfflineActionKind::UpdateFields,
                ActionTarget::new("/api/tasks/7", HttpVerb::Patch).unwrap(),
                OfflinePayload::empty(),
            ),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let store = SnapshotStore::new(Arc::new(MemoryKeyValueStore::new()), "queue");
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_loads_empty() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.set("queue", "{not json").await.unwrap();

        let store = SnapshotStore::new(backend, "queue");
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_restores_snapshot() {
        let store = SnapshotStore::new(Arc::new(MemoryKeyValueStore::new()), "queue");
        let snapshot = QueueSnapshot {
            actions: vec![action("a"), action("b")],
            last_sync: Some(Utc::now()),
            failed_actions: vec![OfflineActionId::parse("z").unwrap()],
        };

        assert!(store.save(&snapshot).await);
        assert_eq!(store.load().await, snapshot);
    }

    #[tokio::test]
    async fn backend_failures_are_swallowed() {
        let store = SnapshotStore::new(Arc::new(BrokenStore), "queue");
        assert!(!store.save(&QueueSnapshot::empty()).await);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn drain_history_is_stored_beside_snapshot() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = SnapshotStore::new(backend.clone(), "queue");
        assert_eq!(store.history_key(), "queue.drain_metrics");
        assert_eq!(store.load_drain_history().await.cycles, 0);

        let history = OfflineDrainMetricsSnapshot {
            cycles: 3,
            total_succeeded: 7,
            last_trigger: Some("reconnect".into()),
            ..OfflineDrainMetricsSnapshot::default()
        };
        assert!(store.save_drain_history(&history).await);
        assert!(store.save(&QueueSnapshot::empty()).await);

        let reopened = SnapshotStore::new(backend.clone(), "queue");
        assert_eq!(reopened.load_drain_history().await, history);
        assert!(reopened.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_drain_history_starts_from_zero() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.set("queue.drain_metrics", "[1,2").await.unwrap();

        let store = SnapshotStore::new(backend, "queue");
        assert_eq!(
            store.load_drain_history().await,
            OfflineDrainMetricsSnapshot::default()
        );
        assert!(!SnapshotStore::new(Arc::new(BrokenStore), "queue")
            .save_drain_history(&OfflineDrainMetricsSnapshot::default())
            .await);
    }
}

use super::backoff::BackoffPolicy;
use super::conflict::ConflictDetector;
use super::connectivity::{ConnectivityGate, ConnectivityTransition, should_schedule_drain};
use super::eviction::{Admission, decide_admission, trim_to_capacity};
use super::observers::{ObserverRegistry, QueueListener, Subscription};
use super::processor::{QueueProcessor, RecordVerdict, drain_order};
use super::snapshot_store::SnapshotStore;
use crate::application::ports::{ActionDispatcher, Clock, EntityVersionSource, KeyValueStore};
use crate::domain::entities::offline::{
    DrainOutcome, EnqueueRequest, QueueSnapshot, QueueView, QueuedAction,
};
use crate::domain::value_objects::offline::OfflineActionId;
use crate::infrastructure::offline::SystemClock;
use crate::infrastructure::offline::metrics::{
    self, DrainCycleMetadata, OfflineDrainMetricsSnapshot,
};
use crate::shared::config::OfflineQueueConfig;
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTrigger {
    Manual,
    Enqueue,
    Reconnect,
    Startup,
}

impl DrainTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrainTrigger::Manual => "manual",
            DrainTrigger::Enqueue => "enqueue",
            DrainTrigger::Reconnect => "reconnect",
            DrainTrigger::Startup => "startup",
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<QueuedAction>,
    dead_lettered: Vec<OfflineActionId>,
    last_sync: Option<DateTime<Utc>>,
}

impl QueueState {
    fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        Self {
            pending: snapshot.actions,
            dead_lettered: snapshot.failed_actions,
            last_sync: snapshot.last_sync,
        }
    }

    fn to_snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            actions: self.pending.clone(),
            last_sync: self.last_sync,
            failed_actions: self.dead_lettered.clone(),
        }
    }

    fn position(&self, id: &OfflineActionId) -> Option<usize> {
        self.pending.iter().position(|action| &action.id == id)
    }
}

/// ドレイン中フラグを解放する。早期 return でも必ず戻す。
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct OfflineActionQueueBuilder {
    config: OfflineQueueConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    dispatcher: Option<Arc<dyn ActionDispatcher>>,
    version_source: Option<Arc<dyn EntityVersionSource>>,
    clock: Option<Arc<dyn Clock>>,
    online: bool,
}

impl OfflineActionQueueBuilder {
    pub fn new(config: OfflineQueueConfig) -> Self {
        Self {
            config,
            store: None,
            dispatcher: None,
            version_source: None,
            clock: None,
            online: true,
        }
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// 未設定の場合は競合検出を行わない。
    pub fn version_source(mut self, source: Arc<dyn EntityVersionSource>) -> Self {
        self.version_source = Some(source);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn online(mut self, online: bool) -> Self {
        self.online = online;
        self
    }

    /// 永続化済みのキューを復元して起動する。オンラインかつ未送信があればドレインを予約する。
    pub async fn open(self) -> Result<Arc<OfflineActionQueue>, AppError> {
        self.config
            .validate()
            .map_err(AppError::ConfigurationError)?;
        let store = self.store.ok_or_else(|| {
            AppError::ConfigurationError("Offline queue requires a key-value store".to_string())
        })?;
        let dispatcher = self.dispatcher.ok_or_else(|| {
            AppError::ConfigurationError("Offline queue requires an action dispatcher".to_string())
        })?;

        let snapshots = SnapshotStore::new(store, self.config.storage_key.clone());
        let mut state = QueueState::from_snapshot(snapshots.load().await);
        let drain_history = snapshots.load_drain_history().await;

        let evicted = trim_to_capacity(&mut state.pending, self.config.max_queue_size);
        for action in &evicted {
            tracing::warn!(
                target: "offline::queue",
                action_id = %action.id,
                priority = %action.priority,
                max_queue_size = self.config.max_queue_size,
                "restored queue exceeds capacity; evicted action"
            );
        }

        let conflicts = self
            .version_source
            .map(|source| ConflictDetector::new(source, self.config.conflict_policy));
        let processor = QueueProcessor::new(
            dispatcher,
            conflicts,
            BackoffPolicy::new(self.config.base_backoff(), self.config.max_retries),
            self.config.dispatch_timeout(),
        );

        let queue = Arc::new(OfflineActionQueue {
            state: Mutex::new(state),
            persist_lock: tokio::sync::Mutex::new(()),
            processing: AtomicBool::new(false),
            gate: ConnectivityGate::new(self.online),
            snapshots,
            processor,
            observers: ObserverRegistry::new(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            max_queue_size: self.config.max_queue_size,
            background: Mutex::new(Vec::new()),
            drain_history: Mutex::new(drain_history),
        });

        if !evicted.is_empty() {
            queue.persist().await;
        }
        queue.schedule_drain(DrainTrigger::Startup);

        Ok(queue)
    }
}

/// オフライン中の変更を保持し、接続回復時にリモートへ再送するキュー。
///
/// ドレインは同時に1つしか走らない。状態のロックは await をまたいで保持しない。
pub struct OfflineActionQueue {
    state: Mutex<QueueState>,
    persist_lock: tokio::sync::Mutex<()>,
    processing: AtomicBool,
    gate: ConnectivityGate,
    snapshots: SnapshotStore,
    processor: QueueProcessor,
    observers: ObserverRegistry,
    clock: Arc<dyn Clock>,
    max_queue_size: usize,
    background: Mutex<Vec<JoinHandle<Vec<DrainOutcome>>>>,
    drain_history: Mutex<OfflineDrainMetricsSnapshot>,
}

impl OfflineActionQueue {
    pub fn builder(config: OfflineQueueConfig) -> OfflineActionQueueBuilder {
        OfflineActionQueueBuilder::new(config)
    }

    /// ローカルに追加して ID を返す。上限超過時の追い出しも含め、失敗は返さない。
    pub async fn enqueue(self: &Arc<Self>, request: EnqueueRequest) -> OfflineActionId {
        let id = OfflineActionId::generate();
        let action = QueuedAction::from_request(id.clone(), request, self.clock.now());
        self.admit(action);

        self.persist().await;
        self.notify();
        self.schedule_drain(DrainTrigger::Enqueue);
        id
    }

    fn admit(&self, action: QueuedAction) {
        let mut state = self.lock_state();
        match decide_admission(&state.pending, action.priority, self.max_queue_size) {
            Admission::Admit => {
                tracing::debug!(
                    target: "offline::queue",
                    action_id = %action.id,
                    kind = action.kind.as_str(),
                    priority = %action.priority,
                    "offline action queued"
                );
                state.pending.push(action);
            }
            Admission::AdmitEvicting(index) => {
                let evicted = state.pending.remove(index);
                tracing::warn!(
                    target: "offline::queue",
                    evicted_id = %evicted.id,
                    evicted_priority = %evicted.priority,
                    action_id = %action.id,
                    priority = %action.priority,
                    max_queue_size = self.max_queue_size,
                    "offline queue full; evicted lowest-priority action"
                );
                state.pending.push(action);
            }
            Admission::Reject => {
                tracing::warn!(
                    target: "offline::queue",
                    action_id = %action.id,
                    priority = %action.priority,
                    max_queue_size = self.max_queue_size,
                    "offline queue full; discarded incoming action"
                );
            }
        }
    }

    /// 未送信から取り除く。未送信になければ dead-letter から取り除く。
    pub async fn remove(&self, id: &OfflineActionId) -> bool {
        let removed = {
            let mut state = self.lock_state();
            if let Some(index) = state.position(id) {
                state.pending.remove(index);
                true
            } else if let Some(index) = state.dead_lettered.iter().position(|d| d == id) {
                state.dead_lettered.remove(index);
                true
            } else {
                false
            }
        };

        if removed {
            self.persist().await;
            self.notify();
        }
        removed
    }

    pub async fn clear(&self) {
        {
            let mut state = self.lock_state();
            state.pending.clear();
            state.dead_lettered.clear();
        }
        self.persist().await;
        self.notify();
    }

    pub fn list_pending(&self) -> Vec<QueuedAction> {
        self.lock_state().pending.clone()
    }

    pub fn size(&self) -> usize {
        self.lock_state().pending.len()
    }

    pub fn dead_lettered(&self) -> Vec<OfflineActionId> {
        self.lock_state().dead_lettered.clone()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.lock_state().last_sync
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn view(&self) -> QueueView {
        let state = self.lock_state();
        QueueView {
            pending: state.pending.clone(),
            dead_lettered: state.dead_lettered.clone(),
            last_sync: state.last_sync,
            is_online: self.gate.is_online(),
            is_processing: self.is_processing(),
        }
    }

    pub fn is_online(&self) -> bool {
        self.gate.is_online()
    }

    /// オフライン→オンラインの変化時のみドレインを予約する。予約した場合 `true`。
    pub fn set_online(self: &Arc<Self>, online: bool) -> bool {
        match self.gate.set(online) {
            ConnectivityTransition::Unchanged => false,
            ConnectivityTransition::WentOffline => {
                tracing::info!(target: "offline::queue", "offline queue went offline");
                self.notify();
                false
            }
            ConnectivityTransition::CameOnline => {
                tracing::info!(
                    target: "offline::queue",
                    pending = self.size(),
                    "offline queue back online"
                );
                self.notify();
                self.schedule_drain(DrainTrigger::Reconnect)
            }
        }
    }

    pub fn on_change<L>(&self, listener: L) -> Subscription
    where
        L: QueueListener + 'static,
    {
        self.observers.subscribe(Arc::new(listener))
    }

    pub async fn drain(&self) -> Vec<DrainOutcome> {
        self.drain_with(DrainTrigger::Manual).await
    }

    /// バックグラウンドで起動したドレインの完了を待ち、その結果をまとめて返す。
    /// 待つものがなければ `None`。
    pub async fn wait_for_background_drain(&self) -> Option<Vec<DrainOutcome>> {
        let mut collected: Option<Vec<DrainOutcome>> = None;
        loop {
            let handles = std::mem::take(&mut *self.lock_background());
            if handles.is_empty() {
                return collected;
            }
            let outcomes = collected.get_or_insert_with(Vec::new);
            for handle in handles {
                match handle.await {
                    Ok(results) => outcomes.extend(results),
                    Err(err) => {
                        tracing::warn!(
                            target: "offline::queue",
                            error = %err,
                            "background drain task failed"
                        );
                    }
                }
            }
        }
    }

    fn schedule_drain(self: &Arc<Self>, trigger: DrainTrigger) -> bool {
        if !should_schedule_drain(self.gate.is_online(), self.is_processing(), self.size()) {
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!(
                target: "offline::queue",
                trigger = trigger.as_str(),
                "no async runtime; drain not scheduled"
            );
            return false;
        };

        let queue = Arc::clone(self);
        let task = runtime.spawn(async move { queue.drain_with(trigger).await });

        let mut background = self.lock_background();
        background.retain(|handle| !handle.is_finished());
        background.push(task);
        true
    }

    async fn drain_with(&self, trigger: DrainTrigger) -> Vec<DrainOutcome> {
        if !self.gate.is_online() {
            tracing::debug!(
                target: "offline::queue",
                trigger = trigger.as_str(),
                "offline; drain suppressed"
            );
            return Vec::new();
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(
                target: "offline::queue",
                trigger = trigger.as_str(),
                "drain already in progress"
            );
            return Vec::new();
        }
        let guard = ProcessingGuard(&self.processing);

        let ordered = self.ordered_pending();
        if ordered.is_empty() {
            return Vec::new();
        }

        self.notify();
        let started = Instant::now();
        let total = ordered.len();
        let mut cycle = DrainCycleMetadata {
            trigger: Some(trigger.as_str().to_string()),
            ..DrainCycleMetadata::default()
        };
        let mut outcomes = Vec::with_capacity(total);

        for (index, action) in ordered.iter().enumerate() {
            if !self.gate.is_online() {
                tracing::info!(
                    target: "offline::queue",
                    remaining = total - index,
                    "connectivity lost; leaving remaining actions pending"
                );
                break;
            }
            if !self.is_pending(&action.id) {
                continue;
            }

            let verdict = self.processor.process(action).await;
            outcomes.push(self.apply_verdict(&action.id, verdict, &mut cycle));
        }

        let now = self.clock.now();
        let pending_after = self.stamp_sync(now);
        cycle.pending_after = u32::try_from(pending_after).unwrap_or(u32::MAX);
        cycle.duration_ms = Some(metrics::duration_ms(started.elapsed()));
        cycle.timestamp_ms = u64::try_from(now.timestamp_millis()).ok();
        metrics::record_cycle(&cycle);
        let history = self.absorb_cycle(&cycle);

        self.persist().await;
        self.snapshots.save_drain_history(&history).await;
        drop(guard);

        tracing::info!(
            target: "offline::queue",
            trigger = trigger.as_str(),
            processed = outcomes.len(),
            succeeded = cycle.succeeded,
            failed = cycle.failed,
            conflicted = cycle.conflicted,
            dead_lettered = cycle.dead_lettered,
            pending = pending_after,
            duration_ms = cycle.duration_ms.unwrap_or_default(),
            "offline queue drain finished"
        );
        self.notify();
        outcomes
    }

    fn apply_verdict(
        &self,
        id: &OfflineActionId,
        verdict: RecordVerdict,
        cycle: &mut DrainCycleMetadata,
    ) -> DrainOutcome {
        let mut state = self.lock_state();
        let position = state.position(id);

        match verdict {
            RecordVerdict::Succeeded(body) => {
                if let Some(index) = position {
                    state.pending.remove(index);
                }
                cycle.succeeded += 1;
                DrainOutcome::succeeded(id.clone(), body)
            }
            RecordVerdict::Conflicted => {
                if let Some(index) = position {
                    state.pending.remove(index);
                }
                cycle.conflicted += 1;
                DrainOutcome::conflicted(id.clone())
            }
            RecordVerdict::Failed(error) | RecordVerdict::Deferred(error) => {
                cycle.failed += 1;
                // 送信中に remove された場合は状態に触れない
                let Some(index) = position else {
                    return DrainOutcome::failed(id.clone(), error, false);
                };

                let max_retries = self.processor.backoff().max_retries();
                let (retry_count, exhausted) = {
                    let action = &mut state.pending[index];
                    action.record_failure(self.clock.now());
                    (action.retry_count, action.has_exhausted(max_retries))
                };
                if !exhausted {
                    return DrainOutcome::failed(id.clone(), error, false);
                }

                state.pending.remove(index);
                if !state.dead_lettered.contains(id) {
                    state.dead_lettered.push(id.clone());
                }
                cycle.dead_lettered += 1;
                tracing::error!(
                    target: "offline::queue",
                    action_id = %id,
                    retry_count,
                    max_retries,
                    error = %error,
                    "offline action exhausted retries; moved to dead-letter"
                );
                DrainOutcome::failed(id.clone(), error, true)
            }
        }
    }

    /// ストアに残す累計。プロセスを跨いで引き継がれる。
    pub fn drain_history(&self) -> OfflineDrainMetricsSnapshot {
        self.lock_history().clone()
    }

    fn absorb_cycle(&self, cycle: &DrainCycleMetadata) -> OfflineDrainMetricsSnapshot {
        let mut history = self.lock_history();
        history.absorb(cycle);
        history.clone()
    }

    fn ordered_pending(&self) -> Vec<QueuedAction> {
        drain_order(&self.lock_state().pending)
    }

    fn is_pending(&self, id: &OfflineActionId) -> bool {
        self.lock_state().position(id).is_some()
    }

    fn stamp_sync(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.lock_state();
        state.last_sync = Some(now);
        state.pending.len()
    }

    async fn persist(&self) -> bool {
        // スナップショット取得から保存までを直列化し、古い状態で上書きしない
        let _ordering = self.persist_lock.lock().await;
        let snapshot = self.lock_state().to_snapshot();
        self.snapshots.save(&snapshot).await
    }

    fn notify(&self) {
        if self.observers.is_empty() {
            return;
        }
        let view = self.view();
        self.observers.notify(&view);
    }

    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_history(&self) -> MutexGuard<'_, OfflineDrainMetricsSnapshot> {
        self.drain_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_background(&self) -> MutexGuard<'_, Vec<JoinHandle<Vec<DrainOutcome>>>> {
        self.background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::DispatchResponse;
    use crate::domain::value_objects::offline::{
        ActionTarget, HttpVerb, OfflineActionKind, OfflinePayload,
    };
    use crate::infrastructure::offline::MemoryKeyValueStore;
    use async_trait::async_trait;

    struct AcceptAll;

    #[async_trait]
    impl ActionDispatcher for AcceptAll {
        async fn dispatch(
            &self,
            _target: &ActionTarget,
            _payload: &OfflinePayload,
        ) -> Result<DispatchResponse, AppError> {
            Ok(DispatchResponse::new(200, None))
        }
    }

    fn request(priority: u8) -> EnqueueRequest {
        EnqueueRequest::new(
            OfflineActionKind::Acknowledge,
            ActionTarget::new("/api/alerts/1/ack", HttpVerb::Post).unwrap(),
            OfflinePayload::empty(),
        )
        .with_priority(priority)
    }

    async fn offline_queue(config: OfflineQueueConfig) -> Arc<OfflineActionQueue> {
        OfflineActionQueue::builder(config)
            .store(Arc::new(MemoryKeyValueStore::new()))
            .dispatcher(Arc::new(AcceptAll))
            .online(false)
            .open()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_requires_dispatcher() {
        let result = OfflineActionQueue::builder(OfflineQueueConfig::default())
            .store(Arc::new(MemoryKeyValueStore::new()))
            .open()
            .await;
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn open_rejects_invalid_config() {
        let config = OfflineQueueConfig {
            max_queue_size: 0,
            ..OfflineQueueConfig::default()
        };
        let result = OfflineActionQueue::builder(config)
            .store(Arc::new(MemoryKeyValueStore::new()))
            .dispatcher(Arc::new(AcceptAll))
            .open()
            .await;
        assert!(matches!(result, Err(AppError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn remove_falls_back_to_dead_letter_set() {
        let queue = offline_queue(OfflineQueueConfig::default()).await;
        let dead = OfflineActionId::parse("dead-1").unwrap();
        queue.lock_state().dead_lettered.push(dead.clone());

        assert!(queue.remove(&dead).await);
        assert!(queue.dead_lettered().is_empty());
        assert!(!queue.remove(&dead).await);
    }

    #[tokio::test]
    async fn clear_drops_pending_and_dead_letter() {
        let queue = offline_queue(OfflineQueueConfig::default()).await;
        queue.enqueue(request(3)).await;
        queue
            .lock_state()
            .dead_lettered
            .push(OfflineActionId::parse("dead-1").unwrap());

        queue.clear().await;
        assert_eq!(queue.size(), 0);
        assert!(queue.dead_lettered().is_empty());
    }

    #[tokio::test]
    async fn full_queue_discards_incoming_low_priority() {
        let config = OfflineQueueConfig {
            max_queue_size: 2,
            ..OfflineQueueConfig::default()
        };
        let queue = offline_queue(config).await;
        let first = queue.enqueue(request(4)).await;
        let second = queue.enqueue(request(4)).await;
        let rejected = queue.enqueue(request(4)).await;

        let ids: Vec<OfflineActionId> = queue.list_pending().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(!ids.contains(&rejected));
    }

    #[tokio::test]
    async fn drain_while_offline_is_a_noop() {
        let queue = offline_queue(OfflineQueueConfig::default()).await;
        queue.enqueue(request(3)).await;

        assert!(queue.drain().await.is_empty());
        assert_eq!(queue.size(), 1);
        assert!(queue.last_sync().is_none());
    }

    #[test]
    fn trigger_labels_are_stable() {
        assert_eq!(DrainTrigger::Manual.as_str(), "manual");
        assert_eq!(DrainTrigger::Reconnect.as_str(), "reconnect");
    }
}

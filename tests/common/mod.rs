#![allow(dead_code)]

pub mod mocks;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kukuri_offline_queue::application::ports::{
    ActionDispatcher, Clock, DispatchResponse, EntityVersionSource, KeyValueStore,
};
use kukuri_offline_queue::domain::entities::offline::{DrainOutcome, EnqueueRequest};
use kukuri_offline_queue::domain::value_objects::offline::{
    ActionTarget, EntityId, HttpVerb, OfflineActionKind, OfflinePayload,
};
use kukuri_offline_queue::shared::error::AppError;
use kukuri_offline_queue::{OfflineActionQueue, OfflineQueueConfig};
use serde_json::{Value, json};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub endpoint: String,
    pub verb: HttpVerb,
    pub payload: Value,
    pub at: Instant,
}

/// 送信内容と時刻を記録するディスパッチャ。
///
/// ステータスは `script` の先頭から順に返し、尽きたら `default_status` を返す。
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DispatchCall>>,
    script: Mutex<VecDeque<u16>>,
    default_status: u16,
    latency: Option<Duration>,
}

impl RecordingDispatcher {
    pub fn succeeding() -> Arc<Self> {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_status: status,
            latency: None,
        })
    }

    pub fn scripted(statuses: &[u16], then: u16) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(statuses.iter().copied().collect()),
            default_status: then,
            latency: None,
        })
    }

    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_status: 200,
            latency: Some(latency),
        })
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.endpoint).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn dispatch(
        &self,
        target: &ActionTarget,
        payload: &OfflinePayload,
    ) -> Result<DispatchResponse, AppError> {
        self.calls.lock().unwrap().push(DispatchCall {
            endpoint: target.endpoint().to_string(),
            verb: target.verb(),
            payload: payload.as_json().clone(),
            at: Instant::now(),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let status = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default_status);
        Ok(DispatchResponse::new(
            status,
            Some(json!({"endpoint": target.endpoint()})),
        ))
    }
}

/// エンティティごとに決めたバージョン（またはエラー）を返す。
#[derive(Default)]
pub struct ScriptedVersions {
    versions: Mutex<HashMap<String, Result<u64, String>>>,
}

impl ScriptedVersions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, entity_id: &str, version: u64) {
        self.versions
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), Ok(version));
    }

    pub fn fail(&self, entity_id: &str, message: &str) {
        self.versions
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), Err(message.to_string()));
    }
}

#[async_trait]
impl EntityVersionSource for ScriptedVersions {
    async fn current_version(&self, entity_id: &EntityId) -> Result<u64, AppError> {
        match self.versions.lock().unwrap().get(entity_id.as_str()) {
            Some(Ok(version)) => Ok(*version),
            Some(Err(message)) => Err(AppError::Network(message.clone())),
            None => Err(AppError::NotFound(entity_id.to_string())),
        }
    }
}

/// 読み込みは空、書き込みは常に失敗するストア。
#[derive(Default)]
pub struct UnwritableStore {
    writes: AtomicUsize,
}

impl UnwritableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for UnwritableStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Storage("read-only volume".into()))
    }

    async fn delete(&self, _key: &str) -> Result<bool, AppError> {
        Err(AppError::Storage("read-only volume".into()))
    }
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(timestamp_secs: i64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.timestamp_opt(timestamp_secs, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn test_config() -> OfflineQueueConfig {
    OfflineQueueConfig {
        base_backoff_ms: 100,
        max_retries: 3,
        max_queue_size: 100,
        dispatch_timeout_secs: 5,
        ..OfflineQueueConfig::default()
    }
}

pub fn request(endpoint: &str, priority: u8) -> EnqueueRequest {
    EnqueueRequest::new(
        OfflineActionKind::UpdateFields,
        ActionTarget::new(endpoint, HttpVerb::Post).unwrap(),
        OfflinePayload::new(json!({"endpoint": endpoint})).unwrap(),
    )
    .with_priority(priority)
}

pub fn guarded_request(endpoint: &str, entity_id: &str, version: u64, skip: bool) -> EnqueueRequest {
    request(endpoint, 5)
        .with_entity(EntityId::new(entity_id.to_string()).unwrap(), version)
        .skip_on_conflict(skip)
}

pub async fn open_queue(
    config: OfflineQueueConfig,
    store: Arc<dyn KeyValueStore>,
    dispatcher: Arc<dyn ActionDispatcher>,
    online: bool,
) -> Arc<OfflineActionQueue> {
    OfflineActionQueue::builder(config)
        .store(store)
        .dispatcher(dispatcher)
        .online(online)
        .open()
        .await
        .expect("open offline queue")
}

/// オンラインに切り替え、起動したドレインの結果を待つ。
pub async fn go_online_and_wait(queue: &Arc<OfflineActionQueue>) -> Vec<DrainOutcome> {
    assert!(queue.set_online(true), "reconnect should schedule a drain");
    queue
        .wait_for_background_drain()
        .await
        .expect("background drain handle")
}

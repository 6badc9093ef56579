use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// ドレインの累計。プロセス内の集計と、ストアに残す履歴の両方に使う。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OfflineDrainMetricsSnapshot {
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_conflicted: u64,
    pub total_dead_lettered: u64,
    pub cycles: u64,
    pub last_cycle_ms: Option<u64>,
    pub last_trigger: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub last_processed: Option<u32>,
    pub last_pending_after: Option<u32>,
}

impl OfflineDrainMetricsSnapshot {
    /// 1サイクル分を累計に加える。
    pub fn absorb(&mut self, meta: &DrainCycleMetadata) {
        self.total_succeeded += u64::from(meta.succeeded);
        self.total_failed += u64::from(meta.failed);
        self.total_conflicted += u64::from(meta.conflicted);
        self.total_dead_lettered += u64::from(meta.dead_lettered);
        self.cycles += 1;
        self.last_cycle_ms = Some(meta.timestamp_ms.unwrap_or_else(current_unix_ms));
        self.last_trigger = meta.trigger.clone();
        self.last_duration_ms = meta.duration_ms;
        self.last_processed = Some(meta.processed());
        self.last_pending_after = Some(meta.pending_after);
    }
}

/// 1回のドレインサイクルの集計。
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DrainCycleMetadata {
    pub trigger: Option<String>,
    pub succeeded: u32,
    pub failed: u32,
    pub conflicted: u32,
    pub dead_lettered: u32,
    pub pending_after: u32,
    pub duration_ms: Option<u64>,
    pub timestamp_ms: Option<u64>,
}

impl DrainCycleMetadata {
    pub fn processed(&self) -> u32 {
        self.succeeded + self.failed + self.conflicted
    }
}

#[derive(Default, Clone)]
struct LastCycleMetadata {
    trigger: Option<String>,
    duration_ms: Option<u64>,
    processed: Option<u32>,
    pending_after: Option<u32>,
}

struct OfflineDrainMetrics {
    succeeded: AtomicU64,
    failed: AtomicU64,
    conflicted: AtomicU64,
    dead_lettered: AtomicU64,
    cycles: AtomicU64,
    last_cycle_ms: AtomicU64,
    metadata: Mutex<LastCycleMetadata>,
}

impl OfflineDrainMetrics {
    fn new() -> Self {
        Self {
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            conflicted: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
            last_cycle_ms: AtomicU64::new(0),
            metadata: Mutex::new(LastCycleMetadata::default()),
        }
    }

    fn record(&self, meta: &DrainCycleMetadata) {
        self.succeeded
            .fetch_add(u64::from(meta.succeeded), Ordering::Relaxed);
        self.failed.fetch_add(u64::from(meta.failed), Ordering::Relaxed);
        self.conflicted
            .fetch_add(u64::from(meta.conflicted), Ordering::Relaxed);
        self.dead_lettered
            .fetch_add(u64::from(meta.dead_lettered), Ordering::Relaxed);
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_ms.store(
            meta.timestamp_ms.unwrap_or_else(current_unix_ms),
            Ordering::Relaxed,
        );

        if let Ok(mut guard) = self.metadata.lock() {
            guard.trigger = meta.trigger.clone();
            guard.duration_ms = meta.duration_ms;
            guard.processed = Some(meta.processed());
            guard.pending_after = Some(meta.pending_after);
        }
    }

    fn snapshot(&self) -> OfflineDrainMetricsSnapshot {
        let metadata = self
            .metadata
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|_| LastCycleMetadata::default());

        OfflineDrainMetricsSnapshot {
            total_succeeded: self.succeeded.load(Ordering::Relaxed),
            total_failed: self.failed.load(Ordering::Relaxed),
            total_conflicted: self.conflicted.load(Ordering::Relaxed),
            total_dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            last_cycle_ms: to_option(self.last_cycle_ms.load(Ordering::Relaxed)),
            last_trigger: metadata.trigger,
            last_duration_ms: metadata.duration_ms,
            last_processed: metadata.processed,
            last_pending_after: metadata.pending_after,
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

/// ミリ秒に変換する。u64 に収まらない場合は飽和させる。
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or(0)
}

static OFFLINE_DRAIN_METRICS: LazyLock<OfflineDrainMetrics> =
    LazyLock::new(OfflineDrainMetrics::new);

pub fn record_cycle(metadata: &DrainCycleMetadata) -> OfflineDrainMetricsSnapshot {
    OFFLINE_DRAIN_METRICS.record(metadata);
    OFFLINE_DRAIN_METRICS.snapshot()
}

pub fn snapshot() -> OfflineDrainMetricsSnapshot {
    OFFLINE_DRAIN_METRICS.snapshot()
}

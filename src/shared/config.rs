use crate::domain::value_objects::offline::ConflictPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "offline_action_queue";
pub const ENTITY_ID_PLACEHOLDER: &str = "{entity_id}";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineQueueConfig {
    pub storage_key: String,
    pub max_queue_size: usize,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub dispatch_timeout_secs: u64,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    pub remote_base_url: String,
    pub version_path: String,
    pub database_url: String,
}

impl Default for OfflineQueueConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            max_queue_size: 100,
            max_retries: 3,
            base_backoff_ms: 1_000,
            dispatch_timeout_secs: 30,
            conflict_policy: ConflictPolicy::FailOpen,
            remote_base_url: "http://localhost:8080".to_string(),
            version_path: format!("/api/entities/{ENTITY_ID_PLACEHOLDER}/version"),
            database_url: default_database_url(),
        }
    }
}

impl OfflineQueueConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる（`from_env` とテストで共用）。
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("KUKURI_OFFLINE_STORAGE_KEY")
            && !v.trim().is_empty()
        {
            cfg.storage_key = v.trim().to_string();
        }
        if let Some(value) = lookup("KUKURI_OFFLINE_MAX_QUEUE_SIZE").and_then(|v| parse_usize(&v)) {
            cfg.max_queue_size = value;
        }
        if let Some(value) = lookup("KUKURI_OFFLINE_MAX_RETRIES").and_then(|v| parse_u32(&v)) {
            cfg.max_retries = value;
        }
        if let Some(value) = lookup("KUKURI_OFFLINE_BASE_BACKOFF_MS").and_then(|v| parse_u64(&v)) {
            cfg.base_backoff_ms = value;
        }
        if let Some(value) =
            lookup("KUKURI_OFFLINE_DISPATCH_TIMEOUT_SECS").and_then(|v| parse_u64(&v))
        {
            cfg.dispatch_timeout_secs = value;
        }
        if let Some(v) = lookup("KUKURI_OFFLINE_CONFLICT_POLICY") {
            cfg.conflict_policy = ConflictPolicy::parse(&v).unwrap_or(cfg.conflict_policy);
        }
        if let Some(v) = lookup("KUKURI_OFFLINE_REMOTE_BASE_URL")
            && !v.trim().is_empty()
        {
            cfg.remote_base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("KUKURI_OFFLINE_VERSION_PATH")
            && !v.trim().is_empty()
        {
            cfg.version_path = v.trim().to_string();
        }
        if let Some(v) = lookup("KUKURI_OFFLINE_DATABASE_URL")
            && !v.trim().is_empty()
        {
            cfg.database_url = v.trim().to_string();
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage_key.trim().is_empty() {
            return Err("Offline queue storage_key cannot be empty".to_string());
        }
        if self.max_queue_size == 0 {
            return Err("Offline queue max_queue_size must be greater than 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("Offline queue max_retries must be greater than 0".to_string());
        }
        if self.dispatch_timeout_secs == 0 {
            return Err("Offline queue dispatch_timeout_secs must be greater than 0".to_string());
        }
        if !self.version_path.contains(ENTITY_ID_PLACEHOLDER) {
            return Err(format!(
                "Offline queue version_path must contain {ENTITY_ID_PLACEHOLDER}"
            ));
        }
        Ok(())
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

fn default_database_url() -> String {
    // データディレクトリが解決できない環境ではカレントディレクトリに置く
    let base = dirs::data_dir().unwrap_or_else(|| std::path::PathBuf::from("./data"));
    let path = base.join("kukuri").join("offline_queue.db");
    format!("sqlite:{}?mode=rwc", path.display())
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

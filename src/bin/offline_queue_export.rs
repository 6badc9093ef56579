use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use kukuri_offline_queue::infrastructure::offline::metrics::OfflineDrainMetricsSnapshot;
use kukuri_offline_queue::{OfflineQueueConfig, QueueSnapshot, SnapshotStore, SqliteKeyValueStore};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
struct CliOptions {
    output: Option<PathBuf>,
    pretty: bool,
    database_url: Option<String>,
    storage_key: Option<String>,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct QueueExportReport {
    generated_at_ms: i64,
    pending_count: usize,
    dead_letter_count: usize,
    last_sync: Option<DateTime<Utc>>,
    snapshot: QueueSnapshot,
    metrics: OfflineDrainMetricsSnapshot,
}

fn usage() -> &'static str {
    "Usage: offline_queue_export [--database-url <url>] [--storage-key <key>] [--output <path>] [--pretty]"
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kukuri_offline_queue=debug,info"));
    // stdout はレポート出力に使うためログは stderr へ
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn write_output(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

fn emit_payload(target: Option<&Path>, payload: &str) -> Result<()> {
    if let Some(path) = target {
        write_output(path, payload)?;
        println!("Offline queue written to {}", path.display());
    } else {
        println!("{payload}");
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(args)?;
    let config = OfflineQueueConfig::from_env();

    let database_url = options
        .database_url
        .clone()
        .unwrap_or_else(|| config.database_url.clone());
    let storage_key = options
        .storage_key
        .clone()
        .unwrap_or_else(|| config.storage_key.clone());

    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    let (snapshot, history) = rt.block_on(async {
        load_state(&database_url, &storage_key)
            .await
            .with_context(|| format!("Failed to load offline queue from {database_url}"))
    })?;

    let report = build_report(snapshot, history);
    let payload = to_json(&report, options.pretty)?;
    emit_payload(options.output.as_deref(), &payload)
}

/// 保存済みのキューとドレイン累計を読み込む。
async fn load_state(
    database_url: &str,
    storage_key: &str,
) -> Result<(QueueSnapshot, OfflineDrainMetricsSnapshot)> {
    let store = SqliteKeyValueStore::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database at {database_url}"))?;
    let snapshots = SnapshotStore::new(Arc::new(store), storage_key);
    Ok((snapshots.load().await, snapshots.load_drain_history().await))
}

fn build_report(
    snapshot: QueueSnapshot,
    metrics: OfflineDrainMetricsSnapshot,
) -> QueueExportReport {
    QueueExportReport {
        generated_at_ms: Utc::now().timestamp_millis(),
        pending_count: snapshot.actions.len(),
        dead_letter_count: snapshot.failed_actions.len(),
        last_sync: snapshot.last_sync,
        snapshot,
        metrics,
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--output requires a path\n{}", usage()))?;
                options.output = Some(PathBuf::from(path));
            }
            "--pretty" => {
                options.pretty = true;
            }
            "--database-url" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--database-url requires a value\n{}", usage())
                })?;
                options.database_url = Some(value);
            }
            "--storage-key" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--storage-key requires a value\n{}", usage())
                })?;
                if value.trim().is_empty() {
                    bail!("--storage-key cannot be empty");
                }
                options.storage_key = Some(value);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => {
                bail!("Unknown argument: {other}\n{}", usage());
            }
        }
    }

    Ok(options)
}

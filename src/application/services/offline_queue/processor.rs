use super::backoff::BackoffPolicy;
use super::conflict::{ConflictCheck, ConflictDetector};
use crate::application::ports::ActionDispatcher;
use crate::domain::entities::offline::QueuedAction;
use crate::domain::value_objects::offline::ConflictPolicy;
use crate::infrastructure::offline::metrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Remote returned status {status}")]
    Status { status: u16, body: Option<Value> },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Dispatch timed out after {0:?}")]
    Timeout(Duration),
}

/// 1件を処理した結果。キューへの反映は呼び出し側が行う。
#[derive(Debug, Clone, PartialEq)]
pub enum RecordVerdict {
    Succeeded(Option<Value>),
    /// 競合を検出し、`skip_on_conflict` により破棄する。
    Conflicted,
    Failed(String),
    /// 競合確認ができず送信を見送った（FailClosed のみ）。失敗試行として数える。
    Deferred(String),
}

impl RecordVerdict {
    pub fn is_failure(&self) -> bool {
        matches!(self, RecordVerdict::Failed(_) | RecordVerdict::Deferred(_))
    }
}

/// ドレイン時の処理順。優先度の降順で、同順位は配列順を保つ。
pub fn drain_order(pending: &[QueuedAction]) -> Vec<QueuedAction> {
    let mut ordered = pending.to_vec();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
    ordered
}

pub struct QueueProcessor {
    dispatcher: Arc<dyn ActionDispatcher>,
    conflicts: Option<ConflictDetector>,
    backoff: BackoffPolicy,
    dispatch_timeout: Duration,
}

impl QueueProcessor {
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        conflicts: Option<ConflictDetector>,
        backoff: BackoffPolicy,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            dispatcher,
            conflicts,
            backoff,
            dispatch_timeout,
        }
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    pub async fn process(&self, action: &QueuedAction) -> RecordVerdict {
        if let Some(verdict) = self.check_conflict(action).await {
            return verdict;
        }

        if action.retry_count > 0 {
            let delay = self.backoff.delay_for(action.retry_count);
            tracing::debug!(
                target: "offline::queue",
                action_id = %action.id,
                retry_count = action.retry_count,
                delay_ms = metrics::duration_ms(delay),
                "waiting before retry"
            );
            tokio::time::sleep(delay).await;
        }

        match self.dispatch(action).await {
            Ok(body) => RecordVerdict::Succeeded(body),
            Err(err) => {
                tracing::warn!(
                    target: "offline::queue",
                    action_id = %action.id,
                    target_endpoint = %action.target,
                    retry_count = action.retry_count,
                    error = %err,
                    "offline action dispatch failed"
                );
                RecordVerdict::Failed(err.to_string())
            }
        }
    }

    /// 送信を止める判定になった場合のみ `Some` を返す。
    async fn check_conflict(&self, action: &QueuedAction) -> Option<RecordVerdict> {
        let detector = self.conflicts.as_ref()?;
        let (entity_id, local_version) = action.version_guard()?;

        match detector.check(entity_id, local_version).await {
            ConflictCheck::Clear => None,
            ConflictCheck::Conflict {
                local_version,
                remote_version,
            } => {
                if action.skip_on_conflict {
                    tracing::info!(
                        target: "offline::queue",
                        action_id = %action.id,
                        entity_id = %entity_id,
                        local_version,
                        remote_version,
                        "conflict detected; skipping offline action"
                    );
                    Some(RecordVerdict::Conflicted)
                } else {
                    tracing::info!(
                        target: "offline::queue",
                        action_id = %action.id,
                        entity_id = %entity_id,
                        local_version,
                        remote_version,
                        "conflict detected; applying offline action anyway"
                    );
                    None
                }
            }
            ConflictCheck::Unavailable(reason) => match detector.policy() {
                ConflictPolicy::FailOpen => None,
                ConflictPolicy::FailClosed => Some(RecordVerdict::Deferred(format!(
                    "conflict check unavailable: {reason}"
                ))),
            },
        }
    }

    async fn dispatch(&self, action: &QueuedAction) -> Result<Option<Value>, DispatchError> {
        let call = self.dispatcher.dispatch(&action.target, &action.payload);
        match tokio::time::timeout(self.dispatch_timeout, call).await {
            Err(_) => Err(DispatchError::Timeout(self.dispatch_timeout)),
            Ok(Err(err)) => Err(DispatchError::Transport(err.to_string())),
            Ok(Ok(response)) if response.is_success() => Ok(response.body),
            Ok(Ok(response)) => Err(DispatchError::Status {
                status: response.status,
                body: response.body,
            }),
        }
    }
}

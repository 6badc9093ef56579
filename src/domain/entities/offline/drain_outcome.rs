use crate::domain::value_objects::offline::OfflineActionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ドレインサイクル中に処理した1件分の結果。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DrainOutcome {
    pub action_id: OfflineActionId,
    pub success: bool,
    #[serde(default)]
    pub skipped_due_to_conflict: bool,
    #[serde(default)]
    pub dead_lettered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl DrainOutcome {
    pub fn succeeded(action_id: OfflineActionId, response: Option<Value>) -> Self {
        Self {
            action_id,
            success: true,
            skipped_due_to_conflict: false,
            dead_lettered: false,
            error: None,
            response,
        }
    }

    pub fn conflicted(action_id: OfflineActionId) -> Self {
        Self {
            action_id,
            success: false,
            skipped_due_to_conflict: true,
            dead_lettered: false,
            error: None,
            response: None,
        }
    }

    pub fn failed(action_id: OfflineActionId, error: String, dead_lettered: bool) -> Self {
        Self {
            action_id,
            success: false,
            skipped_due_to_conflict: false,
            dead_lettered,
            error: Some(error),
            response: None,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// オフラインアクションの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineActionKind {
    MarkComplete,
    UpdateFields,
    Acknowledge,
    Create,
    Delete,
}

impl OfflineActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfflineActionKind::MarkComplete => "mark_complete",
            OfflineActionKind::UpdateFields => "update_fields",
            OfflineActionKind::Acknowledge => "acknowledge",
            OfflineActionKind::Create => "create",
            OfflineActionKind::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim() {
            "mark_complete" => Ok(OfflineActionKind::MarkComplete),
            "update_fields" => Ok(OfflineActionKind::UpdateFields),
            "acknowledge" => Ok(OfflineActionKind::Acknowledge),
            "create" => Ok(OfflineActionKind::Create),
            "delete" => Ok(OfflineActionKind::Delete),
            other => Err(format!("Unknown offline action kind: {other}")),
        }
    }
}

impl fmt::Display for OfflineActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

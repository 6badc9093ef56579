use serde::{Deserialize, Serialize};

/// バージョン問い合わせ先に到達できないときの扱い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// 競合なしとみなして送信を続ける。
    #[default]
    FailOpen,
    /// 送信を見送り、失敗試行として再試行に回す。
    FailClosed,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::FailOpen => "fail_open",
            ConflictPolicy::FailClosed => "fail_closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Some(ConflictPolicy::FailOpen),
            "fail_closed" | "closed" => Some(ConflictPolicy::FailClosed),
            _ => None,
        }
    }
}

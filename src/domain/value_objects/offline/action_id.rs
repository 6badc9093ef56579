use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// キュー内でアクションを一意に識別するID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfflineActionId(String);

impl OfflineActionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        Self::validate(value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Offline action ID cannot be empty".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for OfflineActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OfflineActionId> for String {
    fn from(id: OfflineActionId) -> Self {
        id.0
    }
}

impl FromStr for OfflineActionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_distinct() {
        let a = OfflineActionId::generate();
        let b = OfflineActionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn blank_id_is_rejected() {
        assert!(OfflineActionId::parse("  ").is_err());
        assert_eq!(OfflineActionId::parse("a-1").unwrap().as_str(), "a-1");
    }
}

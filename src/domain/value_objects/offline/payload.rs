use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// リモート呼び出しにそのまま転送される key→value のペイロード。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Value", into = "Value")]
pub struct OfflinePayload(Value);

impl OfflinePayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Offline action payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl TryFrom<Value> for OfflinePayload {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OfflinePayload> for Value {
    fn from(payload: OfflinePayload) -> Self {
        payload.0
    }
}

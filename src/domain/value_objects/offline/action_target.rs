use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "PATCH" => Ok(HttpVerb::Patch),
            "DELETE" => Ok(HttpVerb::Delete),
            other => Err(format!("Unsupported HTTP verb: {other}")),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// アクションの最終的な送信先（エンドポイントパスとHTTPメソッド）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionTarget {
    endpoint: String,
    verb: HttpVerb,
}

impl ActionTarget {
    pub fn new(endpoint: impl Into<String>, verb: HttpVerb) -> Result<Self, String> {
        let endpoint = endpoint.into();
        Self::validate(&endpoint)?;
        Ok(Self { endpoint, verb })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    fn validate(endpoint: &str) -> Result<(), String> {
        if endpoint.trim().is_empty() {
            return Err("Action endpoint cannot be empty".to_string());
        }
        if !endpoint.starts_with('/') {
            return Err(format!("Action endpoint must start with '/': {endpoint}"));
        }
        if endpoint.chars().any(char::is_whitespace) {
            return Err(format!("Action endpoint cannot contain whitespace: {endpoint}"));
        }
        Ok(())
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.endpoint)
    }
}

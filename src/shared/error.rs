use std::fmt;

/// ポートが返す共通エラー。
#[derive(Debug)]
pub enum AppError {
    Database(String),
    Network(String),
    Storage(String),
    NotFound(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    Timeout(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else if err.is_decode() {
            AppError::DeserializationError(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl AppError {
    /// 接続状態やリモート側の一時的な問題によるもの。
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_timeout_errors_are_transient() {
        assert!(AppError::Network("reset".into()).is_transient());
        assert!(AppError::Timeout("slow".into()).is_transient());
        assert!(!AppError::Storage("disk full".into()).is_transient());
    }
}

use crate::shared::error::AppError;
use async_trait::async_trait;

/// 文字列キーで値を読み書きする永続ストア。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn delete(&self, key: &str) -> Result<bool, AppError>;
}

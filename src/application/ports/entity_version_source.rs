use crate::domain::value_objects::offline::EntityId;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// エンティティの正となるバージョンを返すリモート問い合わせ先。
#[async_trait]
pub trait EntityVersionSource: Send + Sync {
    async fn current_version(&self, entity_id: &EntityId) -> Result<u64, AppError>;
}

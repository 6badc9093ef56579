use async_trait::async_trait;
use mockall::mock;

use kukuri_offline_queue::application::ports::{
    ActionDispatcher, DispatchResponse, EntityVersionSource,
};
use kukuri_offline_queue::domain::value_objects::offline::{
    ActionTarget, EntityId, OfflinePayload,
};
use kukuri_offline_queue::shared::error::AppError;

mock! {
    pub DispatcherPort {}

    #[async_trait]
    impl ActionDispatcher for DispatcherPort {
        async fn dispatch(
            &self,
            target: &ActionTarget,
            payload: &OfflinePayload,
        ) -> Result<DispatchResponse, AppError>;
    }
}

mock! {
    pub VersionSourcePort {}

    #[async_trait]
    impl EntityVersionSource for VersionSourcePort {
        async fn current_version(&self, entity_id: &EntityId) -> Result<u64, AppError>;
    }
}

pub type MockActionDispatcher = MockDispatcherPort;
pub type MockEntityVersionSource = MockVersionSourcePort;

use crate::domain::value_objects::offline::{ActionTarget, OfflinePayload};
use crate::shared::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl DispatchResponse {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// キューに積まれたアクションをリモートへ送る。
///
/// `Err` は到達不能などのトランスポート障害を表す。HTTP ステータスで表現できる失敗は
/// `Ok(DispatchResponse)` として返し、成否の判定は呼び出し側が行う。
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        target: &ActionTarget,
        payload: &OfflinePayload,
    ) -> Result<DispatchResponse, AppError>;
}

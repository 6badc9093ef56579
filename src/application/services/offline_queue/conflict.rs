use crate::application::ports::EntityVersionSource;
use crate::domain::value_objects::offline::{ConflictPolicy, EntityId};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictCheck {
    Clear,
    Conflict { local_version: u64, remote_version: u64 },
    /// 問い合わせ先に到達できなかった。扱いは [`ConflictPolicy`] で決まる。
    Unavailable(String),
}

impl ConflictCheck {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConflictCheck::Conflict { .. })
    }
}

pub struct ConflictDetector {
    source: Arc<dyn EntityVersionSource>,
    policy: ConflictPolicy,
}

impl ConflictDetector {
    pub fn new(source: Arc<dyn EntityVersionSource>, policy: ConflictPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub async fn check(&self, entity_id: &EntityId, local_version: u64) -> ConflictCheck {
        match self.source.current_version(entity_id).await {
            Ok(remote_version) if remote_version > local_version => ConflictCheck::Conflict {
                local_version,
                remote_version,
            },
            Ok(_) => ConflictCheck::Clear,
            Err(err) => {
                tracing::debug!(
                    target: "offline::queue",
                    entity_id = %entity_id,
                    policy = self.policy.as_str(),
                    transient = err.is_transient(),
                    error = %err,
                    "entity version lookup failed"
                );
                ConflictCheck::Unavailable(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::AppError;
    use async_trait::async_trait;

    struct FixedVersion(Result<u64, &'static str>);

    #[async_trait]
    impl EntityVersionSource for FixedVersion {
        async fn current_version(&self, _entity_id: &EntityId) -> Result<u64, AppError> {
            self.0.map_err(|msg| AppError::Network(msg.to_string()))
        }
    }

    fn detector(result: Result<u64, &'static str>) -> ConflictDetector {
        ConflictDetector::new(Arc::new(FixedVersion(result)), ConflictPolicy::FailOpen)
    }

    fn entity() -> EntityId {
        EntityId::new("task-1".into()).unwrap()
    }

    #[tokio::test]
    async fn newer_remote_version_is_a_conflict() {
        let check = detector(Ok(5)).check(&entity(), 3).await;
        assert_eq!(
            check,
            ConflictCheck::Conflict {
                local_version: 3,
                remote_version: 5
            }
        );
    }

    #[tokio::test]
    async fn equal_or_older_remote_version_is_clear() {
        assert_eq!(detector(Ok(3)).check(&entity(), 3).await, ConflictCheck::Clear);
        assert_eq!(detector(Ok(1)).check(&entity(), 3).await, ConflictCheck::Clear);
    }

    #[tokio::test]
    async fn lookup_failure_is_reported_as_unavailable() {
        let check = detector(Err("unreachable")).check(&entity(), 3).await;
        assert!(matches!(check, ConflictCheck::Unavailable(_)));
        assert!(!check.is_conflict());
    }
}

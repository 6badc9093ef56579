pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::ports::{
    ActionDispatcher, Clock, DispatchResponse, EntityVersionSource, KeyValueStore,
};
pub use application::services::offline_queue::{
    DrainTrigger, OfflineActionQueue, OfflineActionQueueBuilder, QueueListener, SnapshotStore,
    Subscription,
};
pub use domain::entities::offline::{
    DrainOutcome, EnqueueOptions, EnqueueRequest, QueueSnapshot, QueueView, QueuedAction,
};
pub use domain::value_objects::offline::{
    ActionPriority, ActionTarget, ConflictPolicy, EntityId, HttpVerb, OfflineActionId,
    OfflineActionKind, OfflinePayload,
};
pub use infrastructure::offline::{
    HttpActionDispatcher, HttpEntityVersionSource, MemoryKeyValueStore, SqliteKeyValueStore,
    SystemClock,
};
pub use shared::{AppError, OfflineQueueConfig};

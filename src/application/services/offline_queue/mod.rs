pub mod backoff;
pub mod conflict;
pub mod connectivity;
pub mod eviction;
pub mod observers;
pub mod processor;
mod queue;
pub mod snapshot_store;

pub use backoff::BackoffPolicy;
pub use conflict::{ConflictCheck, ConflictDetector};
pub use connectivity::{ConnectivityGate, ConnectivityTransition, should_schedule_drain};
pub use observers::{ObserverRegistry, QueueListener, Subscription};
pub use processor::{DispatchError, QueueProcessor, RecordVerdict};
pub use queue::{DrainTrigger, OfflineActionQueue, OfflineActionQueueBuilder};
pub use snapshot_store::SnapshotStore;

pub mod offline_queue;

pub use offline_queue::{OfflineActionQueue, OfflineActionQueueBuilder, SnapshotStore};

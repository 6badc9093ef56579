pub mod drain_outcome;
pub mod queue_snapshot;
pub mod queue_view;
pub mod queued_action;

pub use drain_outcome::DrainOutcome;
pub use queue_snapshot::QueueSnapshot;
pub use queue_view::QueueView;
pub use queued_action::{EnqueueOptions, EnqueueRequest, QueuedAction};

pub mod offline;

pub use offline::{
    DrainOutcome, EnqueueOptions, EnqueueRequest, QueueSnapshot, QueueView, QueuedAction,
};

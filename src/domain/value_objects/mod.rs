pub mod offline;

pub use offline::{
    ActionPriority, ActionTarget, ConflictPolicy, EntityId, HttpVerb, OfflineActionId,
    OfflineActionKind, OfflinePayload,
};

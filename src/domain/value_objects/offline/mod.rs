pub mod action_id;
pub mod action_kind;
pub mod action_target;
pub mod conflict_policy;
pub mod entity_id;
pub mod payload;
pub mod priority;

pub use action_id::OfflineActionId;
pub use action_kind::OfflineActionKind;
pub use action_target::{ActionTarget, HttpVerb};
pub use conflict_policy::ConflictPolicy;
pub use entity_id::EntityId;
pub use payload::OfflinePayload;
pub use priority::ActionPriority;

pub mod action_dispatcher;
pub mod clock;
pub mod entity_version_source;
pub mod key_value_store;

pub use action_dispatcher::{ActionDispatcher, DispatchResponse};
pub use clock::Clock;
pub use entity_version_source::EntityVersionSource;
pub use key_value_store::KeyValueStore;

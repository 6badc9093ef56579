pub mod http_dispatcher;
pub mod http_version_source;
pub mod memory_store;
pub mod metrics;
pub mod sqlite_store;
pub mod system_clock;

pub use http_dispatcher::HttpActionDispatcher;
pub use http_version_source::HttpEntityVersionSource;
pub use memory_store::MemoryKeyValueStore;
pub use sqlite_store::SqliteKeyValueStore;
pub use system_clock::SystemClock;

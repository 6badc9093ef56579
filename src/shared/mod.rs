pub mod config;
pub mod error;

pub use config::OfflineQueueConfig;
pub use error::AppError;

pub mod config;
pub mod error;
pub mod models;

pub use config::{ChunkingConfig, LecternConfig, RetrievalConfig};
pub use error::ConfigError;
pub use models::*;

//! Configuration module
//!
//! Handles user settings for target selection, pointer motion and the
//! trajectory corpus.

pub mod settings;

pub use settings::{CorpusSettings, MovementSettings, SelectionSettings, Settings};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

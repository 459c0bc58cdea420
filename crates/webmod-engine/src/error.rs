//! Engine errors

use std::path::PathBuf;

use webmod_rules::RuleError;

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cannot read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No web module is active")]
    NoActiveModule,
}

pub type Result<T> = std::result::Result<T, EngineError>;

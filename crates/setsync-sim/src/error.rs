//! Simulator errors.

use setsync_peripheral::ConfigError;
use setsync_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or running a scenario.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid drop rate {0}, expected 0.0..=1.0")]
    InvalidDropRate(f64),

    #[error("step {step}: {component} is not published")]
    NotPublished { step: usize, component: String },

    #[error("step {step}: expectation failed: {message}")]
    Expectation { step: usize, message: String },
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;

//! Configuration errors.

use setsync_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading a [`DeviceConfig`](crate::DeviceConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid YAML for a device config.
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configured value is not acceptable.
    #[error("invalid config value: {0}")]
    Invalid(#[from] ProtocolError),
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

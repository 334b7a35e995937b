//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading the service settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Errors raised by [`crate::JobDefinitionStore`].
///
/// Everything except `AlreadyLoaded` means the definitions could not be read
/// and the service cannot start.
#[derive(Debug, Error)]
pub enum DefinitionsError {
    #[error("Job definitions file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read job definitions from {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed job definitions in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job definitions have already been loaded")]
    AlreadyLoaded,
}

impl DefinitionsError {
    /// Whether the error prevents the service from starting.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DefinitionsError::AlreadyLoaded)
    }
}

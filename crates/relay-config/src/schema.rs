//! Service settings schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.job_definitions.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.job_definitions".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.transfer.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.connect_timeout_secs".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        if self.transfer.disconnect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transfer.disconnect_timeout_secs".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        if self.logging.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                field: "logging.max_files".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Path of the job definitions document.
    #[serde(default = "default_job_definitions")]
    pub job_definitions: PathBuf,

    /// Optional PID file guarding against a second instance.
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            job_definitions: default_job_definitions(),
            pid_file: None,
        }
    }
}

fn default_job_definitions() -> PathBuf {
    PathBuf::from("config").join("job_definitions.json")
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fire every job once as soon as the scheduler starts.
    #[serde(default = "default_fire_on_start")]
    pub fire_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fire_on_start: default_fire_on_start(),
        }
    }
}

fn default_fire_on_start() -> bool {
    true
}

/// Settings shared by the FTP and SFTP transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_disconnect_timeout")]
    pub disconnect_timeout_secs: u64,

    /// Leave SFTP sessions open instead of disconnecting them.
    ///
    /// Only meant for servers whose disconnect handshake never completes.
    #[serde(default)]
    pub abandon_sftp_sessions: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            disconnect_timeout_secs: default_disconnect_timeout(),
            abandon_sftp_sessions: false,
        }
    }
}

impl TransferConfig {
    /// Get the connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get the disconnect timeout as a Duration.
    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.disconnect_timeout_secs)
    }
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_disconnect_timeout() -> u64 {
    10
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Number of daily log files to keep.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Write the file layer as JSON lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_file_prefix(),
            max_files: default_max_files(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "report-relay".to_string()
}

fn default_max_files() -> usize {
    30
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

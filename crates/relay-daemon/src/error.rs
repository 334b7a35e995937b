//! Daemon and startup errors.

use std::path::PathBuf;

use relay_config::DefinitionsError;
use relay_scheduler::ScheduleError;
use thiserror::Error;

/// Process hosting errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Another live process holds the PID file.
    #[error("report-relay already running (PID file: {path}, PID: {pid})")]
    AlreadyRunning { path: PathBuf, pid: u32 },

    #[error("Failed to create PID file at {path}: {reason}")]
    PidFileCreation { path: PathBuf, reason: String },

    #[error("Failed to read PID file at {path}: {reason}")]
    PidFileRead { path: PathBuf, reason: String },

    #[error("Failed to remove PID file at {path}: {reason}")]
    PidFileRemoval { path: PathBuf, reason: String },

    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),
}

/// Errors of the startup sequence.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Cannot load job definitions: {0}")]
    DefinitionsLoad(#[from] DefinitionsError),

    #[error("No jobs scheduled ({failed} of {defined} definitions failed to register)")]
    NoJobsScheduled { defined: usize, failed: usize },
}

impl StartupError {
    /// Whether the host must stop. Loading definitions twice is not fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            StartupError::DefinitionsLoad(e) => e.is_fatal(),
            StartupError::NoJobsScheduled { .. } => true,
        }
    }
}

/// A job that could not be registered with the dispatcher.
#[derive(Debug)]
pub struct JobScheduleFailure {
    pub job_id: String,
    pub error: ScheduleError,
}

/// Outcome of a successful startup.
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Scheduled job ids, in definition order.
    pub scheduled: Vec<String>,
    /// Definitions that were skipped.
    pub failures: Vec<JobScheduleFailure>,
}

impl StartupReport {
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }
}

//! Scheduling error types.

use thiserror::Error;

/// Errors registering a job with the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}' for job '{job_id}': {message}")]
    InvalidCron {
        job_id: String,
        expression: String,
        message: String,
    },

    #[error("Job '{0}' is already scheduled")]
    DuplicateJob(String),

    #[error("Cron expression '{expression}' for job '{job_id}' has no upcoming occurrence")]
    NoUpcomingFire { job_id: String, expression: String },

    #[error("Dispatcher has been shut down")]
    ShutDown,
}

impl ScheduleError {
    /// Job the error refers to, if any.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            ScheduleError::InvalidCron { job_id, .. }
            | ScheduleError::NoUpcomingFire { job_id, .. } => Some(job_id),
            ScheduleError::DuplicateJob(job_id) => Some(job_id),
            ScheduleError::ShutDown => None,
        }
    }
}

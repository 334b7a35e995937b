//! # Relay Daemon
//!
//! Hosting for the report-relay service:
//!
//! - [`ReportingService`]: loads job definitions, schedules them, and stops
//!   the dispatcher on shutdown
//! - [`SignalHandler`]: OS signals and stop requests ([`HostControl`])
//! - [`PidFile`]: single-instance guard

mod error;
mod pid;
mod service;
mod signal;

pub use error::{DaemonError, JobScheduleFailure, StartupError, StartupReport};
pub use pid::{PidFile, is_process_running, read_pid};
pub use service::ReportingService;
pub use signal::{HostControl, HostSignal, SignalHandler};

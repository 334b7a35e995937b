//! # Relay Scheduler
//!
//! Cron-driven dispatch of report jobs. See [`CronDispatcher`].

mod dispatcher;
mod error;

pub use dispatcher::{CronDispatcher, HandlerFuture, next_fire};
pub use error::ScheduleError;

//! Cron dispatcher: one trigger task per job.
//!
//! Each registered job gets a tokio task that sleeps until the next cron
//! occurrence, runs the job's handler to completion, and only then computes
//! the following occurrence. Firings of one job therefore never overlap,
//! while different jobs run concurrently. Occurrences that pass while a
//! firing is still running are coalesced into a single firing that starts
//! as soon as the running one completes.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use cron::Schedule;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::ScheduleError;

/// Boxed future returned by a job handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type Handler = Arc<dyn Fn() -> HandlerFuture + Send + Sync>;

struct Trigger {
    job_id: String,
    schedule: Schedule,
    handler: Handler,
}

#[derive(Default)]
struct DispatcherState {
    job_ids: Vec<String>,
    pending: Vec<Trigger>,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
    shut_down: bool,
}

/// Fires registered handlers on their cron schedules.
pub struct CronDispatcher {
    fire_on_start: bool,
    state: Mutex<DispatcherState>,
    cancel_tx: watch::Sender<bool>,
}

impl CronDispatcher {
    /// Create a dispatcher.
    ///
    /// With `fire_on_start`, every job fires once as soon as its trigger
    /// starts, then follows its cron schedule.
    pub fn new(fire_on_start: bool) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            fire_on_start,
            state: Mutex::new(DispatcherState::default()),
            cancel_tx,
        }
    }

    /// Register a job and return its first fire time.
    ///
    /// Expressions use the `sec min hour day-of-month month day-of-week [year]`
    /// format and are evaluated in the local time zone. Jobs registered after
    /// [`start`](Self::start) begin immediately.
    pub fn register<F, Fut>(
        &self,
        job_id: &str,
        cron_expr: &str,
        handler: F,
    ) -> Result<DateTime<Local>, ScheduleError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.lock();
        if state.shut_down {
            return Err(ScheduleError::ShutDown);
        }
        if state.job_ids.iter().any(|id| id == job_id) {
            return Err(ScheduleError::DuplicateJob(job_id.to_string()));
        }

        let (schedule, next) = parse_schedule(job_id, cron_expr)?;
        let first_fire = if self.fire_on_start { Local::now() } else { next };

        let handler: Handler = Arc::new(move || Box::pin(handler()) as HandlerFuture);
        let trigger = Trigger {
            job_id: job_id.to_string(),
            schedule,
            handler,
        };

        state.job_ids.push(job_id.to_string());
        if state.started {
            let task = self.spawn(trigger);
            state.tasks.push(task);
        } else {
            state.pending.push(trigger);
        }

        debug!(
            "Registered job '{}' ({}), first fire at {}",
            job_id, cron_expr, first_fire
        );
        Ok(first_fire)
    }

    /// Start every registered trigger. Idempotent.
    pub fn start(&self) {
        let mut state = self.lock();
        if state.started || state.shut_down {
            return;
        }
        state.started = true;

        let pending = std::mem::take(&mut state.pending);
        for trigger in pending {
            let task = self.spawn(trigger);
            state.tasks.push(task);
        }
        info!("Cron dispatcher started with {} jobs", state.job_ids.len());
    }

    /// Stop all triggers and wait for them to finish.
    ///
    /// Waiting triggers stop immediately; a firing already in progress runs
    /// to completion first. Later registrations fail with
    /// [`ScheduleError::ShutDown`].
    pub async fn shutdown(&self) {
        let tasks = {
            let mut state = self.lock();
            state.shut_down = true;
            state.pending.clear();
            std::mem::take(&mut state.tasks)
        };

        self.cancel_tx.send_replace(true);
        info!("Cron dispatcher stopping, waiting for {} triggers", tasks.len());

        for task in tasks {
            if let Err(e) = task.await {
                error!("Trigger task ended abnormally: {}", e);
            }
        }
        info!("Cron dispatcher stopped");
    }

    /// Registered job ids, in registration order.
    pub fn scheduled_jobs(&self) -> Vec<String> {
        self.lock().job_ids.clone()
    }

    fn spawn(&self, trigger: Trigger) -> JoinHandle<()> {
        let cancel = self.cancel_tx.subscribe();
        tokio::spawn(run_trigger(trigger, self.fire_on_start, cancel))
    }

    fn lock(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Next local occurrence of `cron_expr`, validating it the way
/// [`CronDispatcher::register`] does.
pub fn next_fire(job_id: &str, cron_expr: &str) -> Result<DateTime<Local>, ScheduleError> {
    parse_schedule(job_id, cron_expr).map(|(_, next)| next)
}

fn parse_schedule(
    job_id: &str,
    cron_expr: &str,
) -> Result<(Schedule, DateTime<Local>), ScheduleError> {
    let schedule = Schedule::from_str(cron_expr).map_err(|e| ScheduleError::InvalidCron {
        job_id: job_id.to_string(),
        expression: cron_expr.to_string(),
        message: e.to_string(),
    })?;
    let next = schedule
        .upcoming(Local)
        .next()
        .ok_or_else(|| ScheduleError::NoUpcomingFire {
            job_id: job_id.to_string(),
            expression: cron_expr.to_string(),
        })?;
    Ok((schedule, next))
}

async fn run_trigger(trigger: Trigger, fire_on_start: bool, mut cancel: watch::Receiver<bool>) {
    let Trigger {
        job_id,
        schedule,
        handler,
    } = trigger;
    let mut fire_now = fire_on_start;
    let mut last_slot: Option<DateTime<Local>> = None;

    loop {
        if *cancel.borrow() {
            break;
        }

        let slot = if fire_now {
            fire_now = false;
            Local::now()
        } else {
            let now = Local::now();
            let from = match last_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            let Some(next) = schedule.after(&from).next() else {
                info!("Job '{}' has no further occurrences", job_id);
                break;
            };
            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.changed() => break,
            }
            next
        };
        last_slot = Some(slot);

        debug!("Firing job '{}'", job_id);
        if let Err(e) = tokio::spawn(handler()).await {
            if e.is_panic() {
                error!("Job '{}' panicked; trigger stays scheduled", job_id);
            } else {
                error!("Job '{}' was cancelled: {}", job_id, e);
            }
        }

        let now = Local::now();
        let missed = schedule.after(&slot).take_while(|t| *t <= now).count();
        if missed > 0 {
            warn!(
                "Job '{}' missed {} occurrence(s) while running; firing once now",
                job_id, missed
            );
            fire_now = true;
        }
    }

    debug!("Trigger for job '{}' stopped", job_id);
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

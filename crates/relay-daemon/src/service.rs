//! Reporting service: loads job definitions, schedules them, and owns the
//! dispatcher for the lifetime of the process.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use relay_config::{JobDefinitionStore, ServiceConfig};
use relay_pipeline::{JobRunner, Uploader};
use relay_scheduler::CronDispatcher;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{JobScheduleFailure, StartupError, StartupReport};
use crate::signal::HostControl;

struct ServiceInner {
    definitions_path: PathBuf,
    store: JobDefinitionStore,
    dispatcher: CronDispatcher,
    runner: JobRunner,
    startup_failed: AtomicBool,
}

/// Schedules every configured report job and runs them until stopped.
pub struct ReportingService {
    inner: Arc<ServiceInner>,
    startup: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl ReportingService {
    /// Create a service from settings. `definitions_path` is already resolved
    /// against the working directory.
    pub fn new(config: &ServiceConfig, definitions_path: PathBuf) -> Self {
        let runner = JobRunner::new(Uploader::new(&config.transfer));
        Self::with_runner(definitions_path, config.scheduler.fire_on_start, runner)
    }

    /// Create a service around an explicit runner.
    pub fn with_runner(definitions_path: PathBuf, fire_on_start: bool, runner: JobRunner) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                definitions_path,
                store: JobDefinitionStore::new(),
                dispatcher: CronDispatcher::new(fire_on_start),
                runner,
                startup_failed: AtomicBool::new(false),
            }),
            startup: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Begin startup in the background and return immediately.
    ///
    /// A fatal startup error is logged and turned into a stop request on
    /// `host`. Returns `false` without doing anything if the service was
    /// already started.
    pub fn start(&self, host: Arc<dyn HostControl>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Reporting service started more than once");
            return false;
        }

        // Loading reads the definitions file; keep it off the async workers.
        let inner = Arc::clone(&self.inner);
        let handle = tokio::task::spawn_blocking(move || {
            match inner.schedule_all() {
                Ok(_) => {}
                Err(e) if !e.is_fatal() => warn!("Startup skipped: {}", e),
                Err(e) => {
                    error!("Startup failed: {}", e);
                    inner.startup_failed.store(true, Ordering::SeqCst);
                    host.request_stop();
                }
            }
        });
        *self.startup.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        true
    }

    /// Load the definitions and register one trigger per job, then start the
    /// dispatcher.
    ///
    /// Per-job registration failures are collected in the report. Failing
    /// to load the definitions, or registering none of them, is fatal.
    pub fn schedule_all(&self) -> Result<StartupReport, StartupError> {
        self.inner.schedule_all()
    }

    /// Wait for startup to finish, then stop the dispatcher and wait for
    /// in-flight runs.
    pub async fn stop(&self) {
        let startup = self
            .startup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = startup {
            if let Err(e) = handle.await {
                error!("Startup task ended abnormally: {}", e);
            }
        }

        info!("Stopping reporting service");
        self.inner.dispatcher.shutdown().await;
        info!("Reporting service stopped");
    }

    /// Whether the background startup hit a fatal error.
    pub fn startup_failed(&self) -> bool {
        self.inner.startup_failed.load(Ordering::SeqCst)
    }

    /// Ids of the scheduled jobs.
    pub fn scheduled_jobs(&self) -> Vec<String> {
        self.inner.dispatcher.scheduled_jobs()
    }
}

impl ServiceInner {
    fn schedule_all(&self) -> Result<StartupReport, StartupError> {
        let definitions = self.store.load(&self.definitions_path)?;
        info!(
            "Loaded {} job definitions from {}",
            definitions.len(),
            self.definitions_path.display()
        );

        let mut report = StartupReport::default();
        for definition in definitions {
            let job = Arc::new(definition.clone());
            let runner = self.runner.clone();
            let registered = self.dispatcher.register(&definition.id, &definition.cron, move || {
                let job = Arc::clone(&job);
                let runner = runner.clone();
                async move {
                    // The run logs its own outcome.
                    let _ = runner.execute(&job).await;
                }
            });

            match registered {
                Ok(first_fire) => {
                    info!(
                        "Scheduled job '{}' ({}), first run at {}",
                        definition.id, definition.cron, first_fire
                    );
                    report.scheduled.push(definition.id.clone());
                }
                Err(e) => {
                    error!("Cannot schedule job '{}': {}", definition.id, e);
                    report.failures.push(JobScheduleFailure {
                        job_id: definition.id.clone(),
                        error: e,
                    });
                }
            }
        }

        if report.scheduled.is_empty() {
            return Err(StartupError::NoJobsScheduled {
                defined: definitions.len(),
                failed: report.failures.len(),
            });
        }

        self.dispatcher.start();
        info!("{} jobs scheduled", report.scheduled_count());
        Ok(report)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

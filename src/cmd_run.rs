//! `run` and `run-once` commands.

use std::process::ExitCode;
use std::sync::Arc;

use relay_config::{JobDefinitionStore, ServiceConfig};
use relay_daemon::{PidFile, ReportingService, SignalHandler};
use relay_pipeline::{JobRunner, Uploader};
use tracing::{error, info, warn};

use crate::definitions_path;

/// Run the scheduler until SIGTERM/SIGINT or a fatal startup error.
pub(crate) async fn run(config: &ServiceConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let pid_file = match &config.service.pid_file {
        Some(path) => Some(PidFile::acquire(path)?),
        None => None,
    };

    let signals = SignalHandler::new();
    signals.install_os_handlers()?;

    info!("report-relay {} starting", env!("CARGO_PKG_VERSION"));
    let service = ReportingService::new(config, definitions_path(config));
    service.start(Arc::new(signals.clone()));

    signals.wait_for_shutdown().await;
    service.stop().await;

    if let Some(pid_file) = pid_file {
        if let Err(e) = pid_file.release() {
            warn!("{}", e);
        }
    }

    if service.startup_failed() {
        error!("report-relay stopped after a startup failure");
        Ok(ExitCode::FAILURE)
    } else {
        info!("report-relay stopped");
        Ok(ExitCode::SUCCESS)
    }
}

/// Execute a single job in the foreground.
///
/// Exits non-zero when the run fails or any destination rejects the report.
pub(crate) async fn run_once(
    config: &ServiceConfig,
    job_id: &str,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let store = JobDefinitionStore::new();
    store.load(&definitions_path(config))?;
    let job = store
        .get(job_id)
        .ok_or_else(|| format!("No job with id '{}'", job_id))?;

    let runner = JobRunner::new(Uploader::new(&config.transfer));
    let report = runner.execute(job).await?;

    println!(
        "{}: {} rows -> {}",
        job.id,
        report.export.rows,
        report.context.output_path.display()
    );
    for outcome in &report.delivery.outcomes {
        match &outcome.result {
            Ok(bytes) => println!("  uploaded {} bytes to {}", bytes, outcome.destination),
            Err(e) => println!("  FAILED {}", e),
        }
    }

    Ok(if report.delivery.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

//! Single report run: expand, export, finalize, deliver.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use relay_config::JobDefinition;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::RunError;
use crate::exporter::{ExportSummary, ReportExporter};
use crate::finalizer::Finalizer;
use crate::placeholder::PlaceholderExpander;
use crate::upload::{DeliveryReport, Uploader};

/// Suffix of the file a report is exported into before finalization.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Per-firing state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub job_id: String,
    pub run_id: Uuid,
    /// Absolute path of the final artifact.
    pub output_path: PathBuf,
    /// `output_path` with [`TEMP_SUFFIX`] appended.
    pub temp_path: PathBuf,
}

impl ExecutionContext {
    /// Resolve the job's output template against the current local time.
    pub fn new(job: &JobDefinition, run_id: Uuid) -> Result<Self, RunError> {
        let expanded = PlaceholderExpander::expand(&job.output_path)?;
        Self::for_output(&job.id, run_id, &expanded)
    }

    /// Build a context for an already expanded output path.
    ///
    /// Relative paths are made absolute against the working directory.
    pub fn for_output(job_id: &str, run_id: Uuid, expanded: &str) -> Result<Self, RunError> {
        let output_path = resolve_output_path(expanded)?;
        let mut temp = OsString::from(output_path.as_os_str());
        temp.push(TEMP_SUFFIX);

        Ok(Self {
            job_id: job_id.to_string(),
            run_id,
            output_path,
            temp_path: PathBuf::from(temp),
        })
    }
}

/// Make an expanded output path absolute and check that it names a file.
pub fn resolve_output_path(expanded: &str) -> Result<PathBuf, RunError> {
    let invalid = |message: String| RunError::InvalidOutputPath {
        path: expanded.to_string(),
        message,
    };
    if expanded.trim().is_empty() {
        return Err(invalid("path is empty".to_string()));
    }

    let output_path = std::path::absolute(expanded).map_err(|e| invalid(e.to_string()))?;
    if output_path.file_name().is_none() {
        return Err(invalid("path has no file name".to_string()));
    }
    Ok(output_path)
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub context: ExecutionContext,
    pub export: ExportSummary,
    pub delivery: DeliveryReport,
    pub elapsed: Duration,
}

/// Executes report runs.
#[derive(Clone)]
pub struct JobRunner {
    uploader: Uploader,
}

impl JobRunner {
    pub fn new(uploader: Uploader) -> Self {
        Self { uploader }
    }

    /// Run `job` once inside a `report` span carrying its job and run ids.
    ///
    /// A start and an end message are logged whatever the outcome. Delivery
    /// failures are reported in [`RunReport::delivery`]; they do not fail the
    /// run.
    pub async fn execute(&self, job: &JobDefinition) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("report", job_id = %job.id, run_id = %run_id);
        self.execute_logged(job, run_id).instrument(span).await
    }

    async fn execute_logged(
        &self,
        job: &JobDefinition,
        run_id: Uuid,
    ) -> Result<RunReport, RunError> {
        info!("Report job '{}' started", job.id);
        let started = Instant::now();

        let result = self.run_stages(job, run_id, started).await;
        match &result {
            Ok(report) => {
                if report.delivery.failed() > 0 {
                    warn!(
                        "Report job '{}' finished in {:?}: {} rows, {} of {} uploads failed",
                        job.id,
                        report.elapsed,
                        report.export.rows,
                        report.delivery.failed(),
                        report.delivery.outcomes.len()
                    );
                } else {
                    info!(
                        "Report job '{}' finished in {:?}: {} rows, {} uploads",
                        job.id,
                        report.elapsed,
                        report.export.rows,
                        report.delivery.succeeded()
                    );
                }
            }
            Err(e) => error!(
                "Report job '{}' failed after {:?}: {}",
                job.id,
                started.elapsed(),
                e
            ),
        }
        result
    }

    async fn run_stages(
        &self,
        job: &JobDefinition,
        run_id: Uuid,
        started: Instant,
    ) -> Result<RunReport, RunError> {
        let context = ExecutionContext::new(job, run_id)?;
        info!(
            "Exporting '{}' to {}",
            job.data_source,
            context.temp_path.display()
        );

        let export_job = job.clone();
        let temp = context.temp_path.clone();
        let export =
            tokio::task::spawn_blocking(move || ReportExporter::export(&export_job, &temp))
                .await??;
        info!("Exported {} rows ({} bytes)", export.rows, export.bytes);

        let temp = context.temp_path.clone();
        let output = context.output_path.clone();
        let compressed = job.compressed;
        tokio::task::spawn_blocking(move || Finalizer::finalize(&temp, &output, compressed))
            .await??;
        info!("Report written to {}", context.output_path.display());

        let delivery = self.uploader.deliver(&context.output_path, &job.uploads).await;

        Ok(RunReport {
            context,
            export,
            delivery,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

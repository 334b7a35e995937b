//! # Relay Pipeline
//!
//! The per-firing report pipeline:
//!
//! 1. [`PlaceholderExpander`] resolves the run's output path.
//! 2. [`ReportExporter`] streams the query result into `<output>.tmp`.
//! 3. [`Finalizer`] renames or zips the temporary file into place.
//! 4. [`Uploader`] delivers the result to each FTP/SFTP destination.
//!
//! [`JobRunner`] ties the stages together for one run.

mod error;
mod exporter;
mod finalizer;
mod placeholder;
mod run;
pub mod upload;

pub use error::{ExportError, FinalizeError, PlaceholderError, RunError, UploadError};
pub use exporter::{ExportSummary, LINE_ENDING, ReportExporter, UTF8_BOM};
pub use finalizer::{Finalizer, entry_name};
pub use placeholder::PlaceholderExpander;
pub use run::{ExecutionContext, JobRunner, RunReport, TEMP_SUFFIX, resolve_output_path};
pub use upload::{DeliveryOutcome, DeliveryReport, Transport, Uploader};

//! Streaming export of query results into a delimited report file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use relay_config::JobDefinition;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use crate::error::ExportError;

/// UTF-8 byte order mark written at the start of every report.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Line terminator of the host platform.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

/// SQLite VM instructions between timeout checks.
const PROGRESS_INTERVAL: i32 = 1000;

/// Result of a successful export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Data rows written.
    pub rows: u64,
    /// Report size in bytes, BOM included.
    pub bytes: u64,
}

/// Runs a job's query and streams every row into the report file.
pub struct ReportExporter;

impl ReportExporter {
    /// Export the result of `job.query` into `temp_path`.
    ///
    /// Blocking. Rows are written as they are stepped; the result set is
    /// never held in memory. A partial file is removed on failure.
    pub fn export(job: &JobDefinition, temp_path: &Path) -> Result<ExportSummary, ExportError> {
        let result = Self::export_inner(job, temp_path);
        if result.is_err() && temp_path.exists() {
            if let Err(e) = fs::remove_file(temp_path) {
                warn!("Cannot remove partial report {}: {}", temp_path.display(), e);
            }
        }
        result
    }

    fn export_inner(job: &JobDefinition, temp_path: &Path) -> Result<ExportSummary, ExportError> {
        let write_err = |source: io::Error| ExportError::Write {
            path: temp_path.to_path_buf(),
            source,
        };

        let conn = open_read_only(&job.data_source)?;
        let timeout = job.command_timeout();
        conn.busy_timeout(timeout).map_err(|source| ExportError::Connect {
            data_source: job.data_source.clone(),
            source,
        })?;

        let deadline = Instant::now() + timeout;
        let timed_out = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&timed_out);
        conn.progress_handler(
            PROGRESS_INTERVAL,
            Some(move || {
                if Instant::now() >= deadline {
                    flag.store(true, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            }),
        );
        let query_err = |e: rusqlite::Error| {
            if timed_out.load(Ordering::SeqCst) {
                ExportError::Timeout(timeout)
            } else {
                ExportError::Query(e)
            }
        };

        let mut stmt = conn.prepare(&job.query).map_err(&query_err)?;
        let columns = stmt.column_count();

        if let Some(parent) = temp_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let mut out = BufWriter::new(File::create(temp_path).map_err(write_err)?);
        out.write_all(UTF8_BOM).map_err(write_err)?;

        let delimiter = [job.format.delimiter()];
        let mut rows = stmt.query([]).map_err(&query_err)?;
        let mut count = 0u64;
        while let Some(row) = rows.next().map_err(&query_err)? {
            for i in 0..columns {
                if i > 0 {
                    out.write_all(&delimiter).map_err(write_err)?;
                }
                let value = row.get_ref(i).map_err(&query_err)?;
                write_field(&mut out, value).map_err(write_err)?;
            }
            out.write_all(LINE_ENDING.as_bytes()).map_err(write_err)?;
            count += 1;
        }

        let file = out.into_inner().map_err(|e| write_err(e.into_error()))?;
        file.sync_all().map_err(write_err)?;
        let bytes = file.metadata().map_err(write_err)?.len();

        debug!("Exported {} rows ({} bytes) to {}", count, bytes, temp_path.display());
        Ok(ExportSummary { rows: count, bytes })
    }
}

fn open_read_only(data_source: &str) -> Result<Connection, ExportError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(data_source, flags).map_err(|source| ExportError::Connect {
        data_source: data_source.to_string(),
        source,
    })
}

/// Write one quoted field. NULL renders as an empty quoted field.
fn write_field<W: Write>(out: &mut W, value: ValueRef<'_>) -> io::Result<()> {
    out.write_all(b"\"")?;
    match value {
        ValueRef::Null => {}
        ValueRef::Integer(i) => write!(out, "{}", i)?,
        ValueRef::Real(f) => write!(out, "{}", f)?,
        ValueRef::Text(bytes) => write_escaped(out, &String::from_utf8_lossy(bytes))?,
        ValueRef::Blob(bytes) => {
            for b in bytes {
                write!(out, "{:02x}", b)?;
            }
        }
    }
    out.write_all(b"\"")
}

/// Write `text` with every `"` doubled.
fn write_escaped<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    let mut pieces = text.split('"');
    if let Some(first) = pieces.next() {
        out.write_all(first.as_bytes())?;
    }
    for piece in pieces {
        out.write_all(b"\"\"")?;
        out.write_all(piece.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "exporter_tests.rs"]
mod tests;

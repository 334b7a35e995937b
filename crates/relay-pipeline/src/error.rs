//! Pipeline error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Output path template errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    /// Opening and closing brace counts differ.
    #[error("Unbalanced placeholder brackets: {open} opening, {close} closing")]
    Unbalanced { open: usize, close: usize },

    /// A closing brace sits before the opening brace it pairs with.
    #[error(
        "Closing bracket at offset {close_at} precedes its matching opening bracket at offset {open_at}"
    )]
    Misordered { open_at: usize, close_at: usize },
}

/// Query execution and report writing errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The data source could not be opened.
    #[error("Cannot open data source '{data_source}': {source}")]
    Connect {
        data_source: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The query failed to prepare or step.
    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),

    /// The query ran past its command timeout and was interrupted.
    #[error("Query exceeded command timeout of {0:?}")]
    Timeout(Duration),

    /// The report file could not be written.
    #[error("Cannot write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors moving or archiving the exported report.
#[derive(Debug, Error)]
pub enum FinalizeError {
    /// The final path has no usable file name.
    #[error("Output path has no file name: {0}")]
    InvalidPath(PathBuf),

    #[error("Cannot move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Delivery errors for a single destination.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Cannot connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Authentication rejected by {url}: {message}")]
    Auth { url: String, message: String },

    #[error("Transfer to {url} failed: {message}")]
    Transfer { url: String, message: String },

    /// The local report could not be read.
    #[error("Cannot read {path}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking transfer task panicked or was cancelled.
    #[error("Transfer task to {url} aborted: {message}")]
    Aborted { url: String, message: String },
}

/// Errors that end a single report run before delivery.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error("Invalid output path '{path}': {message}")]
    InvalidOutputPath { path: String, message: String },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Finalize(#[from] FinalizeError),

    /// A blocking stage panicked or was cancelled.
    #[error("Blocking stage aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_error_display() {
        let err = PlaceholderError::Unbalanced { open: 2, close: 1 };
        assert_eq!(
            err.to_string(),
            "Unbalanced placeholder brackets: 2 opening, 1 closing"
        );

        let err = PlaceholderError::Misordered {
            open_at: 5,
            close_at: 0,
        };
        assert!(err.to_string().contains("precedes its matching opening bracket"));
    }

    #[test]
    fn test_run_error_is_transparent() {
        let err: RunError = ExportError::Timeout(Duration::from_secs(3)).into();
        assert_eq!(err.to_string(), "Query exceeded command timeout of 3s");
    }

    #[test]
    fn test_upload_error_carries_destination() {
        let err = UploadError::Connect {
            url: "sftp://h:22/in/r.csv".to_string(),
            message: "refused".to_string(),
        };
        assert!(err.to_string().contains("sftp://h:22/in/r.csv"));
    }
}

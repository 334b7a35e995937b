//! Report job definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delimiter-defining report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma-separated values.
    #[default]
    #[serde(alias = "Csv", alias = "CSV")]
    Csv,
    /// Tab-separated values.
    #[serde(alias = "Tsv", alias = "TSV")]
    Tsv,
}

impl ReportFormat {
    /// Field delimiter for this format.
    pub fn delimiter(self) -> u8 {
        match self {
            ReportFormat::Csv => b',',
            ReportFormat::Tsv => b'\t',
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Csv => write!(f, "csv"),
            ReportFormat::Tsv => write!(f, "tsv"),
        }
    }
}

/// File transfer protocol of an upload destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ftp,
    Sftp,
}

impl Protocol {
    /// Well-known port of the protocol.
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Ftp => 21,
            Protocol::Sftp => 22,
        }
    }

    /// URL scheme, used in log messages.
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Ftp => "ftp",
            Protocol::Sftp => "sftp",
        }
    }
}

/// One FTP or SFTP destination of a report.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDirective {
    /// Server hostname or IP address.
    pub host: String,

    /// Server port. Defaults to the protocol's well-known port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub protocol: Protocol,

    /// Use explicit TLS (FTP only).
    #[serde(default)]
    pub use_tls: bool,

    /// Use passive mode (FTP only).
    #[serde(default = "default_passive")]
    pub passive: bool,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Remote folder the report is uploaded into.
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_passive() -> bool {
    true
}

fn default_folder() -> String {
    "/".to_string()
}

impl UploadDirective {
    /// Create a directive with default options.
    pub fn new(protocol: Protocol, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            protocol,
            use_tls: false,
            passive: default_passive(),
            username: String::new(),
            password: String::new(),
            folder: default_folder(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// Remote folder, forced to start with `/` and without a trailing `/`
    /// (the root folder stays `/`).
    pub fn normalized_folder(&self) -> String {
        let trimmed = self.folder.trim().trim_end_matches('/');
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        }
    }

    /// Remote path of `file_name` inside the destination folder.
    pub fn remote_path(&self, file_name: &str) -> String {
        let folder = self.normalized_folder();
        if folder == "/" {
            format!("/{}", file_name)
        } else {
            format!("{}/{}", folder, file_name)
        }
    }

    /// Destination URL of an absolute remote path, without credentials.
    pub fn url_for_path(&self, remote_path: &str) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol.scheme(),
            self.host,
            self.port(),
            remote_path
        )
    }
}

impl fmt::Debug for UploadDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadDirective")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("protocol", &self.protocol)
            .field("use_tls", &self.use_tls)
            .field("passive", &self.passive)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("folder", &self.folder)
            .finish()
    }
}

/// A scheduled report: one query, one output file, zero or more destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    /// Unique job ID.
    pub id: String,

    /// Cron expression: `sec min hour day-of-month month day-of-week [year]`.
    pub cron: String,

    /// SQLite database path or `file:` URI.
    pub data_source: String,

    /// SQL query producing the report rows.
    pub query: String,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Output path template; may contain `{...}` date placeholders.
    pub output_path: String,

    /// Wrap the report in a single-entry zip archive.
    #[serde(default)]
    pub compressed: bool,

    #[serde(default)]
    pub format: ReportFormat,

    #[serde(default)]
    pub uploads: Vec<UploadDirective>,

    /// Notification address. Reserved, currently unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_email: Option<String>,
}

fn default_command_timeout() -> u64 {
    60
}

impl JobDefinition {
    /// Create a new job definition.
    pub fn new(
        id: impl Into<String>,
        cron: impl Into<String>,
        data_source: impl Into<String>,
        query: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            cron: cron.into(),
            data_source: data_source.into(),
            query: query.into(),
            command_timeout_secs: default_command_timeout(),
            output_path: output_path.into(),
            compressed: false,
            format: ReportFormat::default(),
            uploads: Vec::new(),
            notify_email: None,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_upload(mut self, directive: UploadDirective) -> Self {
        self.uploads.push(directive);
        self
    }

    /// Get the command timeout as a Duration.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

//! Sequential multi-destination delivery.

use std::path::Path;
use std::sync::Arc;

use relay_config::{Protocol, TransferConfig, UploadDirective};
use tracing::{debug, error, info};

use super::ftp::FtpTransport;
use super::sftp::SftpTransport;
use super::transport::Transport;
use crate::error::UploadError;

/// Result of delivering a report to one destination.
#[derive(Debug)]
pub struct DeliveryOutcome {
    /// Destination URL, without credentials.
    pub destination: String,
    /// Bytes sent, or the failure.
    pub result: Result<u64, UploadError>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of every destination of one run, in declared order.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    /// Number of destinations that received the report.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of destinations that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Failed outcomes, in declared order.
    pub fn failures(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Sends a finished report to each of a job's destinations.
#[derive(Clone)]
pub struct Uploader {
    ftp: Arc<dyn Transport>,
    sftp: Arc<dyn Transport>,
}

impl Uploader {
    /// Create an uploader backed by the real FTP and SFTP clients.
    pub fn new(config: &TransferConfig) -> Self {
        Self {
            ftp: Arc::new(FtpTransport::new(config.connect_timeout())),
            sftp: Arc::new(SftpTransport::new(config.clone())),
        }
    }

    /// Create an uploader with explicit transports.
    pub fn with_transports(ftp: Arc<dyn Transport>, sftp: Arc<dyn Transport>) -> Self {
        Self { ftp, sftp }
    }

    /// Deliver `report` to every directive, one after another.
    ///
    /// A failing destination never prevents the remaining ones from being
    /// attempted.
    pub async fn deliver(&self, report: &Path, directives: &[UploadDirective]) -> DeliveryReport {
        let mut delivery = DeliveryReport::default();
        if directives.is_empty() {
            debug!("No upload destinations configured");
            return delivery;
        }

        let file_name = report
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for directive in directives {
            let remote_path = directive.remote_path(&file_name);
            let destination = directive.url_for_path(&remote_path);
            let transport = match directive.protocol {
                Protocol::Ftp => &self.ftp,
                Protocol::Sftp => &self.sftp,
            };

            info!("Uploading {} to {}", report.display(), destination);
            let result = transport.upload(directive, report, &remote_path).await;
            match &result {
                Ok(bytes) => info!("Uploaded {} bytes to {}", bytes, destination),
                Err(e) => error!("Upload to {} failed: {}", destination, e),
            }

            delivery.outcomes.push(DeliveryOutcome {
                destination,
                result,
            });
        }

        delivery
    }
}

#[cfg(test)]
#[path = "uploader_tests.rs"]
mod tests;

//! Transport abstraction shared by the FTP and SFTP clients.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use async_trait::async_trait;
use relay_config::UploadDirective;

use crate::error::UploadError;

/// Delivers one local file to one remote destination.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload `local` to `remote_path` on the directive's server.
    ///
    /// Returns the number of bytes sent.
    async fn upload(
        &self,
        directive: &UploadDirective,
        local: &Path,
        remote_path: &str,
    ) -> Result<u64, UploadError>;
}

/// Resolve the directive's host and port to the first socket address.
pub(crate) fn resolve(directive: &UploadDirective, url: &str) -> Result<SocketAddr, UploadError> {
    let connect_err = |message: String| UploadError::Connect {
        url: url.to_string(),
        message,
    };
    (directive.host.as_str(), directive.port())
        .to_socket_addrs()
        .map_err(|e| connect_err(e.to_string()))?
        .next()
        .ok_or_else(|| connect_err(format!("no address found for {}", directive.host)))
}

/// Run a blocking transfer on tokio's blocking pool.
pub(crate) async fn run_blocking<F>(url: String, transfer: F) -> Result<u64, UploadError>
where
    F: FnOnce() -> Result<u64, UploadError> + Send + 'static,
{
    match tokio::task::spawn_blocking(transfer).await {
        Ok(result) => result,
        Err(e) => Err(UploadError::Aborted {
            url,
            message: e.to_string(),
        }),
    }
}

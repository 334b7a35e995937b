//! SFTP transport over `ssh2`.

use std::fs::File;
use std::io;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use relay_config::{TransferConfig, UploadDirective};
use ssh2::Session;
use tracing::{debug, warn};

use super::transport::{Transport, resolve, run_blocking};
use crate::error::UploadError;

/// Uploads through a fresh SSH session per destination.
#[derive(Debug, Clone)]
pub struct SftpTransport {
    config: TransferConfig,
}

impl SftpTransport {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for SftpTransport {
    async fn upload(
        &self,
        directive: &UploadDirective,
        local: &Path,
        remote_path: &str,
    ) -> Result<u64, UploadError> {
        let url = directive.url_for_path(remote_path);
        let config = self.config.clone();
        let directive = directive.clone();
        let local = local.to_path_buf();
        let remote = PathBuf::from(remote_path);
        let task_url = url.clone();

        run_blocking(url, move || {
            upload_blocking(&config, &directive, &local, &remote, &task_url)
        })
        .await
    }
}

fn upload_blocking(
    config: &TransferConfig,
    directive: &UploadDirective,
    local: &Path,
    remote: &Path,
    url: &str,
) -> Result<u64, UploadError> {
    let connect_err = |message: String| UploadError::Connect {
        url: url.to_string(),
        message,
    };

    let mut source = File::open(local).map_err(|source| UploadError::Local {
        path: local.to_path_buf(),
        source,
    })?;

    let addr = resolve(directive, url)?;
    let tcp = TcpStream::connect_timeout(&addr, config.connect_timeout())
        .map_err(|e| connect_err(e.to_string()))?;

    // The timeout bounds each blocking libssh2 call, not the whole transfer.
    let mut session = Session::new().map_err(|e| connect_err(e.to_string()))?;
    session.set_timeout(millis(config.connect_timeout()));
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| connect_err(e.to_string()))?;

    let sent = session
        .userauth_password(&directive.username, &directive.password)
        .map_err(|e| UploadError::Auth {
            url: url.to_string(),
            message: e.to_string(),
        })
        .and_then(|()| send_file(&session, &mut source, remote, config, url));

    close_session(session, config, url);
    sent
}

/// Stream `source` into a new remote file and close it.
///
/// Remote handles are closed under the disconnect timeout; a failed close
/// fails the transfer.
fn send_file(
    session: &Session,
    source: &mut File,
    remote: &Path,
    config: &TransferConfig,
    url: &str,
) -> Result<u64, UploadError> {
    let transfer_err = |message: String| UploadError::Transfer {
        url: url.to_string(),
        message,
    };

    let sftp = session.sftp().map_err(|e| transfer_err(e.to_string()))?;
    let result = sftp
        .create(remote)
        .map_err(|e| transfer_err(e.to_string()))
        .and_then(|mut target| {
            let copied = io::copy(source, &mut target).map_err(|e| transfer_err(e.to_string()));
            session.set_timeout(millis(config.disconnect_timeout()));
            let closed = target
                .close()
                .map_err(|e| transfer_err(format!("closing remote file: {}", e)));
            copied.and_then(|sent| closed.map(|()| sent))
        });

    session.set_timeout(millis(config.disconnect_timeout()));
    if config.abandon_sftp_sessions {
        std::mem::forget(sftp);
    }
    result
}

fn close_session(session: Session, config: &TransferConfig, url: &str) {
    if config.abandon_sftp_sessions {
        debug!("Leaving SFTP session to {} open", url);
        std::mem::forget(session);
        return;
    }

    session.set_timeout(millis(config.disconnect_timeout()));
    if let Err(e) = session.disconnect(None, "report delivered", None) {
        warn!("SFTP disconnect from {} failed: {}", url, e);
    }
}

fn millis(duration: std::time::Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

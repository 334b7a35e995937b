//! FTP transport over `suppaftp`, with optional explicit TLS.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use relay_config::UploadDirective;
use suppaftp::native_tls::TlsConnector;
use suppaftp::types::FileType;
use suppaftp::{FtpError, Mode, NativeTlsConnector, NativeTlsFtpStream};
use tracing::{debug, warn};

use super::transport::{Transport, resolve, run_blocking};
use crate::error::UploadError;

/// Uploads over a fresh FTP control connection per destination.
#[derive(Debug, Clone)]
pub struct FtpTransport {
    connect_timeout: Duration,
}

impl FtpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for FtpTransport {
    async fn upload(
        &self,
        directive: &UploadDirective,
        local: &Path,
        remote_path: &str,
    ) -> Result<u64, UploadError> {
        let url = directive.url_for_path(remote_path);
        let timeout = self.connect_timeout;
        let directive = directive.clone();
        let local = local.to_path_buf();
        let remote = remote_path.to_string();
        let task_url = url.clone();

        run_blocking(url, move || {
            upload_blocking(timeout, &directive, &local, &remote, &task_url)
        })
        .await
    }
}

fn upload_blocking(
    timeout: Duration,
    directive: &UploadDirective,
    local: &Path,
    remote: &str,
    url: &str,
) -> Result<u64, UploadError> {
    let connect_err = |e: FtpError| UploadError::Connect {
        url: url.to_string(),
        message: e.to_string(),
    };
    let transfer_err = |e: FtpError| UploadError::Transfer {
        url: url.to_string(),
        message: e.to_string(),
    };

    let mut source = File::open(local).map_err(|source| UploadError::Local {
        path: local.to_path_buf(),
        source,
    })?;

    let addr = resolve(directive, url)?;
    let mut stream = NativeTlsFtpStream::connect_timeout(addr, timeout).map_err(connect_err)?;

    if directive.use_tls {
        let connector = TlsConnector::new().map_err(|e| UploadError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        stream = stream
            .into_secure(NativeTlsConnector::from(connector), &directive.host)
            .map_err(connect_err)?;
    }

    stream
        .login(&directive.username, &directive.password)
        .map_err(|e| UploadError::Auth {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    stream.set_mode(if directive.passive {
        Mode::Passive
    } else {
        Mode::Active
    });

    let sent = stream
        .transfer_type(FileType::Binary)
        .and_then(|()| stream.put_file(remote, &mut source))
        .map_err(transfer_err);

    if let Err(e) = stream.quit() {
        warn!("FTP QUIT to {} failed: {}", url, e);
    } else {
        debug!("Closed FTP session to {}", url);
    }
    sent
}

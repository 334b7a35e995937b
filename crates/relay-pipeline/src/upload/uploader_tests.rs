use super::*;
use async_trait::async_trait;
use std::net::TcpListener;
use std::sync::Mutex;
use tempfile::TempDir;

/// Records every upload and fails for one host.
struct FakeTransport {
    name: &'static str,
    failing_host: Option<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn upload(
        &self,
        directive: &UploadDirective,
        local: &Path,
        remote_path: &str,
    ) -> Result<u64, UploadError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}{}", self.name, directive.host, remote_path));
        if self.failing_host.as_deref() == Some(directive.host.as_str()) {
            return Err(UploadError::Connect {
                url: directive.url_for_path(remote_path),
                message: "connection refused".to_string(),
            });
        }
        Ok(std::fs::metadata(local).unwrap().len())
    }
}

fn uploader(failing_host: Option<&str>) -> (Uploader, Arc<Mutex<Vec<String>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let fake = |name| {
        Arc::new(FakeTransport {
            name,
            failing_host: failing_host.map(str::to_string),
            calls: Arc::clone(&calls),
        }) as Arc<dyn Transport>
    };
    (Uploader::with_transports(fake("ftp"), fake("sftp")), calls)
}

fn report(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("sales-20240305.csv");
    std::fs::write(&path, "\"1\"\n").unwrap();
    path
}

#[tokio::test]
async fn test_failure_does_not_stop_remaining_destinations() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let (uploader, calls) = uploader(Some("down.example.com"));

    let directives = vec![
        UploadDirective::new(Protocol::Sftp, "one.example.com").with_folder("in"),
        UploadDirective::new(Protocol::Ftp, "down.example.com"),
        UploadDirective::new(Protocol::Ftp, "three.example.com").with_folder("/drop/"),
    ];
    let delivery = uploader.deliver(&report, &directives).await;

    assert_eq!(delivery.outcomes.len(), 3);
    assert_eq!(delivery.succeeded(), 2);
    assert_eq!(delivery.failed(), 1);

    let failed: Vec<_> = delivery.failures().collect();
    assert_eq!(
        failed[0].destination,
        "ftp://down.example.com:21/sales-20240305.csv"
    );

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "sftp:one.example.com/in/sales-20240305.csv",
            "ftp:down.example.com/sales-20240305.csv",
            "ftp:three.example.com/drop/sales-20240305.csv",
        ]
    );
}

#[tokio::test]
async fn test_no_destinations() {
    let dir = TempDir::new().unwrap();
    let (uploader, calls) = uploader(None);

    let delivery = uploader.deliver(&report(&dir), &[]).await;
    assert!(delivery.outcomes.is_empty());
    assert_eq!(delivery.failed(), 0);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_outcome_reports_bytes() {
    let dir = TempDir::new().unwrap();
    let (uploader, _) = uploader(None);

    let directives = vec![UploadDirective::new(Protocol::Sftp, "one.example.com")];
    let delivery = uploader.deliver(&report(&dir), &directives).await;
    assert_eq!(delivery.outcomes[0].result.as_ref().unwrap(), &4);
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_real_transports_report_connect_failure() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    let config = TransferConfig {
        connect_timeout_secs: 2,
        ..TransferConfig::default()
    };
    let uploader = Uploader::new(&config);

    let directives = vec![
        UploadDirective::new(Protocol::Ftp, "127.0.0.1").with_port(closed_port()),
        UploadDirective::new(Protocol::Sftp, "127.0.0.1").with_port(closed_port()),
    ];
    let delivery = uploader.deliver(&report, &directives).await;

    assert_eq!(delivery.failed(), 2);
    for outcome in &delivery.outcomes {
        assert!(matches!(outcome.result, Err(UploadError::Connect { .. })));
    }
}

#[tokio::test]
async fn test_missing_local_file() {
    let dir = TempDir::new().unwrap();
    let uploader = Uploader::new(&TransferConfig::default());

    let directives = vec![UploadDirective::new(Protocol::Sftp, "127.0.0.1")];
    let delivery = uploader
        .deliver(&dir.path().join("missing.csv"), &directives)
        .await;
    assert!(matches!(
        delivery.outcomes[0].result,
        Err(UploadError::Local { .. })
    ));
}

#[tokio::test]
async fn test_silent_sftp_peer_times_out() {
    let dir = TempDir::new().unwrap();
    let report = report(&dir);
    // Accepted by the kernel backlog, never answered.
    let silent = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();
    let config = TransferConfig {
        connect_timeout_secs: 1,
        disconnect_timeout_secs: 1,
        ..TransferConfig::default()
    };
    let uploader = Uploader::new(&config);

    let directives = vec![UploadDirective::new(Protocol::Sftp, "127.0.0.1").with_port(port)];
    let started = std::time::Instant::now();
    let delivery = uploader.deliver(&report, &directives).await;

    assert!(started.elapsed() < std::time::Duration::from_secs(10));
    assert!(matches!(
        delivery.outcomes[0].result,
        Err(UploadError::Connect { .. })
    ));
    drop(silent);
}

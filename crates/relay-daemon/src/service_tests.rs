use super::*;
use relay_config::TransferConfig;
use relay_config::DefinitionsError;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tempfile::TempDir;

const YEARLY: &str = "0 0 0 1 1 *";

#[derive(Default)]
struct FakeHost {
    stops: AtomicUsize,
}

impl HostControl for FakeHost {
    fn request_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn definition(id: &str, cron: &str, dir: &Path) -> String {
    format!(
        r#"{{"id": "{id}", "cron": "{cron}", "data_source": "{db}",
            "query": "SELECT n FROM numbers", "output_path": "{out}"}}"#,
        id = id,
        cron = cron,
        db = dir.join("numbers.db").display(),
        out = dir.join(format!("{}.csv", id)).display(),
    )
}

fn write_definitions(dir: &TempDir, entries: &[(&str, &str)]) -> PathBuf {
    let body: Vec<String> = entries
        .iter()
        .map(|(id, cron)| definition(id, cron, dir.path()))
        .collect();
    let path = dir.path().join("job_definitions.json");
    std::fs::write(&path, format!("[{}]", body.join(","))).unwrap();
    path
}

fn service(path: PathBuf, fire_on_start: bool) -> ReportingService {
    let runner = JobRunner::new(Uploader::new(&TransferConfig::default()));
    ReportingService::with_runner(path, fire_on_start, runner)
}

#[tokio::test]
async fn test_schedules_every_valid_definition() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[("a", YEARLY), ("b", YEARLY), ("c", YEARLY)]);
    let service = service(path, false);

    let report = service.schedule_all().unwrap();
    assert_eq!(report.scheduled_count(), 3);
    assert!(report.failures.is_empty());
    assert_eq!(service.scheduled_jobs(), vec!["a", "b", "c"]);
    service.stop().await;
}

#[tokio::test]
async fn test_invalid_definition_is_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(
        &dir,
        &[("good", YEARLY), ("bad", "not a cron"), ("good", YEARLY)],
    );
    let service = service(path, false);

    let report = service.schedule_all().unwrap();
    assert_eq!(report.scheduled, vec!["good"]);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].job_id, "bad");
    assert_eq!(report.failures[1].job_id, "good");
    service.stop().await;
}

#[tokio::test]
async fn test_zero_valid_crons_stops_host() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[("x", "bogus"), ("y", "* * *")]);
    let service = service(path, false);
    let host = Arc::new(FakeHost::default());

    assert!(service.start(host.clone()));
    service.stop().await;

    assert!(service.startup_failed());
    assert_eq!(host.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_zero_jobs_error() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[]);
    let service = service(path, false);

    let err = service.schedule_all().unwrap_err();
    assert!(matches!(
        err,
        StartupError::NoJobsScheduled {
            defined: 0,
            failed: 0
        }
    ));
}

#[tokio::test]
async fn test_missing_definitions_stops_host() {
    let dir = TempDir::new().unwrap();
    let service = service(dir.path().join("absent.json"), false);
    let host = Arc::new(FakeHost::default());

    service.start(host.clone());
    service.stop().await;

    assert!(service.startup_failed());
    assert_eq!(host.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_successful_start_does_not_stop_host() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[("a", YEARLY)]);
    let service = service(path, false);
    let host = Arc::new(FakeHost::default());

    service.start(host.clone());
    service.stop().await;

    assert!(!service.startup_failed());
    assert_eq!(host.stops.load(Ordering::SeqCst), 0);
    assert_eq!(service.scheduled_jobs(), vec!["a"]);
}

#[tokio::test]
async fn test_definitions_load_only_once() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[("a", YEARLY)]);
    let service = service(path, false);

    service.schedule_all().unwrap();
    let err = service.schedule_all().unwrap_err();
    assert!(matches!(
        err,
        StartupError::DefinitionsLoad(DefinitionsError::AlreadyLoaded)
    ));
    assert_eq!(service.scheduled_jobs(), vec!["a"]);
    service.stop().await;
}

#[tokio::test]
async fn test_second_start_keeps_service_running() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[("a", YEARLY)]);
    let service = service(path, false);
    let host = Arc::new(FakeHost::default());

    assert!(service.start(host.clone()));
    assert!(!service.start(host.clone()));
    service.stop().await;

    assert!(!service.startup_failed());
    assert_eq!(host.stops.load(Ordering::SeqCst), 0);
    assert_eq!(service.scheduled_jobs(), vec!["a"]);
}

#[tokio::test]
async fn test_start_after_manual_scheduling_does_not_stop_host() {
    let dir = TempDir::new().unwrap();
    let path = write_definitions(&dir, &[("a", YEARLY)]);
    let service = service(path, false);
    let host = Arc::new(FakeHost::default());

    service.schedule_all().unwrap();
    service.start(host.clone());
    service.stop().await;

    assert!(!service.startup_failed());
    assert_eq!(host.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stop_without_start() {
    let dir = TempDir::new().unwrap();
    let service = service(dir.path().join("unused.json"), false);
    tokio::time::timeout(Duration::from_secs(1), service.stop())
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fire_on_start_produces_report() {
    let dir = TempDir::new().unwrap();
    let conn = rusqlite::Connection::open(dir.path().join("numbers.db")).unwrap();
    conn.execute_batch("CREATE TABLE numbers (n INTEGER); INSERT INTO numbers VALUES (1), (2);")
        .unwrap();
    drop(conn);

    let path = write_definitions(&dir, &[("numbers", YEARLY)]);
    let service = service(path, true);
    service.start(Arc::new(FakeHost::default()));

    let report = dir.path().join("numbers.csv");
    for _ in 0..50 {
        if report.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    service.stop().await;

    let content = std::fs::read_to_string(&report).unwrap();
    assert_eq!(content.trim_start_matches('\u{feff}').lines().count(), 2);
}

use super::*;
use std::io::Read;
use tempfile::TempDir;
use zip::ZipArchive;

const REPORT: &str = "\u{feff}\"1\",\"a\"\n\"2\",\"b\"\n\"3\",\"c\"\n";

fn write_temp(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, REPORT).unwrap();
    path
}

#[test]
fn test_uncompressed_rename() {
    let dir = TempDir::new().unwrap();
    let temp = write_temp(&dir, "r.csv.tmp");
    let final_path = dir.path().join("r.csv");

    Finalizer::finalize(&temp, &final_path, false).unwrap();
    assert!(!temp.exists());
    assert_eq!(fs::read_to_string(&final_path).unwrap(), REPORT);
}

#[test]
fn test_uncompressed_overwrites_existing() {
    let dir = TempDir::new().unwrap();
    let temp = write_temp(&dir, "r.csv.tmp");
    let final_path = dir.path().join("r.csv");
    fs::write(&final_path, "stale").unwrap();

    Finalizer::finalize(&temp, &final_path, false).unwrap();
    assert_eq!(fs::read_to_string(&final_path).unwrap(), REPORT);
}

#[test]
fn test_compressed_single_entry() {
    let dir = TempDir::new().unwrap();
    let temp = write_temp(&dir, "r.csv.zip.tmp");
    let final_path = dir.path().join("r.csv.zip");

    Finalizer::finalize(&temp, &final_path, true).unwrap();
    assert!(!temp.exists());
    assert!(!dir.path().join("r.csv.zip.part").exists());

    let mut archive = ZipArchive::new(File::open(&final_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
    let mut entry = archive.by_index(0).unwrap();
    assert_eq!(entry.name(), "r.csv");
    assert_eq!(entry.compression(), CompressionMethod::Deflated);

    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    assert_eq!(content, REPORT);
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_compressed_replaces_previous_archive() {
    let dir = TempDir::new().unwrap();
    let temp = write_temp(&dir, "r.zip.tmp");
    let final_path = dir.path().join("r.zip");
    fs::write(&final_path, "not an archive").unwrap();

    Finalizer::finalize(&temp, &final_path, true).unwrap();
    let archive = ZipArchive::new(File::open(&final_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 1);
}

#[test]
fn test_compressed_missing_temp_leaves_final_untouched() {
    let dir = TempDir::new().unwrap();
    let temp = dir.path().join("missing.tmp");
    let final_path = dir.path().join("r.zip");
    fs::write(&final_path, "previous").unwrap();

    let result = Finalizer::finalize(&temp, &final_path, true);
    assert!(matches!(result, Err(FinalizeError::Io { .. })));
    assert_eq!(fs::read_to_string(&final_path).unwrap(), "previous");
    assert!(!dir.path().join("r.zip.part").exists());
}

#[test]
fn test_rename_failure_keeps_temp() {
    let dir = TempDir::new().unwrap();
    let temp = write_temp(&dir, "r.csv.tmp");
    let final_path = dir.path().join("no-such-dir/r.csv");

    let result = Finalizer::finalize(&temp, &final_path, false);
    assert!(matches!(result, Err(FinalizeError::Rename { .. })));
    assert!(temp.exists());
}

#[test]
fn test_compressed_failure_keeps_temp() {
    let dir = TempDir::new().unwrap();
    let temp = write_temp(&dir, "r.zip.tmp");
    let final_path = dir.path().join("no-such-dir/r.zip");

    assert!(Finalizer::finalize(&temp, &final_path, true).is_err());
    assert!(temp.exists());
}

#[test]
fn test_entry_name() {
    assert_eq!(entry_name(Path::new("/out/sales.csv.zip")).unwrap(), "sales.csv");
    assert_eq!(entry_name(Path::new("/out/sales.ZIP")).unwrap(), "sales");
    assert_eq!(entry_name(Path::new("/out/sales.csv")).unwrap(), "sales.csv");
    assert!(matches!(
        entry_name(Path::new("/")),
        Err(FinalizeError::InvalidPath(_))
    ));
}

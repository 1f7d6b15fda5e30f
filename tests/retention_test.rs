use mikrotik_backup::core::prune::prune_backups;
use mikrotik_backup::LocalBackupStore;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_with_age(path: &Path, age: Duration) {
    let file = std::fs::File::create(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn days(n: u64) -> Duration {
    Duration::from_secs(n * 24 * 60 * 60)
}

#[tokio::test]
async fn test_seven_day_retention_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_with_age(&dir.join("R1.backup010101"), days(10));
    write_with_age(&dir.join("R1.backup"), days(1));

    let store = LocalBackupStore::new(dir);
    let report = prune_backups(&store, "R1", 7, chrono::Utc::now(), None).await;

    assert!(!dir.join("R1.backup010101").exists());
    assert!(dir.join("R1.backup").exists());
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.retained, 1);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_other_prefixes_survive_even_with_shared_suffix() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_with_age(&dir.join("R2.backup010101"), days(90));
    write_with_age(&dir.join("xR1.backup010101"), days(90));
    write_with_age(&dir.join("r1.backup010101"), days(90));

    let store = LocalBackupStore::new(dir);
    let report = prune_backups(&store, "R1", 7, chrono::Utc::now(), None).await;

    assert!(report.deleted.is_empty());
    assert!(dir.join("R2.backup010101").exists());
    assert!(dir.join("xR1.backup010101").exists());
    assert!(dir.join("r1.backup010101").exists());
}

#[tokio::test]
async fn test_prefix_match_includes_longer_device_names() {
    // R1 also matches the files of a device named R10.
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    write_with_age(&dir.join("R10.backup010101"), days(30));

    let store = LocalBackupStore::new(dir);
    let report = prune_backups(&store, "R1", 7, chrono::Utc::now(), None).await;

    assert_eq!(report.deleted.len(), 1);
    assert!(!dir.join("R10.backup010101").exists());
}

#[tokio::test]
async fn test_subdirectories_are_not_touched() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path();
    std::fs::create_dir(dir.join("R1.archive")).unwrap();
    write_with_age(&dir.join("R1.archive").join("R1.backup010101"), days(30));

    let store = LocalBackupStore::new(dir);
    let report = prune_backups(&store, "R1", 7, chrono::Utc::now(), None).await;

    assert!(report.deleted.is_empty());
    assert!(dir.join("R1.archive").join("R1.backup010101").exists());
}

#[tokio::test]
async fn test_missing_directory_is_only_a_warning() {
    let temp_dir = TempDir::new().unwrap();
    let store = LocalBackupStore::new(temp_dir.path().join("gone"));

    let report = prune_backups(&store, "R1", 7, chrono::Utc::now(), None).await;

    assert!(report.deleted.is_empty());
    assert_eq!(report.warnings.len(), 1);
}

use crate::core::{BackupStore, PruneReport, PruneWarning};
use chrono::{DateTime, Duration, Utc};
use std::path::Path;

/// Deletes backups of one device older than `retention_days`.
///
/// Only files whose name starts with `prefix` are considered and `keep`
/// is never removed. Problems become warnings in the report; pruning
/// never fails the run.
pub async fn prune_backups<S: BackupStore>(
    store: &S,
    prefix: &str,
    retention_days: u32,
    now: DateTime<Utc>,
    keep: Option<&Path>,
) -> PruneReport {
    // None when the window reaches past the calendar: nothing is old enough.
    let cutoff = now.checked_sub_signed(Duration::days(i64::from(retention_days)));
    let mut report = PruneReport::default();

    tracing::info!(
        dir = %store.root().display(),
        prefix,
        retention_days,
        "Deleting old backups"
    );

    let (files, warnings) = match store.list_files().await {
        Ok(listing) => listing,
        Err(e) => {
            tracing::warn!(dir = %store.root().display(), error = %e, "Could not list backup directory");
            report.warnings.push(PruneWarning {
                path: store.root().to_path_buf(),
                reason: e.to_string(),
            });
            return report;
        }
    };
    report.warnings.extend(warnings);

    for file in files {
        if !file.name.starts_with(prefix) {
            continue;
        }
        if keep.is_some_and(|kept| kept == file.path.as_path()) {
            report.retained += 1;
            continue;
        }

        let modified = DateTime::<Utc>::from(file.modified);
        if !cutoff.is_some_and(|cutoff| modified < cutoff) {
            report.retained += 1;
            continue;
        }

        match store.remove_file(&file.path).await {
            Ok(()) => {
                tracing::debug!(path = %file.path.display(), %modified, "Deleted old backup");
                report.deleted.push(file.path);
            }
            Err(e) => {
                tracing::warn!(path = %file.path.display(), error = %e, "Error while deleting old backup");
                report.warnings.push(PruneWarning {
                    path: file.path,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        deleted = report.deleted.len(),
        retained = report.retained,
        warnings = report.warnings.len(),
        "Old backups pruned"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StoredFile;
    use crate::utils::error::{BackupError, Result};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;

    #[derive(Clone)]
    struct MockStore {
        root: PathBuf,
        files: Vec<StoredFile>,
        undeletable: Vec<PathBuf>,
        removed: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl MockStore {
        fn new(files: Vec<(&str, i64)>, now: DateTime<Utc>) -> Self {
            let root = PathBuf::from("/backups");
            let files = files
                .into_iter()
                .map(|(name, age_days)| StoredFile {
                    name: name.to_string(),
                    path: root.join(name),
                    modified: SystemTime::from(now - Duration::days(age_days)),
                })
                .collect();
            Self {
                root,
                files,
                undeletable: Vec::new(),
                removed: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn removed(&self) -> Vec<PathBuf> {
            self.removed.lock().unwrap().clone()
        }
    }

    impl BackupStore for MockStore {
        fn root(&self) -> &Path {
            &self.root
        }

        async fn ensure_root(&self) -> Result<()> {
            Ok(())
        }

        async fn list_files(&self) -> Result<(Vec<StoredFile>, Vec<PruneWarning>)> {
            Ok((self.files.clone(), Vec::new()))
        }

        async fn remove_file(&self, path: &Path) -> Result<()> {
            if self.undeletable.iter().any(|p| p == path) {
                return Err(BackupError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                )));
            }
            self.removed.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_prune_deletes_only_expired_files_with_prefix() {
        let now = Utc::now();
        let store = MockStore::new(
            vec![
                ("R1.backup010101", 10),
                ("R1.backup", 1),
                ("R2.backup010101", 30),
                ("old-R1.backup", 30),
            ],
            now,
        );

        let report = prune_backups(&store, "R1", 7, now, None).await;

        assert_eq!(store.removed(), vec![PathBuf::from("/backups/R1.backup010101")]);
        assert_eq!(report.deleted.len(), 1);
        assert_eq!(report.retained, 1);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_prune_never_deletes_kept_artifact() {
        let now = Utc::now();
        let store = MockStore::new(vec![("R1.backup190926", 1)], now);
        let keep = PathBuf::from("/backups/R1.backup190926");

        let report = prune_backups(&store, "R1", 0, now, Some(keep.as_path())).await;

        assert!(store.removed().is_empty());
        assert_eq!(report.retained, 1);
    }

    #[tokio::test]
    async fn test_prune_with_huge_retention_keeps_everything() {
        let now = Utc::now();
        let store = MockStore::new(vec![("R1.backup010101", 3650)], now);

        let report = prune_backups(&store, "R1", u32::MAX, now, None).await;

        assert!(store.removed().is_empty());
        assert_eq!(report.retained, 1);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_prune_failures_become_warnings() {
        let now = Utc::now();
        let mut store = MockStore::new(vec![("R1.backup010101", 10), ("R1.backup020101", 9)], now);
        store.undeletable = vec![PathBuf::from("/backups/R1.backup010101")];

        let report = prune_backups(&store, "R1", 7, now, None).await;

        assert_eq!(report.deleted, vec![PathBuf::from("/backups/R1.backup020101")]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].path, PathBuf::from("/backups/R1.backup010101"));
    }
}

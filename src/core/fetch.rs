use crate::core::{BackupArtifact, DeviceSession};
use crate::utils::error::{BackupError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Sibling file the download is written to before it replaces the target.
pub fn partial_download_path(local_path: &Path) -> PathBuf {
    let mut name = OsString::from(local_path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Downloads the artifact into a `.part` file and renames it over the
/// target once the transfer is complete. A failed transfer leaves any
/// earlier file at the target path untouched.
pub async fn fetch_backup<S: DeviceSession>(
    session: &mut S,
    artifact: &BackupArtifact,
) -> Result<u64> {
    let partial = partial_download_path(&artifact.local_path);
    tracing::info!(
        remote = %artifact.remote_path,
        local = %artifact.local_path.display(),
        "Downloading backup"
    );

    let bytes = match session.download(&artifact.remote_path, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            discard_partial(&partial).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial, &artifact.local_path).await {
        discard_partial(&partial).await;
        return Err(BackupError::TransferError {
            remote_path: artifact.remote_path.clone(),
            local_path: artifact.local_path.display().to_string(),
            message: format!("cannot move completed download into place: {}", e),
        });
    }

    tracing::info!(
        bytes,
        path = %artifact.local_path.display(),
        "Backup downloaded successfully"
    );
    Ok(bytes)
}

async fn discard_partial(partial: &Path) {
    if let Err(e) = tokio::fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(
                path = %partial.display(),
                error = %e,
                "Could not remove partial download"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CommandOutput;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    /// Writes a few bytes locally, then loses the connection.
    struct BrokenTransfer;

    #[async_trait]
    impl DeviceSession for BrokenTransfer {
        async fn exec(&mut self, _command: &str) -> Result<CommandOutput> {
            Ok(CommandOutput::default())
        }

        async fn remote_file_size(&mut self, _path: &str) -> Result<Option<u64>> {
            Ok(None)
        }

        async fn download(&mut self, remote_path: &str, local_path: &Path) -> Result<u64> {
            tokio::fs::write(local_path, b"partial").await?;
            Err(BackupError::TransferError {
                remote_path: remote_path.to_string(),
                local_path: local_path.display().to_string(),
                message: "channel closed".to_string(),
            })
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct WorkingTransfer;

    #[async_trait]
    impl DeviceSession for WorkingTransfer {
        async fn exec(&mut self, _command: &str) -> Result<CommandOutput> {
            Ok(CommandOutput::default())
        }

        async fn remote_file_size(&mut self, _path: &str) -> Result<Option<u64>> {
            Ok(Some(7))
        }

        async fn download(&mut self, _remote_path: &str, local_path: &Path) -> Result<u64> {
            tokio::fs::write(local_path, b"evening").await?;
            Ok(7)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn artifact_in(dir: &Path) -> BackupArtifact {
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        BackupArtifact::new("R1", date, dir)
    }

    #[tokio::test]
    async fn test_failed_fetch_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_in(temp_dir.path());

        let result = fetch_backup(&mut BrokenTransfer, &artifact).await;

        assert!(matches!(result, Err(BackupError::TransferError { .. })));
        assert!(!artifact.local_path.exists());
        assert!(!partial_download_path(&artifact.local_path).exists());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_earlier_same_day_backup_intact() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_in(temp_dir.path());
        std::fs::write(&artifact.local_path, b"morning backup").unwrap();

        assert!(fetch_backup(&mut BrokenTransfer, &artifact).await.is_err());

        assert_eq!(std::fs::read(&artifact.local_path).unwrap(), b"morning backup");
        assert!(!partial_download_path(&artifact.local_path).exists());
    }

    #[tokio::test]
    async fn test_successful_fetch_replaces_earlier_same_day_backup() {
        let temp_dir = TempDir::new().unwrap();
        let artifact = artifact_in(temp_dir.path());
        std::fs::write(&artifact.local_path, b"morning backup").unwrap();

        let bytes = fetch_backup(&mut WorkingTransfer, &artifact).await.unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(std::fs::read(&artifact.local_path).unwrap(), b"evening");
        assert!(!partial_download_path(&artifact.local_path).exists());
    }

    #[test]
    fn test_partial_path_is_a_sibling() {
        assert_eq!(
            partial_download_path(Path::new("/opt/mikrotik_backup/R1.backup030524")),
            PathBuf::from("/opt/mikrotik_backup/R1.backup030524.part")
        );
    }
}

use crate::core::{BackupStore, PruneWarning, StoredFile};
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalBackupStore {
    base_path: PathBuf,
}

impl LocalBackupStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl BackupStore for LocalBackupStore {
    fn root(&self) -> &Path {
        &self.base_path
    }

    async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    async fn list_files(&self) -> Result<(Vec<StoredFile>, Vec<PruneWarning>)> {
        let mut files = Vec::new();
        let mut warnings = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warnings.push(PruneWarning {
                        path,
                        reason: format!("cannot read metadata: {}", e),
                    });
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warnings.push(PruneWarning {
                        path,
                        reason: format!("cannot read modification time: {}", e),
                    });
                    continue;
                }
            };

            // Names that are not valid UTF-8 cannot carry a device prefix.
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            files.push(StoredFile {
                name,
                path,
                modified,
            });
        }

        Ok((files, warnings))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_root_creates_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("a").join("b");
        let store = LocalBackupStore::new(&root);

        store.ensure_root().await.unwrap();

        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_list_files_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("R1.backup010124"), b"data").unwrap();
        std::fs::create_dir(temp_dir.path().join("R1.archive")).unwrap();
        let store = LocalBackupStore::new(temp_dir.path());

        let (files, warnings) = store.list_files().await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "R1.backup010124");
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBackupStore::new(temp_dir.path().join("missing"));
        assert!(store.list_files().await.is_err());
    }
}

use crate::domain::model::{CommandOutput, DeviceTarget, PruneWarning, SettleStrategy, StoredFile};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// An authenticated shell session on one device.
#[async_trait]
pub trait DeviceSession: Send {
    /// Runs `command` and collects its output until the channel closes.
    async fn exec(&mut self, command: &str) -> Result<CommandOutput>;

    /// Size of a remote file, or `None` if it does not exist (yet).
    async fn remote_file_size(&mut self, path: &str) -> Result<Option<u64>>;

    /// Copies a remote file to `local_path` over a file-transfer sub-channel
    /// and returns the number of bytes written.
    async fn download(&mut self, remote_path: &str, local_path: &Path) -> Result<u64>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait DeviceConnector: Send + Sync {
    type Session: DeviceSession;

    async fn connect(&self, target: &DeviceTarget) -> Result<Self::Session>;
}

/// Local directory holding downloaded backups.
pub trait BackupStore: Send + Sync {
    fn root(&self) -> &Path;

    fn ensure_root(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Regular files directly under the root. Entries whose metadata cannot
    /// be read come back as warnings instead of failing the listing.
    fn list_files(
        &self,
    ) -> impl std::future::Future<Output = Result<(Vec<StoredFile>, Vec<PruneWarning>)>> + Send;

    fn remove_file(&self, path: &Path) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn target(&self) -> DeviceTarget;
    fn backup_dir(&self) -> &Path;
    fn retention_days(&self) -> u32;
    fn identity_command(&self) -> &str;
    fn save_command(&self) -> &str;
    fn settle(&self) -> SettleStrategy;
    fn command_timeout(&self) -> Option<Duration>;
}

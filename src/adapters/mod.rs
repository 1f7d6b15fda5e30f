// Adapters layer: concrete implementations of the domain ports.

pub mod host_key;
pub mod ssh;
pub mod storage;

pub use ssh::{SshConnector, SshSession};
pub use storage::LocalBackupStore;

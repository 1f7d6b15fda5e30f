pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{LocalBackupStore, SshConnector};
pub use config::BackupConfig;
pub use core::engine::BackupEngine;
pub use utils::error::{BackupError, Result};

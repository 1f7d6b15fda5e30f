#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::{DeviceTarget, HostKeyPolicy, SettleStrategy};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;
pub const DEFAULT_BACKUP_DIR: &str = "/opt/mikrotik_backup/";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SETTLE_SECS: u64 = 3;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_IDENTITY_COMMAND: &str = "/system identity print";
pub const DEFAULT_SAVE_COMMAND: &str = "/system backup save name={name}";

/// Fully resolved settings for one run.
#[derive(Clone)]
pub struct BackupConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
    pub known_hosts_path: Option<PathBuf>,
    pub backup_dir: PathBuf,
    pub retention_days: u32,
    pub identity_command: String,
    pub save_command: String,
    pub settle: SettleStrategy,
    pub command_timeout: Option<Duration>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts_path: None,
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            retention_days: DEFAULT_RETENTION_DAYS,
            identity_command: DEFAULT_IDENTITY_COMMAND.to_string(),
            save_command: DEFAULT_SAVE_COMMAND.to_string(),
            settle: SettleStrategy::Fixed(Duration::from_secs(DEFAULT_SETTLE_SECS)),
            command_timeout: None,
        }
    }
}

impl fmt::Debug for BackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .field("host_key_policy", &self.host_key_policy)
            .field("known_hosts_path", &self.known_hosts_path)
            .field("backup_dir", &self.backup_dir)
            .field("retention_days", &self.retention_days)
            .field("identity_command", &self.identity_command)
            .field("save_command", &self.save_command)
            .field("settle", &self.settle)
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl ConfigProvider for BackupConfig {
    fn target(&self) -> DeviceTarget {
        DeviceTarget {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            connect_timeout: self.connect_timeout,
        }
    }

    fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn retention_days(&self) -> u32 {
        self.retention_days
    }

    fn identity_command(&self) -> &str {
        &self.identity_command
    }

    fn save_command(&self) -> &str {
        &self.save_command
    }

    fn settle(&self) -> SettleStrategy {
        self.settle
    }

    fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }
}

impl Validate for BackupConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_host("device.host", &self.host)?;
        validation::validate_positive_number("device.port", u64::from(self.port), 1)?;
        validation::validate_non_empty_string("device.username", &self.username)?;
        validation::validate_non_empty_string("device.password", &self.password)?;
        validation::validate_positive_number(
            "device.connect_timeout_secs",
            self.connect_timeout.as_secs(),
            1,
        )?;
        validation::validate_path("backup.directory", &self.backup_dir.to_string_lossy())?;
        validation::validate_non_empty_string("backup.identity_command", &self.identity_command)?;
        validation::validate_contains(
            "backup.save_command",
            &self.save_command,
            crate::core::trigger::NAME_PLACEHOLDER,
        )?;

        if let SettleStrategy::PollStable { interval, .. } = self.settle {
            validation::validate_positive_number(
                "backup.poll_interval_secs",
                interval.as_secs(),
                1,
            )?;
        }

        if let Some(timeout) = self.command_timeout {
            validation::validate_positive_number(
                "backup.command_timeout_secs",
                timeout.as_secs(),
                1,
            )?;
        }

        Ok(())
    }
}

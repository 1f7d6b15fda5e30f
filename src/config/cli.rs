use crate::adapters::host_key::default_known_hosts_path;
use crate::config::toml_config::TomlConfig;
use crate::config::{
    BackupConfig, DEFAULT_BACKUP_DIR, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_IDENTITY_COMMAND,
    DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_RETENTION_DAYS, DEFAULT_SAVE_COMMAND,
    DEFAULT_SETTLE_SECS,
};
use crate::domain::model::{HostKeyPolicy, SettleStrategy};
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Parser)]
#[command(name = "mikrotik-backup")]
#[command(about = "MikroTik backup via SSH/SFTP")]
pub struct CliConfig {
    /// MikroTik IP address
    #[arg(long, required_unless_present = "config")]
    pub ip: Option<String>,

    /// SSH port (default: 22)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSH username
    #[arg(long, required_unless_present = "config")]
    pub user: Option<String>,

    /// SSH password
    #[arg(long, required_unless_present = "config")]
    pub passwd: Option<String>,

    /// Delete backups older than N days (default: 7)
    #[arg(long)]
    pub days: Option<u32>,

    /// Local backup directory (default: /opt/mikrotik_backup/)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Path to a TOML configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Connect timeout in seconds (default: 10)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds to wait after the save command (default: 3)
    #[arg(long)]
    pub settle: Option<u64>,

    /// Poll the remote file size every N seconds until it is stable
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Give up polling after N seconds (default: 60)
    #[arg(long)]
    pub poll_timeout: Option<u64>,

    /// Abort a remote command that runs longer than N seconds
    #[arg(long)]
    pub command_timeout: Option<u64>,

    /// trust-first-use, verify, pinned or accept-any
    #[arg(long)]
    pub host_key_policy: Option<String>,

    /// Expected SHA256 host key fingerprint for the pinned policy
    #[arg(long)]
    pub host_key_fingerprint: Option<String>,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn load_file(&self) -> Result<TomlConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path),
            None => Ok(TomlConfig::default()),
        }
    }

    /// Merges flags over `file` and fills in defaults.
    pub fn resolve_with(&self, file: TomlConfig) -> Result<BackupConfig> {
        let TomlConfig {
            device,
            backup,
            retention,
            ..
        } = file;

        let host = self.ip.clone().or(device.host);
        let username = self.user.clone().or(device.username);
        let password = self.passwd.clone().or(device.password);

        let policy_name = self
            .host_key_policy
            .clone()
            .or(device.host_key_policy)
            .unwrap_or_else(|| HostKeyPolicy::TrustFirstUse.as_str().to_string());
        let fingerprint = self
            .host_key_fingerprint
            .clone()
            .or(device.host_key_fingerprint);

        let settle_delay = Duration::from_secs(
            self.settle
                .or(backup.settle_secs)
                .unwrap_or(DEFAULT_SETTLE_SECS),
        );
        let settle = match self.poll_interval.or(backup.poll_interval_secs) {
            Some(interval) => SettleStrategy::PollStable {
                delay: settle_delay,
                interval: Duration::from_secs(interval),
                timeout: Duration::from_secs(
                    self.poll_timeout
                        .or(backup.poll_timeout_secs)
                        .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS),
                ),
            },
            None => SettleStrategy::Fixed(settle_delay),
        };

        Ok(BackupConfig {
            host: validate_required_field("device.host", &host)?.clone(),
            port: self.port.or(device.port).unwrap_or(DEFAULT_PORT),
            username: validate_required_field("device.username", &username)?.clone(),
            password: validate_required_field("device.password", &password)?.clone(),
            connect_timeout: Duration::from_secs(
                self.timeout
                    .or(device.connect_timeout_secs)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            host_key_policy: HostKeyPolicy::from_name(&policy_name, fingerprint)?,
            known_hosts_path: self
                .known_hosts
                .clone()
                .or(device.known_hosts_path)
                .or_else(default_known_hosts_path),
            backup_dir: self
                .dir
                .clone()
                .or(backup.directory)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            retention_days: self
                .days
                .or(retention.days)
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            identity_command: backup
                .identity_command
                .unwrap_or_else(|| DEFAULT_IDENTITY_COMMAND.to_string()),
            save_command: backup
                .save_command
                .unwrap_or_else(|| DEFAULT_SAVE_COMMAND.to_string()),
            settle,
            command_timeout: self
                .command_timeout
                .or(backup.command_timeout_secs)
                .map(Duration::from_secs),
        })
    }
}

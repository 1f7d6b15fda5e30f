use crate::utils::error::{BackupError, Result};
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Where and how to reach the device.
#[derive(Clone)]
pub struct DeviceTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl fmt::Debug for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// How the SSH server's host key is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept and record unknown hosts, reject changed keys.
    #[default]
    TrustFirstUse,
    /// Host must already be present in known_hosts.
    Verify,
    /// Server key must carry this SHA-256 fingerprint.
    Pinned { fingerprint: String },
    AcceptAny,
}

impl HostKeyPolicy {
    /// Builds a policy from its config name. `pinned` needs a fingerprint.
    pub fn from_name(name: &str, fingerprint: Option<String>) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "trust-first-use" | "tofu" => Ok(HostKeyPolicy::TrustFirstUse),
            "verify" => Ok(HostKeyPolicy::Verify),
            "accept-any" => Ok(HostKeyPolicy::AcceptAny),
            "pinned" => match fingerprint {
                Some(fingerprint) if !fingerprint.trim().is_empty() => {
                    Ok(HostKeyPolicy::Pinned { fingerprint })
                }
                _ => Err(BackupError::MissingConfigError {
                    field: "device.host_key_fingerprint".to_string(),
                }),
            },
            other => Err(BackupError::InvalidConfigValueError {
                field: "device.host_key_policy".to_string(),
                value: other.to_string(),
                reason: "Expected one of: trust-first-use, verify, pinned, accept-any".to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HostKeyPolicy::TrustFirstUse => "trust-first-use",
            HostKeyPolicy::Verify => "verify",
            HostKeyPolicy::Pinned { .. } => "pinned",
            HostKeyPolicy::AcceptAny => "accept-any",
        }
    }
}

/// What to do between issuing the save command and downloading the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    Fixed(Duration),
    /// Wait `delay`, then stat the remote file every `interval` until its
    /// size is non-zero and unchanged between two readings.
    PollStable {
        delay: Duration,
        interval: Duration,
        timeout: Duration,
    },
}

impl SettleStrategy {
    pub fn initial_delay(&self) -> Duration {
        match self {
            SettleStrategy::Fixed(delay) => *delay,
            SettleStrategy::PollStable { delay, .. } => *delay,
        }
    }
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Fixed(Duration::from_secs(3))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Identity as reported by the device, trimmed.
    pub raw: String,
    /// Filesystem-safe form used for every artifact name.
    pub name: String,
}

/// `{dir}/{name}.backup{DDMMYY}`
pub fn local_backup_path(backup_dir: &Path, device_name: &str, date: NaiveDate) -> PathBuf {
    backup_dir.join(format!(
        "{}.backup{}",
        device_name,
        date.format("%d%m%y")
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub device_name: String,
    pub captured_on: NaiveDate,
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl BackupArtifact {
    pub fn new(device_name: &str, captured_on: NaiveDate, backup_dir: &Path) -> Self {
        Self {
            device_name: device_name.to_string(),
            captured_on,
            remote_path: format!("/{}.backup", device_name),
            local_path: local_backup_path(backup_dir, device_name, captured_on),
        }
    }
}

/// A regular file found in the backup directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneWarning {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub deleted: Vec<PathBuf>,
    pub retained: usize,
    pub warnings: Vec<PruneWarning>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub device_name: String,
    pub local_path: PathBuf,
    pub bytes: u64,
    pub prune: PruneReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Connecting,
    Identifying,
    Triggering,
    Transferring,
    Pruning,
    Closed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Connecting => "connecting",
            RunPhase::Identifying => "identifying",
            RunPhase::Triggering => "triggering",
            RunPhase::Transferring => "transferring",
            RunPhase::Pruning => "pruning",
            RunPhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_debug_hides_password() {
        let target = DeviceTarget {
            host: "192.168.88.1".to_string(),
            port: 22,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            connect_timeout: Duration::from_secs(10),
        };
        let rendered = format!("{:?}", target);
        assert!(rendered.contains("192.168.88.1"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_host_key_policy_from_name() {
        assert_eq!(
            HostKeyPolicy::from_name("trust-first-use", None).unwrap(),
            HostKeyPolicy::TrustFirstUse
        );
        assert_eq!(HostKeyPolicy::from_name("Verify", None).unwrap(), HostKeyPolicy::Verify);
        assert!(HostKeyPolicy::from_name("pinned", None).is_err());
        assert_eq!(
            HostKeyPolicy::from_name("pinned", Some("SHA256:abc".to_string())).unwrap(),
            HostKeyPolicy::Pinned {
                fingerprint: "SHA256:abc".to_string()
            }
        );
        assert!(HostKeyPolicy::from_name("yolo", None).is_err());
    }

    #[test]
    fn test_artifact_paths_share_device_name() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let artifact = BackupArtifact::new("R1", date, Path::new("/opt/mikrotik_backup"));
        assert_eq!(artifact.remote_path, "/R1.backup");
        assert_eq!(
            artifact.local_path,
            PathBuf::from("/opt/mikrotik_backup/R1.backup030524")
        );
    }

    #[test]
    fn test_local_backup_path_zero_pads_every_field() {
        let date = NaiveDate::from_ymd_opt(2009, 1, 9).unwrap();
        let path = local_backup_path(Path::new("backups"), "Home_Router", date);
        assert_eq!(path, PathBuf::from("backups/Home_Router.backup090109"));
    }

    #[test]
    fn test_host_key_policy_defaults_to_trust_first_use() {
        assert_eq!(HostKeyPolicy::default(), HostKeyPolicy::TrustFirstUse);
    }
}

//! SSH/SFTP access to the device, built on russh and russh-sftp.

use crate::adapters::host_key::{decide, HostKeyDecision, KnownHostState};
use crate::core::{CommandOutput, DeviceConnector, DeviceSession, DeviceTarget};
use crate::domain::model::HostKeyPolicy;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use russh_sftp::client::SftpSession;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;

const STDERR_STREAM: u32 = 1;

/// russh client handler that applies the configured host key policy.
pub struct HostKeyCheck {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    known_hosts: Option<PathBuf>,
    rejection: Arc<Mutex<Option<String>>>,
}

impl HostKeyCheck {
    fn lookup(&self, key: &PublicKey) -> KnownHostState {
        let Some(path) = &self.known_hosts else {
            return KnownHostState::Unreadable("no known_hosts path configured".to_string());
        };
        match russh_keys::check_known_hosts_path(&self.host, self.port, key, path) {
            Ok(true) => KnownHostState::Match,
            Ok(false) => KnownHostState::Unknown,
            Err(russh_keys::Error::KeyChanged { line }) => KnownHostState::Changed { line },
            Err(e) => KnownHostState::Unreadable(e.to_string()),
        }
    }

    fn learn(&self, key: &PublicKey) {
        let Some(path) = &self.known_hosts else {
            return;
        };
        match russh_keys::learn_known_hosts_path(&self.host, self.port, key, path) {
            Ok(()) => tracing::info!(path = %path.display(), "Recorded new host key"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Could not record host key"),
        }
    }
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        let known = match self.policy {
            HostKeyPolicy::TrustFirstUse | HostKeyPolicy::Verify => self.lookup(server_public_key),
            HostKeyPolicy::Pinned { .. } | HostKeyPolicy::AcceptAny => KnownHostState::Unknown,
        };

        match decide(&self.policy, &fingerprint, known) {
            HostKeyDecision::Accept => {
                if self.policy == HostKeyPolicy::AcceptAny {
                    tracing::warn!(fingerprint = %fingerprint, "Accepting host key without verification");
                }
                Ok(true)
            }
            HostKeyDecision::AcceptAndLearn => {
                tracing::info!(fingerprint = %fingerprint, "Trusting host key on first use");
                self.learn(server_public_key);
                Ok(true)
            }
            HostKeyDecision::Reject(reason) => {
                tracing::error!(fingerprint = %fingerprint, %reason, "Host key rejected");
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(reason);
                }
                Ok(false)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SshConnector {
    policy: HostKeyPolicy,
    known_hosts: Option<PathBuf>,
}

impl SshConnector {
    pub fn new(policy: HostKeyPolicy, known_hosts: Option<PathBuf>) -> Self {
        Self {
            policy,
            known_hosts,
        }
    }
}

#[async_trait]
impl DeviceConnector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, target: &DeviceTarget) -> Result<SshSession> {
        let fail = |message: String| BackupError::ConnectionError {
            host: target.host.clone(),
            port: target.port,
            message,
        };

        let rejection = Arc::new(Mutex::new(None));
        let handler = HostKeyCheck {
            host: target.host.clone(),
            port: target.port,
            policy: self.policy.clone(),
            known_hosts: self.known_hosts.clone(),
            rejection: Arc::clone(&rejection),
        };

        tracing::info!(
            host = %target.host,
            port = target.port,
            policy = self.policy.as_str(),
            "Connecting to MikroTik"
        );

        let attempt = async {
            let config = Arc::new(client::Config::default());
            let mut handle = client::connect(config, (target.host.as_str(), target.port), handler)
                .await
                .map_err(|e| {
                    let rejected = rejection.lock().ok().and_then(|slot| slot.clone());
                    fail(rejected.unwrap_or_else(|| e.to_string()))
                })?;

            // Only password auth: no keys, no agent.
            let authenticated = handle
                .authenticate_password(target.username.clone(), target.password.clone())
                .await
                .map_err(|e| fail(e.to_string()))?;
            if !authenticated {
                return Err(fail(format!(
                    "authentication rejected for user '{}'",
                    target.username
                )));
            }
            Ok(handle)
        };

        let handle = tokio::time::timeout(target.connect_timeout, attempt)
            .await
            .map_err(|_| fail(format!("timed out after {:?}", target.connect_timeout)))??;

        Ok(SshSession {
            handle,
            host: target.host.clone(),
            port: target.port,
        })
    }
}

/// Stat failures happen while the save command is still settling, so they
/// are reported against the remote command rather than the transfer.
fn poll_error(path: &str, message: &str) -> BackupError {
    BackupError::RemoteCommandError {
        command: format!("stat {}", path),
        output: format!("cannot open SFTP session: {}", message),
    }
}

pub struct SshSession {
    handle: Handle<HostKeyCheck>,
    host: String,
    port: u16,
}

impl SshSession {
    /// The SFTP sub-channel lives as long as the returned value.
    async fn open_sftp(&self) -> std::result::Result<SftpSession, String> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| e.to_string())?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| e.to_string())?;
        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl DeviceSession for SshSession {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let remote_err = |e: russh::Error| BackupError::RemoteCommandError {
            command: command.to_string(),
            output: e.to_string(),
        };

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(remote_err)?;
        channel.exec(true, command).await.map_err(remote_err)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data, .. } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext, .. } if ext == STDERR_STREAM => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status: code, .. } => exit_status = Some(code),
                _ => {}
            }
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
        })
    }

    async fn remote_file_size(&mut self, path: &str) -> Result<Option<u64>> {
        let sftp = self
            .open_sftp()
            .await
            .map_err(|message| poll_error(path, &message))?;

        match sftp.metadata(path).await {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(e) => {
                tracing::debug!(path, error = %e, "Remote file not available yet");
                Ok(None)
            }
        }
    }

    async fn download(&mut self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let transfer_err = |message: String| BackupError::TransferError {
            remote_path: remote_path.to_string(),
            local_path: local_path.display().to_string(),
            message,
        };

        tracing::debug!("Opening SFTP session");
        let sftp = self
            .open_sftp()
            .await
            .map_err(|e| transfer_err(format!("cannot open SFTP session: {}", e)))?;

        let mut remote = sftp
            .open(remote_path)
            .await
            .map_err(|e| transfer_err(format!("cannot open remote file: {}", e)))?;
        let mut local = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| transfer_err(format!("cannot create local file: {}", e)))?;

        let bytes = tokio::io::copy(&mut remote, &mut local)
            .await
            .map_err(|e| transfer_err(e.to_string()))?;
        local
            .flush()
            .await
            .map_err(|e| transfer_err(e.to_string()))?;

        Ok(bytes)
    }

    async fn close(&mut self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
            .map_err(|e| BackupError::ConnectionError {
                host: self.host.clone(),
                port: self.port,
                message: format!("disconnect failed: {}", e),
            })
    }
}

use crate::core::command::run_command;
use crate::core::{DeviceIdentity, DeviceSession, SettleStrategy};
use crate::utils::error::{BackupError, Result};
use std::time::Duration;
use tokio::time::Instant;

pub const NAME_PLACEHOLDER: &str = "{name}";

pub fn render_save_command(template: &str, device_name: &str) -> String {
    template.replace(NAME_PLACEHOLDER, device_name)
}

/// Issues the save command and waits until the device has had time to
/// write the backup file.
///
/// The device writes the file after the shell command returns, so a
/// non-empty stderr is only checked once the initial settle delay is over.
pub async fn trigger_backup<S: DeviceSession>(
    session: &mut S,
    identity: &DeviceIdentity,
    save_template: &str,
    settle: SettleStrategy,
    command_timeout: Option<Duration>,
) -> Result<()> {
    let command = render_save_command(save_template, &identity.name);
    tracing::info!(device = %identity.name, "Sending backup command");

    let output = run_command(session, &command, command_timeout).await?;

    let delay = settle.initial_delay();
    tracing::debug!(?delay, "Waiting for the device to write the backup");
    tokio::time::sleep(delay).await;

    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return Err(BackupError::RemoteCommandError {
            command,
            output: stderr.to_string(),
        });
    }

    if let SettleStrategy::PollStable {
        interval, timeout, ..
    } = settle
    {
        let remote_path = format!("/{}.backup", identity.name);
        wait_for_stable_size(session, &command, &remote_path, interval, timeout).await?;
    }

    tracing::info!("Backup command executed successfully");
    Ok(())
}

async fn wait_for_stable_size<S: DeviceSession>(
    session: &mut S,
    command: &str,
    remote_path: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut previous: Option<u64> = None;

    loop {
        let current = session.remote_file_size(remote_path).await?;
        tracing::debug!(path = remote_path, size = ?current, "Polled remote backup size");

        match (previous, current) {
            (Some(before), Some(now)) if before == now && now > 0 => return Ok(()),
            _ => previous = current,
        }

        if Instant::now() + interval > deadline {
            return Err(BackupError::RemoteCommandError {
                command: command.to_string(),
                output: format!(
                    "{} did not reach a stable size within {:?}",
                    remote_path, timeout
                ),
            });
        }
        tokio::time::sleep(interval).await;
    }
}

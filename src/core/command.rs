use crate::core::{CommandOutput, DeviceSession};
use crate::utils::error::{BackupError, Result};
use std::time::Duration;

/// Runs a remote command, optionally bounded by `timeout`.
pub async fn run_command<S: DeviceSession>(
    session: &mut S,
    command: &str,
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    tracing::debug!(command, "Executing remote command");

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, session.exec(command))
            .await
            .map_err(|_| BackupError::RemoteCommandError {
                command: command.to_string(),
                output: format!("no reply within {:?}", limit),
            })??,
        None => session.exec(command).await?,
    };

    tracing::debug!(
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        exit_status = ?output.exit_status,
        "Remote command finished"
    );
    Ok(output)
}

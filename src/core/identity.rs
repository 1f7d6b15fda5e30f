use crate::core::command::run_command;
use crate::core::{DeviceIdentity, DeviceSession};
use crate::utils::error::{BackupError, Result};
use std::time::Duration;

const NAME_MARKER: &str = "name:";

/// Asks the device for its identity and parses the reply.
pub async fn resolve_identity<S: DeviceSession>(
    session: &mut S,
    command: &str,
    timeout: Option<Duration>,
) -> Result<DeviceIdentity> {
    let output = run_command(session, command, timeout).await?;
    let identity = parse_identity(&output.stdout)?;
    tracing::info!(identity = %identity.raw, device = %identity.name, "Resolved device identity");
    Ok(identity)
}

/// Takes the text after `name:` on the first line that contains it.
///
/// The result is trimmed and then sanitized for use in file names.
pub fn parse_identity(reply: &str) -> Result<DeviceIdentity> {
    let raw = reply
        .lines()
        .find_map(|line| {
            line.find(NAME_MARKER)
                .map(|idx| line[idx + NAME_MARKER.len()..].trim().to_string())
        })
        .ok_or_else(|| BackupError::IdentityParseError {
            message: format!("no line containing '{}' in identity output", NAME_MARKER),
        })?;

    if raw.is_empty() {
        return Err(BackupError::IdentityParseError {
            message: "identity name is empty".to_string(),
        });
    }

    let name = sanitize_device_name(&raw);
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(BackupError::IdentityParseError {
            message: format!("identity '{}' cannot be used as a file name", raw),
        });
    }

    Ok(DeviceIdentity { raw, name })
}

pub fn sanitize_device_name(raw: &str) -> String {
    raw.replace(' ', "_")
}

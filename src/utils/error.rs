use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Connection to {host}:{port} failed: {message}")]
    ConnectionError {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Could not resolve device identity: {message}")]
    IdentityParseError { message: String },

    #[error("Device rejected `{command}`: {output}")]
    RemoteCommandError { command: String, output: String },

    #[error("Transfer of {remote_path} to {local_path} failed: {message}")]
    TransferError {
        remote_path: String,
        local_path: String,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connection,
    Device,
    Transfer,
    LocalStorage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BackupError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BackupError::ConnectionError { .. } => ErrorCategory::Connection,
            BackupError::IdentityParseError { .. } | BackupError::RemoteCommandError { .. } => {
                ErrorCategory::Device
            }
            BackupError::TransferError { .. } => ErrorCategory::Transfer,
            BackupError::IoError(_) => ErrorCategory::LocalStorage,
            BackupError::ConfigError { .. }
            | BackupError::MissingConfigError { .. }
            | BackupError::InvalidConfigValueError { .. }
            | BackupError::ConfigValidationError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Connection => ErrorSeverity::Medium,
            ErrorCategory::Device | ErrorCategory::Transfer => ErrorSeverity::High,
            ErrorCategory::LocalStorage => ErrorSeverity::Critical,
        }
    }

    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            BackupError::ConnectionError { .. } => 10,
            BackupError::IdentityParseError { .. } => 11,
            BackupError::RemoteCommandError { .. } => 12,
            BackupError::TransferError { .. } => 13,
            _ => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BackupError::ConnectionError { host, port, .. } => {
                format!("Could not open an SSH session to {}:{}", host, port)
            }
            BackupError::IdentityParseError { .. } => {
                "The device did not report a usable identity name".to_string()
            }
            BackupError::RemoteCommandError { output, .. } => {
                format!("The device reported an error: {}", output)
            }
            BackupError::TransferError { remote_path, .. } => {
                format!("Downloading {} from the device failed", remote_path)
            }
            BackupError::IoError(e) => format!("Local filesystem error: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the command line flags and the config file",
            ErrorCategory::Connection => {
                "Check that the device is reachable, the SSH service is enabled and the credentials are correct"
            }
            ErrorCategory::Device => {
                "Check that the user has the policies needed to run the identity and backup commands"
            }
            ErrorCategory::Transfer => {
                "Check free space and permissions on the backup directory, and that SFTP is enabled on the device"
            }
            ErrorCategory::LocalStorage => "Check permissions on the backup directory",
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

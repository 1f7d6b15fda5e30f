pub mod command;
pub mod engine;
pub mod fetch;
pub mod identity;
pub mod prune;
pub mod trigger;

pub use crate::domain::model::{
    BackupArtifact, CommandOutput, DeviceIdentity, DeviceTarget, PruneReport, PruneWarning,
    RunPhase, RunReport, SettleStrategy, StoredFile,
};
pub use crate::domain::ports::{BackupStore, ConfigProvider, DeviceConnector, DeviceSession};
pub use crate::utils::error::Result;

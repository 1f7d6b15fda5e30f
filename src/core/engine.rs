use crate::core::fetch::fetch_backup;
use crate::core::identity::resolve_identity;
use crate::core::prune::prune_backups;
use crate::core::trigger::trigger_backup;
use crate::core::{
    BackupArtifact, BackupStore, ConfigProvider, DeviceConnector, DeviceSession, RunPhase,
    RunReport,
};
use crate::utils::error::Result;
use tracing::Instrument;

/// Runs one backup cycle: connect, identify, trigger, transfer, prune.
///
/// Once a session is open it is closed on every path, and the first fatal
/// error is returned after the close.
pub struct BackupEngine<D: DeviceConnector, S: BackupStore, C: ConfigProvider> {
    connector: D,
    store: S,
    config: C,
}

impl<D: DeviceConnector, S: BackupStore, C: ConfigProvider> BackupEngine<D, S, C> {
    pub fn new(connector: D, store: S, config: C) -> Self {
        Self {
            connector,
            store,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let target = self.config.target();
        let span = tracing::info_span!(
            "backup_run",
            host = %target.host,
            port = target.port,
            device = tracing::field::Empty
        );

        async move {
            self.store.ensure_root().await?;

            tracing::info!(phase = %RunPhase::Connecting, "Connecting to device");
            let mut session = self.connector.connect(&target).await?;
            tracing::info!("Connected via SSH");

            let mut phase = RunPhase::Identifying;
            let result = self.run_steps(&mut session, &mut phase).await;
            if let Err(e) = &result {
                tracing::error!(%phase, error = %e, "Backup run aborted");
            }

            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "Error while closing SSH session");
            }
            tracing::info!(phase = %RunPhase::Closed, "SSH connection closed");

            result
        }
        .instrument(span)
        .await
    }

    async fn run_steps(&self, session: &mut D::Session, phase: &mut RunPhase) -> Result<RunReport> {
        let timeout = self.config.command_timeout();

        *phase = RunPhase::Identifying;
        tracing::info!(phase = %RunPhase::Identifying, "Querying device identity");
        let identity = resolve_identity(session, self.config.identity_command(), timeout).await?;
        tracing::Span::current().record("device", identity.name.as_str());

        let artifact = BackupArtifact::new(
            &identity.name,
            chrono::Local::now().date_naive(),
            self.store.root(),
        );
        tracing::info!(path = %artifact.local_path.display(), "Save file to");

        *phase = RunPhase::Triggering;
        trigger_backup(
            session,
            &identity,
            self.config.save_command(),
            self.config.settle(),
            timeout,
        )
        .await?;

        *phase = RunPhase::Transferring;
        let bytes = fetch_backup(session, &artifact).await?;

        *phase = RunPhase::Pruning;
        let prune = prune_backups(
            &self.store,
            &identity.name,
            self.config.retention_days(),
            chrono::Utc::now(),
            Some(artifact.local_path.as_path()),
        )
        .await;

        Ok(RunReport {
            device_name: identity.name,
            local_path: artifact.local_path,
            bytes,
            prune,
        })
    }
}

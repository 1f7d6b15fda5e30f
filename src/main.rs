use anyhow::Context;
use clap::Parser;
use mikrotik_backup::core::ConfigProvider;
use mikrotik_backup::utils::{logger, validation::Validate};
use mikrotik_backup::{BackupEngine, CliConfig, LocalBackupStore, SshConnector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let file = cli.load_file().with_context(|| {
        format!(
            "failed to load config file '{}'",
            cli.config
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )
    })?;

    // 初始化日誌
    let verbose = cli.verbose || file.logging.verbose.unwrap_or(false);
    if cli.json_logs || file.logging.json.unwrap_or(false) {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting mikrotik-backup");

    let config = match cli.resolve_with(file).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            tracing::error!("Suggestion: {}", e.recovery_suggestion());
            eprintln!("[!] ERROR: {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    tracing::debug!("Resolved config: {:?}", config);

    let connector = SshConnector::new(
        config.host_key_policy.clone(),
        config.known_hosts_path.clone(),
    );
    let store = LocalBackupStore::new(config.backup_dir().to_path_buf());
    let engine = BackupEngine::new(connector, store, config);

    match engine.run().await {
        Ok(report) => {
            for warning in &report.prune.warnings {
                eprintln!(
                    "[!] Could not prune {}: {}",
                    warning.path.display(),
                    warning.reason
                );
            }
            println!(
                "[✓] Backup downloaded successfully to: {} ({} bytes)",
                report.local_path.display(),
                report.bytes
            );
            println!(
                "[✓] Old backups deleted: {}",
                report.prune.deleted.len()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "Backup failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("[!] ERROR: {}", e.user_friendly_message());
            eprintln!("[!] Suggestion: {}", e.recovery_suggestion());

            // 依錯誤種類決定退出碼
            std::process::exit(e.exit_code());
        }
    }
}

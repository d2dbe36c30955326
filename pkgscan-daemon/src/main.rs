use anyhow::Result;
use clap::Parser;

use pkgscan_core::PkgscanConfig;
use pkgscan_daemon::cli::DaemonCli;
use pkgscan_daemon::{daemon, logging, server};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = PkgscanConfig::load_or_default(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {e}", cli.config.display()))?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "pkgscan-daemon starting");

    daemon::run(
        config,
        |addr| println!("{addr}"),
        async {
            match server::wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
            }
        },
    )
    .await
}

//! Daemon assembly and lifecycle.
//!
//! # Startup Order
//!
//! 1. Metrics recorder (when enabled)
//! 2. Container runtime detection (once; absence only fails container/image scans)
//! 3. NFS/tmpfs mount discovery (once)
//! 4. Console client, SBOM generator, worker pool
//! 5. Listener bind, then the bound address is printed on stdout
//!
//! # Shutdown Order
//!
//! 1. Stop accepting calls and drain in-flight RPCs
//! 2. Wait for running scans, drop queued ones

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use pkgscan_container_runtime::{ContainerRuntime, detect};
use pkgscan_core::PkgscanConfig;
use pkgscan_sbom::{
    ConsoleClient, SbomConfig, SbomGenerator, SbomGeneratorBuilder, discover_mounts,
};

use crate::metrics_server;
use crate::pool::WorkerPool;
use crate::server::{BoundListener, ListenAddr, serve};
use crate::service::PackageScannerService;

/// Production generator type.
pub type Generator = SbomGenerator<ContainerRuntime, ConsoleClient>;

/// Build the SBOM generator from configuration.
///
/// Runtime detection and mount discovery happen here, once per process.
pub async fn build_generator(config: &PkgscanConfig) -> Result<Generator> {
    let sbom_config = SbomConfig::from_core(config);
    let mut builder = SbomGeneratorBuilder::new().config(sbom_config.clone());

    match detect(&config.runtime).await {
        Ok(runtime) => builder = builder.runtime(Arc::new(runtime)),
        Err(e) => warn!(error = %e, "container runtime not detected, container and image scans will fail"),
    }

    if sbom_config.detect_mounts {
        builder = builder.mounts(discover_mounts().await);
    }

    if config.console.is_configured() {
        let console = ConsoleClient::new(&config.console)
            .map_err(|e| anyhow::anyhow!("failed to build console client: {e}"))?;
        builder = builder.console(Arc::new(console));
    } else {
        warn!("console.url is not set, service scans will fail to report");
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build sbom generator: {e}"))
}

/// Run the daemon until `shutdown` resolves.
///
/// `on_bound` receives the bound listener address before serving starts.
pub async fn run<F>(config: PkgscanConfig, on_bound: impl FnOnce(&str), shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;
    let addr = ListenAddr::from_config(&config.server)?;

    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let generator = build_generator(&config).await?;
    let pool = WorkerPool::start(config.server.effective_concurrency(), Arc::new(generator));
    let service = PackageScannerService::new(pool.handle());

    let listener = BoundListener::bind(&addr).await?;
    let bound = listener.local_addr()?;
    on_bound(&bound);
    info!(listen = %bound, workers = pool.size(), "server listening");

    let served = serve(listener, service, shutdown).await;

    let dropped = pool.shutdown().await;
    info!(dropped, "pkgscan-daemon exiting gracefully");
    served
}

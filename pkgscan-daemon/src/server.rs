//! gRPC listener binding and serving.
//!
//! Exactly one of `server.port` (TCP on `0.0.0.0`) and `server.socket_path`
//! (Unix domain socket) must be set. The server drains in-flight calls when
//! the shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use tokio::net::{TcpListener, UnixListener};
use tokio_stream::wrappers::{TcpListenerStream, UnixListenerStream};
use tonic::transport::Server;
use tracing::info;

use pkgscan_api::PackageScannerServer;
use pkgscan_core::config::ServerConfig;

use crate::service::PackageScannerService;

/// Where the service listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl ListenAddr {
    /// Resolve the listener from `[server]`.
    ///
    /// # Errors
    ///
    /// Neither or both of `port` and `socket_path` set, or a malformed port.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        match (config.port.is_empty(), config.socket_path.is_empty()) {
            (false, true) => {
                let port: u16 = config
                    .port
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid server.port '{}': {e}", config.port))?;
                Ok(Self::Tcp(SocketAddr::from(([0, 0, 0, 0], port))))
            }
            (true, false) => Ok(Self::Unix(PathBuf::from(&config.socket_path))),
            (true, true) => Err(anyhow::anyhow!(
                "server mode requires either server.socket_path or server.port to be set"
            )),
            (false, false) => Err(anyhow::anyhow!(
                "server.port and server.socket_path are mutually exclusive"
            )),
        }
    }
}

/// A bound listener, ready to serve.
#[derive(Debug)]
pub enum BoundListener {
    Tcp(TcpListener),
    Unix(UnixListener, PathBuf),
}

impl BoundListener {
    /// Bind the listener. A stale socket file at the Unix path is replaced.
    pub async fn bind(addr: &ListenAddr) -> Result<Self> {
        match addr {
            ListenAddr::Tcp(addr) => {
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to bind {addr}: {e}"))?;
                Ok(Self::Tcp(listener))
            }
            ListenAddr::Unix(path) => {
                match tokio::fs::remove_file(path).await {
                    Ok(()) => info!(path = %path.display(), "removed stale socket"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(anyhow::anyhow!(
                            "failed to remove stale socket {}: {e}",
                            path.display()
                        ));
                    }
                }
                let listener = UnixListener::bind(path)
                    .map_err(|e| anyhow::anyhow!("failed to bind {}: {e}", path.display()))?;
                Ok(Self::Unix(listener, path.clone()))
            }
        }
    }

    /// Printable bound address (the resolved port for TCP).
    pub fn local_addr(&self) -> Result<String> {
        match self {
            Self::Tcp(listener) => Ok(listener.local_addr()?.to_string()),
            Self::Unix(_, path) => Ok(path.display().to_string()),
        }
    }
}

/// Serve the scanner service until `shutdown` resolves, then drain in-flight calls.
pub async fn serve<F>(
    listener: BoundListener,
    service: PackageScannerService,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let router = Server::builder().add_service(PackageScannerServer::new(service));
    let result = match listener {
        BoundListener::Tcp(listener) => {
            router
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
                .await
        }
        BoundListener::Unix(listener, path) => {
            let result = router
                .serve_with_incoming_shutdown(UnixListenerStream::new(listener), shutdown)
                .await;
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!(path = %path.display(), error = %e, "socket cleanup skipped");
            }
            result
        }
    };
    result.map_err(|e| anyhow::anyhow!("grpc server error: {e}"))
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {e}"))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

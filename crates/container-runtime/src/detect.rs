//! Runtime auto-detection.
//!
//! Probes the control sockets of Docker, containerd and CRI-O in that order
//! and returns the first runtime whose socket exists. Called once at process
//! start; the result is shared by every scan.

use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use pkgscan_core::config::RuntimeConfig;
use tracing::{debug, info};

use crate::cli::{ContainerdRuntime, CrioRuntime};
use crate::docker::DockerRuntime;
use crate::error::RuntimeError;
use crate::runtime::{ContainerRuntime, RuntimeKind};

/// Returns `true` if `path` exists and is a Unix socket.
async fn is_socket(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    match tokio::fs::metadata(Path::new(path)).await {
        Ok(meta) => meta.file_type().is_socket(),
        Err(_) => false,
    }
}

/// Probe order. The first socket found wins.
fn probe_order(config: &RuntimeConfig) -> [(RuntimeKind, &str); 3] {
    [
        (RuntimeKind::Docker, config.docker_socket.as_str()),
        (RuntimeKind::Containerd, config.containerd_socket.as_str()),
        (RuntimeKind::Crio, config.crio_socket.as_str()),
    ]
}

/// Detects the container runtime available on this host.
///
/// # Errors
///
/// - `RuntimeError::NotDetected`: none of the configured sockets exist
/// - `RuntimeError::Connection`: the Docker client could not be built
pub async fn detect(config: &RuntimeConfig) -> Result<ContainerRuntime, RuntimeError> {
    let probes = probe_order(config);
    for (kind, socket) in probes {
        if !is_socket(socket).await {
            debug!(runtime = %kind, socket, "runtime socket not found");
            continue;
        }
        info!(runtime = %kind, socket, "container runtime detected");
        let runtime = match kind {
            RuntimeKind::Docker => ContainerRuntime::Docker(DockerRuntime::connect_with_socket(socket)?),
            RuntimeKind::Containerd => ContainerRuntime::Containerd(ContainerdRuntime::new(
                socket,
                config.containerd_image_namespace.as_str(),
            )),
            RuntimeKind::Crio => ContainerRuntime::Crio(CrioRuntime::new()),
        };
        return Ok(runtime);
    }

    let probed = probes
        .iter()
        .map(|(_, socket)| *socket)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    Err(RuntimeError::NotDetected { probed })
}

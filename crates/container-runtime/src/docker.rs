//! Docker backend built on `bollard`.
//!
//! Exports and image saves stream the daemon's tar response straight into the
//! destination file, so nothing is buffered in memory.
//!
//! # Examples
//!
//! ```ignore
//! use std::path::Path;
//! use pkgscan_container_runtime::{DockerRuntime, RuntimeOps};
//!
//! let docker = DockerRuntime::connect_with_socket("/var/run/docker.sock")?;
//! docker.export_filesystem("web", "default", Path::new("/tmp/web.tar")).await?;
//! # Ok::<(), pkgscan_container_runtime::RuntimeError>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::RuntimeError;
use crate::runtime::{RuntimeKind, RuntimeOps, validate_identifier};

/// Connection timeout for the Docker socket, in seconds.
const DOCKER_TIMEOUT_SECS: u64 = 120;

/// Docker runtime backend.
///
/// Internally uses `Arc<bollard::Docker>` for sharing across scan workers.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Arc<bollard::Docker>,
}

impl DockerRuntime {
    /// Connects to Docker using a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Connection` if the client cannot be built.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, RuntimeError> {
        let docker = bollard::Docker::connect_with_socket(
            socket_path,
            DOCKER_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            RuntimeError::Connection(format!("failed to connect to docker at {socket_path}: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

impl RuntimeOps for DockerRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Docker
    }

    async fn export_filesystem(
        &self,
        key: &str,
        _namespace: &str,
        tar_path: &Path,
    ) -> Result<(), RuntimeError> {
        validate_identifier(key)?;
        debug!(container = key, path = %tar_path.display(), "exporting container via docker");

        let stream = self.docker.export_container(key);
        write_stream(stream, tar_path).await.map_err(|reason| RuntimeError::Export {
            key: key.to_owned(),
            reason,
        })
    }

    async fn save_image(&self, image: &str, tar_path: &Path) -> Result<(), RuntimeError> {
        validate_identifier(image)?;
        debug!(image, path = %tar_path.display(), "saving image via docker");

        let stream = self.docker.export_image(image);
        write_stream(stream, tar_path).await.map_err(|reason| RuntimeError::Save {
            image: image.to_owned(),
            reason,
        })
    }
}

/// Drains a byte stream into `path`. Errors are returned as diagnostic text.
async fn write_stream<S, B>(stream: S, path: &Path) -> Result<(), String>
where
    S: Stream<Item = Result<B, bollard::errors::Error>>,
    B: AsRef<[u8]>,
{
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| format!("create {}: {e}", path.display()))?;

    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        file.write_all(chunk.as_ref())
            .await
            .map_err(|e| format!("write {}: {e}", path.display()))?;
    }
    file.flush()
        .await
        .map_err(|e| format!("flush {}: {e}", path.display()))?;
    Ok(())
}

//! Runtime capability interface.
//!
//! Every supported runtime offers the same two operations: export a
//! container's root filesystem as a tarball and save an image as an archive.
//! [`ContainerRuntime`] is the closed set of backends, chosen once by
//! [`detect`](crate::detect::detect) at process start.
//!
//! # Architecture
//!
//! ```text
//!        ┌─────────────────┐
//!        │ ContainerRuntime │  (RuntimeOps)
//!        └────────┬────────┘
//!       ┌─────────┼──────────┐
//!       ▼         ▼          ▼
//!   ┌──────┐ ┌──────────┐ ┌──────┐
//!   │Docker│ │Containerd│ │ CRI-O│
//!   └──┬───┘ └────┬─────┘ └──┬───┘
//!      │          │          │
//!   bollard    nerdctl     podman
//! ```

use std::fmt;
use std::future::Future;
use std::path::Path;

use crate::cli::{ContainerdRuntime, CrioRuntime};
use crate::docker::DockerRuntime;
use crate::error::RuntimeError;

/// Which runtime family a backend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    Docker,
    Containerd,
    Crio,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Containerd => "containerd",
            Self::Crio => "cri-o",
        }
    }

    /// Archive scheme the cataloging tool expects for an image saved by this
    /// runtime, or `None` when the tool can read the runtime's image store directly.
    pub fn archive_scheme(&self) -> Option<&'static str> {
        match self {
            Self::Docker => None,
            Self::Containerd => Some("oci-archive"),
            Self::Crio => Some("docker-archive"),
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations every container runtime backend provides.
///
/// The trait is `Send + Sync + 'static` so a single detected runtime can be
/// shared by all scan workers.
///
/// # Identifier Validation
///
/// Implementations validate container keys and image references with
/// [`validate_identifier`] before handing them to a runtime, so a request
/// cannot smuggle extra flags into a runtime CLI.
pub trait RuntimeOps: Send + Sync + 'static {
    /// Runtime family of this backend.
    fn kind(&self) -> RuntimeKind;

    /// Exports the root filesystem of a container into `tar_path`.
    ///
    /// # Arguments
    ///
    /// - `key`: container ID (cluster workloads) or container name
    /// - `namespace`: runtime namespace; empty for cluster workloads
    /// - `tar_path`: destination tarball, created or truncated
    ///
    /// # Errors
    ///
    /// - `RuntimeError::InvalidIdentifier`: key rejected before any runtime call
    /// - `RuntimeError::Export`: the runtime refused or failed; carries its diagnostic
    fn export_filesystem(
        &self,
        key: &str,
        namespace: &str,
        tar_path: &Path,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;

    /// Saves an image into an archive at `tar_path`.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::InvalidIdentifier`: image reference rejected
    /// - `RuntimeError::Save`: the runtime failed to save the image
    fn save_image(
        &self,
        image: &str,
        tar_path: &Path,
    ) -> impl Future<Output = Result<(), RuntimeError>> + Send;
}

/// The detected container runtime.
pub enum ContainerRuntime {
    Docker(DockerRuntime),
    Containerd(ContainerdRuntime),
    Crio(CrioRuntime),
}

impl fmt::Debug for ContainerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContainerRuntime").field(&self.kind()).finish()
    }
}

impl RuntimeOps for ContainerRuntime {
    fn kind(&self) -> RuntimeKind {
        match self {
            Self::Docker(_) => RuntimeKind::Docker,
            Self::Containerd(_) => RuntimeKind::Containerd,
            Self::Crio(_) => RuntimeKind::Crio,
        }
    }

    async fn export_filesystem(
        &self,
        key: &str,
        namespace: &str,
        tar_path: &Path,
    ) -> Result<(), RuntimeError> {
        match self {
            Self::Docker(rt) => rt.export_filesystem(key, namespace, tar_path).await,
            Self::Containerd(rt) => rt.export_filesystem(key, namespace, tar_path).await,
            Self::Crio(rt) => rt.export_filesystem(key, namespace, tar_path).await,
        }
    }

    async fn save_image(&self, image: &str, tar_path: &Path) -> Result<(), RuntimeError> {
        match self {
            Self::Docker(rt) => rt.save_image(image, tar_path).await,
            Self::Containerd(rt) => rt.save_image(image, tar_path).await,
            Self::Crio(rt) => rt.save_image(image, tar_path).await,
        }
    }
}

/// Maximum accepted identifier length (image references can be long).
const MAX_IDENTIFIER_LEN: usize = 512;

/// Validates a container key or image reference.
///
/// Accepts the characters that appear in container IDs, container names
/// and image references (`registry:5000/ns/app:tag@sha256:...`). Rejects
/// empty values, a leading `-`, and anything else.
pub fn validate_identifier(id: &str) -> Result<(), RuntimeError> {
    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN || id.starts_with('-') {
        return Err(RuntimeError::InvalidIdentifier(id.to_owned()));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "._-:/@+".contains(c);
    if !id.chars().all(allowed) {
        return Err(RuntimeError::InvalidIdentifier(id.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_scheme_per_runtime() {
        assert_eq!(RuntimeKind::Docker.archive_scheme(), None);
        assert_eq!(RuntimeKind::Containerd.archive_scheme(), Some("oci-archive"));
        assert_eq!(RuntimeKind::Crio.archive_scheme(), Some("docker-archive"));
    }

    #[test]
    fn accepts_common_identifiers() {
        for id in [
            "abc123def456",
            "web-server_1",
            "nginx:1.25",
            "registry.local:5000/team/app:v1.2.3",
            "alpine@sha256:0123456789abcdef",
        ] {
            assert!(validate_identifier(id).is_ok(), "{id} should be accepted");
        }
    }

    #[test]
    fn rejects_flag_like_and_shell_identifiers() {
        for id in ["", "-o", "--output=/etc/passwd", "a b", "x;rm -rf /", "$(id)", "a\nb"] {
            assert!(
                matches!(
                    validate_identifier(id),
                    Err(RuntimeError::InvalidIdentifier(_))
                ),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_overlong_identifier() {
        let id = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(validate_identifier(&id).is_err());
    }
}

//! CLI-driven backends for containerd (`nerdctl`) and CRI-O (`podman`).
//!
//! Both runtimes are driven through their companion CLIs. Arguments are
//! passed as a vector (never through a shell) and every identifier is
//! validated first.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::error::RuntimeError;
use crate::runtime::{RuntimeKind, RuntimeOps, validate_identifier};

/// Namespace containerd uses for Kubernetes-managed containers.
pub const KUBERNETES_NAMESPACE: &str = "k8s.io";

/// Runs `program args...` and returns the combined diagnostic output on failure.
async fn run_tool(program: &str, args: &[&str]) -> Result<(), String> {
    debug!(program, ?args, "running runtime cli");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let combined = format!("{} {}", stdout.trim(), stderr.trim());
    Err(format!("{program} exited with {}: {}", output.status, combined.trim()))
}

fn path_arg(path: &Path) -> Result<&str, RuntimeError> {
    path.to_str().ok_or_else(|| {
        RuntimeError::InvalidIdentifier(format!("non-utf8 path {}", path.display()))
    })
}

/// containerd backend driven through `nerdctl`.
#[derive(Debug, Clone)]
pub struct ContainerdRuntime {
    program: String,
    address: String,
    image_namespace: String,
}

impl ContainerdRuntime {
    /// Creates a backend talking to the containerd socket at `address`.
    ///
    /// `image_namespace` is used for image saves; an empty value falls back
    /// to [`KUBERNETES_NAMESPACE`].
    pub fn new(address: impl Into<String>, image_namespace: impl Into<String>) -> Self {
        let image_namespace = image_namespace.into();
        Self {
            program: "nerdctl".to_owned(),
            address: address.into(),
            image_namespace: if image_namespace.is_empty() {
                KUBERNETES_NAMESPACE.to_owned()
            } else {
                image_namespace
            },
        }
    }

    /// Overrides the CLI binary (defaults to `nerdctl`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Maps the request namespace to a containerd namespace.
    ///
    /// Cluster workloads arrive with an empty namespace and live in `k8s.io`.
    pub fn resolve_namespace(namespace: &str) -> &str {
        if namespace.is_empty() {
            KUBERNETES_NAMESPACE
        } else {
            namespace
        }
    }
}

impl RuntimeOps for ContainerdRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Containerd
    }

    async fn export_filesystem(
        &self,
        key: &str,
        namespace: &str,
        tar_path: &Path,
    ) -> Result<(), RuntimeError> {
        validate_identifier(key)?;
        let namespace = Self::resolve_namespace(namespace);
        validate_identifier(namespace)?;
        let out = path_arg(tar_path)?;

        run_tool(
            &self.program,
            &[
                "--address",
                &self.address,
                "--namespace",
                namespace,
                "export",
                "--output",
                out,
                key,
            ],
        )
        .await
        .map_err(|reason| RuntimeError::Export {
            key: key.to_owned(),
            reason,
        })
    }

    async fn save_image(&self, image: &str, tar_path: &Path) -> Result<(), RuntimeError> {
        validate_identifier(image)?;
        let out = path_arg(tar_path)?;

        run_tool(
            &self.program,
            &[
                "--address",
                &self.address,
                "--namespace",
                &self.image_namespace,
                "save",
                "--output",
                out,
                image,
            ],
        )
        .await
        .map_err(|reason| RuntimeError::Save {
            image: image.to_owned(),
            reason,
        })
    }
}

/// CRI-O backend driven through `podman`, which shares CRI-O's container storage.
#[derive(Debug, Clone)]
pub struct CrioRuntime {
    program: String,
}

impl CrioRuntime {
    pub fn new() -> Self {
        Self {
            program: "podman".to_owned(),
        }
    }

    /// Overrides the CLI binary (defaults to `podman`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for CrioRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeOps for CrioRuntime {
    fn kind(&self) -> RuntimeKind {
        RuntimeKind::Crio
    }

    async fn export_filesystem(
        &self,
        key: &str,
        _namespace: &str,
        tar_path: &Path,
    ) -> Result<(), RuntimeError> {
        validate_identifier(key)?;
        let out = path_arg(tar_path)?;

        run_tool(&self.program, &["export", "--output", out, key])
            .await
            .map_err(|reason| RuntimeError::Export {
                key: key.to_owned(),
                reason,
            })
    }

    async fn save_image(&self, image: &str, tar_path: &Path) -> Result<(), RuntimeError> {
        validate_identifier(image)?;
        let out = path_arg(tar_path)?;

        run_tool(
            &self.program,
            &["save", "--format", "docker-archive", "--output", out, image],
        )
        .await
        .map_err(|reason| RuntimeError::Save {
            image: image.to_owned(),
            reason,
        })
    }
}

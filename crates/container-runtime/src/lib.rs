#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`RuntimeError`)
//! - [`runtime`]: Capability trait (`RuntimeOps`) and the closed backend set (`ContainerRuntime`)
//! - [`detect`]: Socket probing (`detect`)
//! - [`docker`]: Docker backend over `bollard`
//! - [`cli`]: containerd (`nerdctl`) and CRI-O (`podman`) backends

pub mod cli;
pub mod detect;
pub mod docker;
pub mod error;
pub mod runtime;

// --- Public API Re-exports ---

pub use cli::{ContainerdRuntime, CrioRuntime, KUBERNETES_NAMESPACE};
pub use detect::detect;
pub use docker::DockerRuntime;
pub use error::RuntimeError;
pub use runtime::{ContainerRuntime, RuntimeKind, RuntimeOps, validate_identifier};

//! CLI-specific error types and exit code mapping

use pkgscan_core::error::{PkgscanError, ScanError};
use pkgscan_sbom::{PolicyBreach, SbomError};

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// No container runtime is available for a target that needs one.
    #[error("could not detect container runtime: {0}")]
    RuntimeUndetected(String),

    /// SBOM generation failed.
    #[error("scan error: {0}")]
    Scan(String),

    /// A vulnerability threshold was reached.
    #[error("{0}")]
    PolicyBreach(PolicyBreach),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                   |
    /// |------|-------------------------------------------|
    /// | 0    | Success                                   |
    /// | 1    | General error / runtime not detected      |
    /// | 2    | Configuration error                       |
    /// | 4    | Vulnerability threshold reached           |
    /// | 10   | IO error                                  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::PolicyBreach(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_)
            | Self::Command(_)
            | Self::RuntimeUndetected(_)
            | Self::Scan(_) => 1,
        }
    }
}

impl From<PkgscanError> for CliError {
    fn from(e: PkgscanError) -> Self {
        match e {
            PkgscanError::Config(e) => Self::Config(e.to_string()),
            PkgscanError::Io(e) => Self::Io(e),
            PkgscanError::Scan(ScanError::RuntimeUndetected) => {
                Self::RuntimeUndetected("no docker, containerd or cri-o socket found".to_owned())
            }
            PkgscanError::Scan(e) => Self::Scan(e.to_string()),
        }
    }
}

impl From<SbomError> for CliError {
    fn from(e: SbomError) -> Self {
        match e {
            SbomError::Config { .. } => Self::Config(e.to_string()),
            SbomError::RuntimeUndetected => {
                Self::RuntimeUndetected("no docker, containerd or cri-o socket found".to_owned())
            }
            other => Self::Scan(other.to_string()),
        }
    }
}

impl From<PolicyBreach> for CliError {
    fn from(breach: PolicyBreach) -> Self {
        Self::PolicyBreach(breach)
    }
}

#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`SbomError`)
//! - [`config`]: Pipeline configuration (`SbomConfig`, builder)
//! - [`classify`]: Target classification (`classify_target`)
//! - [`catalogers`]: Ecosystem tag to cataloger mapping
//! - [`exclusions`]: Fixed excluded paths and NFS/tmpfs mount discovery
//! - [`extract`]: Container filesystem extraction (`ExtractedFilesystem`)
//! - [`command`]: Cataloging tool invocation plan (`CommandBuilder`, `ExecutionPlan`)
//! - [`executor`]: Tool execution (`ScanExecutor`)
//! - [`publisher`]: Vulnerability backend (`ScanPublisher`, `RegistryResolver`, `ConsoleClient`)
//! - [`gate`]: Vulnerability gate and policy thresholds (`VulnerabilityGate`, `PolicyBreach`)
//! - [`generator`]: Main orchestrator (`SbomGenerator`, `SbomGeneratorBuilder`)
//!
//! # Architecture
//!
//! ```text
//! ScanRequest --> classify_target --> CommandBuilder --(container)--> extract
//!                                          |
//!                                    ExecutionPlan
//!                                          |
//!                                     ScanExecutor --> syft --> SBOM bytes
//!                                          |
//!                                 VulnerabilityGate --> ConsoleClient
//!                                          |
//!                                     ScanOutcome (sbom, detail, breach)
//! ```

pub mod catalogers;
pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod exclusions;
pub mod executor;
pub mod extract;
pub mod gate;
pub mod generator;
pub mod publisher;

// --- Public API Re-exports ---

// Orchestrator
pub use generator::{SbomGenerator, SbomGeneratorBuilder};

// Configuration
pub use config::{SbomConfig, SbomConfigBuilder};

// Error
pub use error::SbomError;

// Pipeline stages
pub use catalogers::{cataloger_args, catalogers_for};
pub use classify::{classify_target, local_host_name};
pub use command::{CommandBuilder, ExecutionPlan, INSECURE_REGISTRY_ENV};
pub use exclusions::{EXCLUDED_PATHS, discover_mounts};
pub use executor::ScanExecutor;
pub use extract::{ExtractedFilesystem, extract};

// Vulnerability backend and gate
pub use gate::{
    BreachKind, GateState, PolicyBreach, ScanOutcome, VulnerabilityGate, evaluate_thresholds,
};
pub use publisher::{
    ConsoleClient, RegistryResolver, RegistrySettings, ScanContext, ScanPublisher, ScanStatus,
};

//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use pkgscan_core::types::PolicyThresholds;

/// pkgscan -- SBOM generation and vulnerability policy gating.
///
/// Use `pkgscan <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "pkgscan", version, about, long_about = None)]
pub struct Cli {
    /// Path to the pkgscan.toml configuration file (optional for `scan`).
    #[arg(short, long, default_value = "pkgscan.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format for reports.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an SBOM for one target and optionally gate on vulnerabilities.
    Scan(ScanArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Generate an SBOM for a directory, image, container or registry image.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Target: `dir:<path>`, `.`, `registry:<image>`, an image reference or a container.
    #[arg(default_value = ".")]
    pub source: String,

    /// Comma-separated ecosystems to catalog (base, ruby, python, javascript, php,
    /// golang, java, rust, dotnet) or `all`.
    #[arg(long, default_value = "all")]
    pub scan_type: String,

    /// Node type hint (`container` selects filesystem extraction).
    #[arg(long, default_value = "")]
    pub node_type: String,

    /// Host name reported for directory scans (default: kernel host name).
    #[arg(long)]
    pub host_name: Option<String>,

    /// Scan identifier reported to the console.
    #[arg(long, default_value = "")]
    pub scan_id: String,

    /// Registry identifier used to fetch credentials from the console.
    #[arg(long, default_value = "")]
    pub registry_id: String,

    #[arg(long, default_value = "")]
    pub image_id: String,

    #[arg(long, default_value = "")]
    pub container_name: String,

    #[arg(long, default_value = "")]
    pub container_id: String,

    /// Kubernetes cluster name (containers are then looked up by ID in `k8s.io`).
    #[arg(long, default_value = "")]
    pub kubernetes_cluster_name: String,

    /// Submit the SBOM to the console for vulnerability analysis.
    #[arg(long)]
    pub vulnerability_scan: bool,

    /// Do not print vulnerability results.
    #[arg(short, long)]
    pub quiet: bool,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Write the SBOM to this file instead of stdout.
    #[arg(long)]
    pub sbom_output: Option<PathBuf>,
}

/// Policy thresholds. A threshold is active only when positive.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ThresholdArgs {
    /// Fail when the total number of vulnerabilities reaches this value.
    #[arg(long, default_value_t = 0)]
    pub fail_on_count: i64,

    #[arg(long, default_value_t = 0)]
    pub fail_on_critical_count: i64,

    #[arg(long, default_value_t = 0)]
    pub fail_on_high_count: i64,

    #[arg(long, default_value_t = 0)]
    pub fail_on_medium_count: i64,

    #[arg(long, default_value_t = 0)]
    pub fail_on_low_count: i64,

    /// Fail when the cumulative CVE score reaches this value.
    #[arg(long, default_value_t = 0.0)]
    pub fail_on_score: f64,
}

impl From<ThresholdArgs> for PolicyThresholds {
    fn from(args: ThresholdArgs) -> Self {
        Self {
            fail_on_count: args.fail_on_count,
            fail_on_critical_count: args.fail_on_critical_count,
            fail_on_high_count: args.fail_on_high_count,
            fail_on_medium_count: args.fail_on_medium_count,
            fail_on_low_count: args.fail_on_low_count,
            fail_on_score: args.fail_on_score,
        }
    }
}

// ---- config ----

/// Manage pkgscan configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, server, console, scanner, runtime, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}

//! CLI argument definitions for pkgscan-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// pkgscan SBOM generation daemon.
///
/// Serves `pkgscan.v1.PackageScanner` over TCP or a Unix socket and runs
/// accepted scans on a fixed-size worker pool.
#[derive(Parser, Debug)]
#[command(name = "pkgscan-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to pkgscan.toml configuration file.
    #[arg(short, long, default_value = "/etc/pkgscan/pkgscan.toml")]
    pub config: PathBuf,

    /// Listen on 0.0.0.0:<PORT> (mutually exclusive with --socket-path).
    #[arg(long, conflicts_with = "socket_path")]
    pub port: Option<String>,

    /// Listen on a Unix domain socket at this path.
    #[arg(long)]
    pub socket_path: Option<String>,

    /// Number of concurrent scan workers.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of a loaded configuration.
    ///
    /// A listener flag replaces both listener fields so that the file's
    /// other listener setting cannot conflict with it.
    pub fn apply_overrides(&self, config: &mut pkgscan_core::PkgscanConfig) {
        if let Some(port) = &self.port {
            config.server.port = port.clone();
            config.server.socket_path.clear();
        }
        if let Some(path) = &self.socket_path {
            config.server.socket_path = path.clone();
            config.server.port.clear();
        }
        if let Some(concurrency) = self.concurrency {
            config.server.concurrency = concurrency;
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
    }
}

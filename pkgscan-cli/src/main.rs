//! `pkgscan` binary entry point
//!
//! Parses arguments, initializes logging on stderr and dispatches to a command
//! handler. The process exit code is decided here and nowhere else.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgscan_cli::cli::{Cli, Commands};
use pkgscan_cli::commands;
use pkgscan_cli::error::CliError;
use pkgscan_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

/// Logs go to stderr so stdout can carry the SBOM.
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

//! `pkgscan scan` command handler
//!
//! The synchronous path: one scan, SBOM on stdout (or `--sbom-output`), and a
//! non-zero exit when a vulnerability threshold is reached.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use pkgscan_container_runtime::{ContainerRuntime, detect};
use pkgscan_core::PkgscanConfig;
use pkgscan_core::types::{PolicyThresholds, ScanRequest, VulnerabilityScanDetail};
use pkgscan_sbom::{
    ConsoleClient, PolicyBreach, SbomConfig, SbomGenerator, SbomGeneratorBuilder, ScanOutcome,
    classify_target, discover_mounts, local_host_name,
};

use crate::cli::ScanArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `scan` command.
pub async fn execute(
    args: ScanArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = PkgscanConfig::load_or_default(config_path).await?;

    let host_name = args.host_name.clone().unwrap_or_else(local_host_name);
    let request = build_request(&args, &host_name);
    info!(
        source = %request.source,
        node_id = %request.node_id,
        node_type = %request.node_type.as_str(),
        "starting sbom generation"
    );

    let generator = build_generator(&config).await?;
    let outcome = generator.generate(&request).await?;

    deliver(outcome, &args, writer)
}

/// Build the scan request from command-line arguments.
///
/// The target is classified here, exactly as the request service does.
pub fn build_request(args: &ScanArgs, host_name: &str) -> ScanRequest {
    let (node_id, node_type) = classify_target(&args.source, &args.node_type, host_name);
    ScanRequest::builder(args.source.clone())
        .node(node_id, node_type)
        .scan_type(args.scan_type.clone())
        .scan_id(args.scan_id.clone())
        .registry_id(args.registry_id.clone())
        .host_name(host_name)
        .image_id(args.image_id.clone())
        .container_name(args.container_name.clone())
        .container_id(args.container_id.clone())
        .kubernetes_cluster_name(args.kubernetes_cluster_name.clone())
        .vulnerability_scan(args.vulnerability_scan)
        .quiet(args.quiet)
        .thresholds(PolicyThresholds::from(args.thresholds))
        .build()
}

/// Build the generator for a single run.
async fn build_generator(
    config: &PkgscanConfig,
) -> Result<SbomGenerator<ContainerRuntime, ConsoleClient>, CliError> {
    let sbom_config = SbomConfig::from_core(config);
    let mut builder = SbomGeneratorBuilder::new().config(sbom_config.clone());

    match detect(&config.runtime).await {
        Ok(runtime) => builder = builder.runtime(Arc::new(runtime)),
        Err(e) => warn!(error = %e, "container runtime not detected"),
    }

    if sbom_config.detect_mounts {
        builder = builder.mounts(discover_mounts().await);
    }

    if config.console.is_configured() {
        builder = builder.console(Arc::new(ConsoleClient::new(&config.console)?));
    }

    Ok(builder.build()?)
}

/// Report results, emit the SBOM and turn a breach into an error.
///
/// A breached threshold suppresses the SBOM, like the gate it replaces.
pub fn deliver(outcome: ScanOutcome, args: &ScanArgs, writer: &OutputWriter) -> Result<(), CliError> {
    if !args.quiet {
        if let Some(detail) = &outcome.detail {
            let report = VulnerabilityReport::new(&args.source, detail, outcome.breach.as_ref());
            match args.sbom_output {
                Some(_) => writer.render(&report)?,
                None => writer.render_stderr(&report)?,
            }
        }
    }

    if let Some(breach) = outcome.breach {
        error!(
            kind = %breach.kind,
            measured = breach.measured,
            limit = breach.limit,
            "{breach}"
        );
        return Err(CliError::PolicyBreach(breach));
    }

    match &args.sbom_output {
        Some(path) => {
            std::fs::write(path, &outcome.sbom)?;
            info!(path = %path.display(), bytes = outcome.sbom.len(), "sbom written");
        }
        None => write_sbom(&outcome.sbom, &mut std::io::stdout().lock())?,
    }
    Ok(())
}

/// Copy the SBOM bytes verbatim, with nothing appended.
pub fn write_sbom(sbom: &[u8], w: &mut dyn Write) -> std::io::Result<()> {
    w.write_all(sbom)?;
    w.flush()
}

/// Vulnerability summary shown in non-quiet mode.
#[derive(Debug, Serialize)]
pub struct VulnerabilityReport {
    pub source: String,
    pub total: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub cve_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breach: Option<String>,
}

impl VulnerabilityReport {
    pub fn new(
        source: &str,
        detail: &VulnerabilityScanDetail,
        breach: Option<&PolicyBreach>,
    ) -> Self {
        Self {
            source: source.to_owned(),
            total: detail.total,
            critical: detail.severity.critical,
            high: detail.severity.high,
            medium: detail.severity.medium,
            low: detail.severity.low,
            cve_score: detail.cve_score,
            breach: breach.map(ToString::to_string),
        }
    }
}

impl Render for VulnerabilityReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Vulnerabilities: {}", self.source.bold())?;
        writeln!(w, "  Total:    {}", self.total)?;
        writeln!(w, "  Critical: {}", self.critical.to_string().red().bold())?;
        writeln!(w, "  High:     {}", self.high.to_string().red())?;
        writeln!(w, "  Medium:   {}", self.medium.to_string().yellow())?;
        writeln!(w, "  Low:      {}", self.low.to_string().blue())?;
        writeln!(w, "  Score:    {:.2}", self.cve_score)?;

        match &self.breach {
            Some(message) => writeln!(w, "  Policy:   {}", message.red().bold())?,
            None => writeln!(w, "  Policy:   {}", "PASSED".green().bold())?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    use pkgscan_core::types::{NodeType, SeverityCounts};
    use pkgscan_sbom::BreachKind;

    use crate::cli::{Cli, Commands, OutputFormat};

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let mut full = vec!["pkgscan", "scan"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).expect("should parse").command {
            Commands::Scan(args) => args,
            other => panic!("expected scan, got {other:?}"),
        }
    }

    fn detail() -> VulnerabilityScanDetail {
        VulnerabilityScanDetail {
            total: 9,
            severity: SeverityCounts {
                critical: 2,
                high: 3,
                medium: 3,
                low: 1,
            },
            cve_score: 41.5,
        }
    }

    #[test]
    fn test_build_request_directory_uses_host_name() {
        let args = scan_args(&["dir:/srv/app", "--node-type", "container"]);
        let request = build_request(&args, "node-a");
        assert_eq!(request.node_type, NodeType::Host);
        assert_eq!(request.node_id, "node-a");
        assert_eq!(request.host_name, "node-a");
    }

    #[test]
    fn test_build_request_container_hint() {
        let args = scan_args(&["web-1", "--node-type", "container", "--container-name", "web-1"]);
        let request = build_request(&args, "node-a");
        assert_eq!(request.node_type, NodeType::Container);
        assert_eq!(request.node_id, "web-1");
        assert_eq!(request.container_name, "web-1");
    }

    #[test]
    fn test_build_request_carries_flags_and_thresholds() {
        let args = scan_args(&[
            "registry:alpine:3",
            "--vulnerability-scan",
            "--quiet",
            "--fail-on-high-count",
            "2",
            "--registry-id",
            "reg-1",
        ]);
        let request = build_request(&args, "node-a");
        assert_eq!(request.node_type, NodeType::Image);
        assert!(request.vulnerability_scan);
        assert!(request.quiet);
        assert_eq!(request.registry_id, "reg-1");
        assert_eq!(request.thresholds.fail_on_high_count, 2);
    }

    #[test]
    fn test_deliver_writes_sbom_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sbom.json");
        let path_arg = path.display().to_string();
        let args = scan_args(&["alpine", "--sbom-output", &path_arg]);
        let outcome = ScanOutcome {
            sbom: br#"{"artifacts":[]}"#.to_vec(),
            ..Default::default()
        };

        deliver(outcome, &args, &OutputWriter::new(OutputFormat::Text)).expect("should deliver");
        assert_eq!(
            std::fs::read(&path).expect("sbom written"),
            br#"{"artifacts":[]}"#
        );
    }

    #[test]
    fn test_deliver_breach_is_exit_4_and_suppresses_sbom() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sbom.json");
        let path_arg = path.display().to_string();
        let args = scan_args(&["alpine", "--quiet", "--sbom-output", &path_arg]);
        let outcome = ScanOutcome {
            sbom: b"{}".to_vec(),
            detail: Some(detail()),
            breach: Some(PolicyBreach {
                kind: BreachKind::CriticalCount,
                measured: 2.0,
                limit: 1.0,
            }),
        };

        let err = deliver(outcome, &args, &OutputWriter::new(OutputFormat::Text)).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(!path.exists(), "sbom must not be written after a breach");
    }

    #[test]
    fn test_write_sbom_is_byte_exact() {
        let sbom = b"{\"artifacts\":[]}";
        let mut buf = Vec::new();
        write_sbom(sbom, &mut buf).expect("write");
        assert_eq!(buf, sbom, "no trailing newline or other bytes may be added");
    }

    #[test]
    fn test_write_sbom_keeps_existing_trailing_newline() {
        let mut buf = Vec::new();
        write_sbom(b"{}\n", &mut buf).expect("write");
        assert_eq!(buf, b"{}\n");
    }

    #[test]
    fn test_report_render_text_passed() {
        let report = VulnerabilityReport::new("alpine", &detail(), None);
        let mut buf = Vec::new();
        report.render_text(&mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("alpine"));
        assert!(text.contains("Total:    9"));
        assert!(text.contains("41.50"));
        assert!(text.contains("PASSED"));
    }

    #[test]
    fn test_report_json_includes_breach_message() {
        let breach = PolicyBreach {
            kind: BreachKind::Score,
            measured: 41.5,
            limit: 40.0,
        };
        let report = VulnerabilityReport::new("alpine", &detail(), Some(&breach));
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["critical"], 2);
        assert!(
            json["breach"]
                .as_str()
                .is_some_and(|m| m.contains("Vulnerability score (41.500000)"))
        );
    }
}

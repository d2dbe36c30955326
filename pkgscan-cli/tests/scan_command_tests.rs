//! Integration tests for `pkgscan scan`.
//!
//! A shell script stands in for syft and writes its argument vector as the SBOM.
//! Runtime sockets point into the temp dir so no real runtime is ever detected.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;

use pkgscan_cli::cli::{Cli, Commands, OutputFormat, ScanArgs};
use pkgscan_cli::commands::scan;
use pkgscan_cli::error::CliError;
use pkgscan_cli::output::OutputWriter;

const FAKE_SYFT: &str = r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--file" ]; then out="$a"; fi
  prev="$a"
done
printf 'args=%s\n' "$*" > "$out"
"#;

const FAILING_SYFT: &str = r#"echo "could not fetch image: unauthorized"
exit 1
"#;

struct Fixture {
    dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new(script: &str) -> Self {
        let dir = TempDir::new().expect("should create temp dir");
        let script_path = dir.path().join("syft.sh");
        fs::write(&script_path, script).expect("should write script");
        let root = dir.path().display();
        let config = dir.path().join("pkgscan.toml");
        fs::write(
            &config,
            format!(
                r#"
[scanner]
syft_command = ["sh", "{script}"]
temp_dir = "{root}"
detect_mounts = false

[runtime]
docker_socket = "{root}/docker.sock"
containerd_socket = "{root}/containerd.sock"
crio_socket = "{root}/crio.sock"
"#,
                script = script_path.display(),
            ),
        )
        .expect("should write config");
        Self { dir, config }
    }

    fn sbom_path(&self) -> PathBuf {
        self.dir.path().join("sbom.txt")
    }

    fn args(&self, argv: &[&str]) -> ScanArgs {
        let sbom = self.sbom_path().display().to_string();
        let mut full = vec!["pkgscan", "scan"];
        full.extend_from_slice(argv);
        full.extend_from_slice(&["--host-name", "node-a", "--sbom-output", &sbom]);
        match Cli::try_parse_from(full).expect("should parse").command {
            Commands::Scan(args) => args,
            other => panic!("expected scan, got {other:?}"),
        }
    }

    async fn run(&self, argv: &[&str]) -> Result<(), CliError> {
        scan::execute(
            self.args(argv),
            &self.config,
            &OutputWriter::new(OutputFormat::Text),
        )
        .await
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("sbom should be written")
}

#[tokio::test]
async fn test_directory_scan_writes_sbom_with_exclusions() {
    // Given: A directory target and a fake cataloging tool
    let fx = Fixture::new(FAKE_SYFT);

    // When: Scanning the directory
    fx.run(&["dir:/srv/app", "--scan-type", "python"])
        .await
        .expect("scan should succeed");

    // Then: The SBOM carries the directory form of the command
    let sbom = read(&fx.sbom_path());
    assert!(sbom.starts_with("args=packages dir:/srv/app -o json --file "), "{sbom}");
    assert!(sbom.contains(" -q"), "{sbom}");
    assert!(sbom.contains("--exclude ./var/lib/docker/**"), "{sbom}");
    assert!(sbom.contains("--catalogers python-index"), "{sbom}");
    assert!(sbom.contains("--catalogers python-package"), "{sbom}");
}

#[tokio::test]
async fn test_registry_scan_uses_locator_unchanged() {
    let fx = Fixture::new(FAKE_SYFT);

    fx.run(&["registry:alpine:3.19"]).await.expect("scan should succeed");

    let sbom = read(&fx.sbom_path());
    assert!(sbom.starts_with("args=packages registry:alpine:3.19 -o json"), "{sbom}");
    assert!(sbom.contains("--exclude /proc"), "{sbom}");
}

#[tokio::test]
async fn test_vulnerability_scan_without_console_is_config_error() {
    let fx = Fixture::new(FAKE_SYFT);

    let err = fx
        .run(&["registry:alpine:3.19", "--vulnerability-scan"])
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::Config(_)), "got {err:?}");
    assert_eq!(err.exit_code(), 2);
    assert!(!fx.sbom_path().exists());
}

#[tokio::test]
async fn test_container_scan_without_runtime_exits_1() {
    let fx = Fixture::new(FAKE_SYFT);

    let err = fx
        .run(&["web-1", "--node-type", "container", "--container-name", "web-1"])
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::RuntimeUndetected(_)), "got {err:?}");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_tool_failure_keeps_diagnostic() {
    let fx = Fixture::new(FAILING_SYFT);

    let err = fx.run(&["registry:private/app:1"]).await.unwrap_err();

    assert!(matches!(err, CliError::Scan(_)), "got {err:?}");
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("unauthorized"), "{err}");
}

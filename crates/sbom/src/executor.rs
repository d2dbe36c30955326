//! 스캔 실행기 — 실행 계획대로 카탈로그 도구를 실행하고 SBOM을 읽습니다.
//!
//! - 레지스트리 자격 증명이 있으면 임시 디렉토리에 `config.json`을 쓰고
//!   `DOCKER_CONFIG`로 지정합니다 (실행 후 삭제).
//! - 0이 아닌 종료 코드는 stdout+stderr를 그대로 담은 `ToolExecution` 에러가 됩니다.
//! - 출력 파일이 비어 있으면 `ArtifactIo` 에러입니다.
//! - 출력 파일과 계획의 모든 임시 아티팩트는 어떤 경로로 끝나든 삭제됩니다.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error};

use crate::command::ExecutionPlan;
use crate::config::SbomConfig;
use crate::error::SbomError;
use crate::publisher::RegistrySettings;

/// 레지스트리 자격 증명 디렉토리를 가리키는 환경변수
pub const DOCKER_CONFIG_ENV: &str = "DOCKER_CONFIG";

/// 카탈로그 도구 실행기
#[derive(Debug, Clone)]
pub struct ScanExecutor {
    program: String,
    program_args: Vec<String>,
    temp_root: PathBuf,
}

impl ScanExecutor {
    pub fn new(config: &SbomConfig) -> Self {
        Self {
            program: config.program().to_owned(),
            program_args: config.program_args().to_vec(),
            temp_root: config.temp_root(),
        }
    }

    /// 계획을 실행하고 SBOM 바이트를 반환합니다.
    ///
    /// `credentials`는 레지스트리 ID가 있는 이미지 스캔에서만 전달됩니다.
    pub async fn execute(
        &self,
        mut plan: ExecutionPlan,
        credentials: Option<&RegistrySettings>,
    ) -> Result<Vec<u8>, SbomError> {
        let _auth_dir = match credentials {
            Some(settings) => {
                let dir = self.write_docker_config(settings).await?;
                plan.push_env(DOCKER_CONFIG_ENV, dir.path().display().to_string());
                Some(dir)
            }
            None => None,
        };

        debug!(program = %self.program, args = ?plan.args(), "running cataloging tool");
        let output = Command::new(&self.program)
            .args(&self.program_args)
            .args(plan.args())
            .envs(plan.env().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SbomError::ToolExecution {
                args: plan.args().join(" "),
                output: format!("failed to spawn {}: {e}", self.program),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            let args = plan.args().join(" ");
            error!(args = %args, output = %combined, status = %output.status, "cataloging tool failed");
            return Err(SbomError::ToolExecution {
                args,
                output: format!("{combined} {}", output.status),
            });
        }

        let sbom = tokio::fs::read(plan.output_path()).await.map_err(|e| {
            SbomError::ArtifactIo(format!("read {}: {e}", plan.output_path().display()))
        })?;
        if sbom.is_empty() {
            return Err(SbomError::ArtifactIo(format!(
                "cataloging tool produced an empty sbom at {}",
                plan.output_path().display()
            )));
        }

        debug!(bytes = sbom.len(), "sbom generated");
        Ok(sbom)
    }

    /// 자격 증명을 담은 임시 `DOCKER_CONFIG` 디렉토리를 만듭니다.
    async fn write_docker_config(
        &self,
        settings: &RegistrySettings,
    ) -> Result<tempfile::TempDir, SbomError> {
        let dir = tempfile::Builder::new()
            .prefix("pkgscan-auth-")
            .tempdir_in(&self.temp_root)
            .map_err(|e| SbomError::TempDir(format!("{}: {e}", self.temp_root.display())))?;
        let body = serde_json::to_vec(&settings.docker_config())
            .map_err(|e| SbomError::ArtifactIo(format!("encode docker config: {e}")))?;
        tokio::fs::write(dir.path().join("config.json"), body)
            .await
            .map_err(|e| SbomError::ArtifactIo(format!("write docker config: {e}")))?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use pkgscan_container_runtime::ContainerRuntime;
    use pkgscan_core::types::{NodeType, ScanRequest};

    use crate::command::CommandBuilder;
    use crate::config::SbomConfigBuilder;

    /// `sh <script>`로 실행되는 가짜 syft를 만듭니다.
    ///
    /// 스크립트는 `--file` 다음 인자에 `body`를 쓰고 `exit_code`로 종료합니다.
    fn fake_syft(dir: &Path, body: &str, exit_code: i32) -> Vec<String> {
        let script = dir.join("fake-syft.sh");
        let content = format!(
            r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--file" ]; then out="$a"; fi
  prev="$a"
done
printf '%s' '{body}' > "$out"
echo "args: $*"
echo "docker_config=$DOCKER_CONFIG" >&2
exit {exit_code}
"#
        );
        std::fs::write(&script, content).unwrap();
        vec!["sh".to_owned(), script.display().to_string()]
    }

    async fn plan_for(root: &Path, source: &str) -> ExecutionPlan {
        let request = ScanRequest::builder(source)
            .node(source, NodeType::Image)
            .build();
        CommandBuilder::<ContainerRuntime>::new(None, &[], root)
            .build(&request, false)
            .await
            .unwrap()
    }

    fn executor(root: &Path, command: Vec<String>) -> ScanExecutor {
        let config = SbomConfigBuilder::new()
            .syft_command(command)
            .temp_dir(root.display().to_string())
            .build()
            .unwrap();
        ScanExecutor::new(&config)
    }

    #[tokio::test]
    async fn successful_run_returns_sbom_and_removes_output() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(root.path(), fake_syft(root.path(), r#"{"artifacts":[]}"#, 0));
        let plan = plan_for(root.path(), "registry:alpine:3").await;
        let output = plan.output_path().to_path_buf();

        let sbom = exec.execute(plan, None).await.unwrap();
        assert_eq!(sbom, br#"{"artifacts":[]}"#);
        assert!(!output.exists(), "output file must be removed after the run");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_combined_output() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(root.path(), fake_syft(root.path(), "partial", 3));
        let plan = plan_for(root.path(), "registry:alpine:3").await;
        let output = plan.output_path().to_path_buf();

        let err = exec.execute(plan, None).await.unwrap_err();
        match err {
            SbomError::ToolExecution { args, output } => {
                assert!(args.starts_with("packages registry:alpine:3 -o json --file"));
                assert!(output.contains("args: packages"), "stdout kept: {output}");
                assert!(output.contains("docker_config="), "stderr kept: {output}");
            }
            other => panic!("expected ToolExecution, got {other:?}"),
        }
        assert!(!output.exists(), "output file must be removed on failure");
    }

    #[tokio::test]
    async fn empty_sbom_is_artifact_error() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(root.path(), fake_syft(root.path(), "", 0));
        let plan = plan_for(root.path(), "registry:alpine:3").await;

        let err = exec.execute(plan, None).await.unwrap_err();
        assert!(matches!(err, SbomError::ArtifactIo(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_binary_is_tool_execution_error() {
        let root = tempfile::tempdir().unwrap();
        let exec = executor(
            root.path(),
            vec!["pkgscan-definitely-missing-syft".to_owned()],
        );
        let plan = plan_for(root.path(), "alpine").await;
        let err = exec.execute(plan, None).await.unwrap_err();
        assert!(matches!(err, SbomError::ToolExecution { .. }));
    }

    #[tokio::test]
    async fn credentials_are_exposed_through_docker_config() {
        let root = tempfile::tempdir().unwrap();
        let script_dir = tempfile::tempdir().unwrap();
        let script = script_dir.path().join("auth-syft.sh");
        // DOCKER_CONFIG/config.json 내용을 SBOM으로 출력
        std::fs::write(
            &script,
            r#"out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--file" ]; then out="$a"; fi
  prev="$a"
done
cat "$DOCKER_CONFIG/config.json" > "$out"
"#,
        )
        .unwrap();
        let exec = executor(
            root.path(),
            vec!["sh".to_owned(), script.display().to_string()],
        );
        let plan = plan_for(root.path(), "registry.local/app:1").await;
        let settings = RegistrySettings {
            insecure: false,
            auths: serde_json::json!({"registry.local": {"auth": "dXNlcjpwYXNz"}}),
        };

        let sbom = exec.execute(plan, Some(&settings)).await.unwrap();
        let config: serde_json::Value = serde_json::from_slice(&sbom).unwrap();
        assert_eq!(config["auths"]["registry.local"]["auth"], "dXNlcjpwYXNz");

        let leftovers: Vec<_> = std::fs::read_dir(root.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("pkgscan-auth-"))
            .collect();
        assert!(leftovers.is_empty(), "auth dir must be removed after the run");
    }
}

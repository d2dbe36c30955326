//! 카탈로그 명령 구성기
//!
//! 스캔 요청을 syft 실행 계획([`ExecutionPlan`])으로 변환합니다.
//!
//! # 기본 형태
//!
//! ```text
//! packages <locator> -o json --file <output> -q [--exclude ...] [--catalogers ...]
//! ```
//!
//! # 대상별 처리
//!
//! | 대상 | locator | 제외 인자 |
//! |------|---------|-----------|
//! | `dir:` / `.` | 그대로 | `./<path>/**` + 마운트 |
//! | 이미지 (containerd/CRI-O) | `oci-archive:` / `docker-archive:` 저장본 | 고정 경로 |
//! | 컨테이너 | `dir:<추출 디렉토리>` | 없음 |
//! | `registry:` | 그대로 (insecure면 접두어 제거) | 고정 경로 |
//!
//! 임시 디렉토리, 이미지 저장, 추출 중 하나라도 실패하면 계획 전체가 실패합니다.

use std::path::{Path, PathBuf};

use tempfile::{TempDir, TempPath};
use tracing::debug;

use pkgscan_container_runtime::RuntimeOps;
use pkgscan_core::types::{NodeType, REGISTRY_SCHEME, ScanRequest};

use crate::catalogers::cataloger_args;
use crate::error::SbomError;
use crate::exclusions::{directory_exclusions, image_exclusions};
use crate::extract::{ExtractedFilesystem, container_key, extract};

/// insecure 레지스트리용 환경변수
pub const INSECURE_REGISTRY_ENV: [(&str, &str); 2] = [
    ("SYFT_REGISTRY_INSECURE_SKIP_TLS_VERIFY", "true"),
    ("SYFT_REGISTRY_INSECURE_USE_HTTP", "true"),
];

/// locator 인자 위치 (`packages` 다음)
const LOCATOR_INDEX: usize = 1;

/// 도구가 끝날 때까지 유지해야 하는 임시 아티팩트 (drop으로만 사용)
#[derive(Debug)]
#[allow(dead_code)]
enum PlanArtifact {
    /// 저장된 이미지 아카이브가 들어 있는 디렉토리
    SavedImage(TempDir),
    /// 추출된 컨테이너 파일시스템
    Extracted(ExtractedFilesystem),
}

/// syft 실행 계획
///
/// 실행기로 이동된 뒤 실행이 끝나면 drop되며, drop 시 출력 파일과
/// 모든 임시 아티팩트가 삭제됩니다.
#[derive(Debug)]
pub struct ExecutionPlan {
    args: Vec<String>,
    output_file: TempPath,
    env: Vec<(String, String)>,
    artifacts: Vec<PlanArtifact>,
}

impl ExecutionPlan {
    /// 도구 인자 (바이너리 제외)
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// SBOM 출력 파일 경로
    pub fn output_path(&self) -> &Path {
        &self.output_file
    }

    /// 추가 환경변수
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// 도구가 읽을 대상 locator
    pub fn locator(&self) -> &str {
        &self.args[LOCATOR_INDEX]
    }

    /// 유지 중인 임시 아티팩트 수
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// 환경변수를 추가합니다.
    pub fn push_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.push((key.into(), value.into()));
    }
}

/// 요청을 실행 계획으로 변환하는 빌더
pub struct CommandBuilder<'a, R> {
    runtime: Option<&'a R>,
    mounts: &'a [PathBuf],
    temp_root: &'a Path,
}

impl<'a, R: RuntimeOps> CommandBuilder<'a, R> {
    /// 감지된 런타임(없으면 `None`), 시작 시 탐색한 마운트, 임시 루트로 빌더를 생성합니다.
    pub fn new(runtime: Option<&'a R>, mounts: &'a [PathBuf], temp_root: &'a Path) -> Self {
        Self {
            runtime,
            mounts,
            temp_root,
        }
    }

    /// 실행 계획을 만듭니다.
    ///
    /// `insecure_registry`는 요청의 레지스트리가 insecure로 등록된 경우 `true`.
    pub async fn build(
        &self,
        request: &ScanRequest,
        insecure_registry: bool,
    ) -> Result<ExecutionPlan, SbomError> {
        let output_file = tempfile::Builder::new()
            .prefix("pkgscan-")
            .suffix("-output.json")
            .tempfile_in(self.temp_root)
            .map_err(|e| SbomError::TempDir(format!("{}: {e}", self.temp_root.display())))?
            .into_temp_path();
        let output = output_file
            .to_str()
            .ok_or_else(|| SbomError::TempDir("non-utf8 temp path".to_owned()))?
            .to_owned();

        let mut plan = ExecutionPlan {
            args: vec![
                "packages".to_owned(),
                request.source.clone(),
                "-o".to_owned(),
                "json".to_owned(),
                "--file".to_owned(),
                output,
                "-q".to_owned(),
            ],
            output_file,
            env: Vec::new(),
            artifacts: Vec::new(),
        };

        if request.is_directory() {
            plan.args
                .extend(directory_exclusions(&request.source, self.mounts));
        } else {
            if request.node_type != NodeType::Container {
                plan.args.extend(image_exclusions());
            }

            if request.is_registry() {
                if insecure_registry {
                    plan.args[LOCATOR_INDEX] = request.source.replace(REGISTRY_SCHEME, "");
                    for (key, value) in INSECURE_REGISTRY_ENV {
                        plan.push_env(key, value);
                    }
                }
            } else if request.node_type == NodeType::Container {
                let (key, namespace) = container_key(request);
                let extracted = extract(self.runtime, key, namespace, self.temp_root).await?;
                plan.args[LOCATOR_INDEX] = format!("dir:{}", extracted.path().display());
                plan.artifacts.push(PlanArtifact::Extracted(extracted));
            } else if let Some((runtime, scheme)) = self.archiving_runtime() {
                let (dir, tar) = self.save_image(runtime, &request.source).await?;
                plan.args[LOCATOR_INDEX] = format!("{scheme}:{}", tar.display());
                plan.artifacts.push(PlanArtifact::SavedImage(dir));
            }
        }

        plan.args.extend(cataloger_args(&request.scan_type));

        debug!(
            node_type = %request.node_type,
            locator = plan.locator(),
            args = plan.args.len(),
            "execution plan built"
        );
        Ok(plan)
    }

    /// 이미지를 아카이브로 저장해야 하는 런타임(containerd, CRI-O)과 그 scheme
    fn archiving_runtime(&self) -> Option<(&'a R, &'static str)> {
        let runtime = self.runtime?;
        runtime.kind().archive_scheme().map(|scheme| (runtime, scheme))
    }

    async fn save_image(&self, runtime: &R, image: &str) -> Result<(TempDir, PathBuf), SbomError> {
        let dir = tempfile::Builder::new()
            .prefix("syft-")
            .tempdir_in(self.temp_root)
            .map_err(|e| SbomError::TempDir(format!("{}: {e}", self.temp_root.display())))?;
        let tar = dir.path().join("image.tar");
        runtime
            .save_image(image, &tar)
            .await
            .map_err(|e| SbomError::ImageSave(e.to_string()))?;
        Ok((dir, tar))
    }
}

//! 컨테이너 파일시스템 추출기
//!
//! 카탈로그 도구가 실행 중인 컨테이너를 직접 읽을 수 없으므로,
//! 런타임으로 루트 파일시스템을 `<tempdir>.tar`로 내보낸 뒤 임시 디렉토리에 풉니다.
//! 내보내기와 압축 해제가 모두 성공해야 결과를 반환하며,
//! 부분 추출된 디렉토리는 절대 반환하지 않습니다.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use pkgscan_container_runtime::RuntimeOps;
use pkgscan_core::types::ScanRequest;

use crate::error::SbomError;

/// 로컬(비클러스터) 컨테이너가 속하는 네임스페이스
pub const DEFAULT_NAMESPACE: &str = "default";

/// 추출된 컨테이너 파일시스템
///
/// Drop 시 임시 디렉토리와 tarball을 모두 삭제합니다.
#[derive(Debug)]
pub struct ExtractedFilesystem {
    dir: TempDir,
    tarball: PathBuf,
}

impl ExtractedFilesystem {
    /// 압축 해제된 루트 파일시스템 경로
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 중간 tarball 경로
    pub fn tarball(&self) -> &Path {
        &self.tarball
    }
}

impl Drop for ExtractedFilesystem {
    fn drop(&mut self) {
        remove_tarball(&self.tarball);
    }
}

fn remove_tarball(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove tarball"),
    }
}

/// 요청에서 컨테이너 키와 네임스페이스를 구합니다.
///
/// 클러스터 이름이 있으면 `(container_id, "")`, 없으면 `(container_name, "default")`.
pub fn container_key(request: &ScanRequest) -> (&str, &str) {
    if request.kubernetes_cluster_name.is_empty() {
        (request.container_name.as_str(), DEFAULT_NAMESPACE)
    } else {
        (request.container_id.as_str(), "")
    }
}

/// 컨테이너 파일시스템을 임시 디렉토리로 추출합니다.
///
/// # Errors
///
/// - `SbomError::RuntimeUndetected`: 런타임이 감지되지 않음
/// - `SbomError::TempDir`: 임시 디렉토리 생성 실패
/// - `SbomError::Extraction`: 내보내기 또는 압축 해제 실패 (원인 메시지 포함)
pub async fn extract<R: RuntimeOps>(
    runtime: Option<&R>,
    key: &str,
    namespace: &str,
    temp_root: &Path,
) -> Result<ExtractedFilesystem, SbomError> {
    let runtime = runtime.ok_or(SbomError::RuntimeUndetected)?;

    let dir = tempfile::Builder::new()
        .prefix("syft-")
        .tempdir_in(temp_root)
        .map_err(|e| SbomError::TempDir(format!("{}: {e}", temp_root.display())))?;

    let mut tarball = OsString::from(dir.path().as_os_str());
    tarball.push(".tar");
    let extracted = ExtractedFilesystem {
        dir,
        tarball: PathBuf::from(tarball),
    };

    debug!(
        runtime = %runtime.kind(),
        container = key,
        namespace,
        dir = %extracted.path().display(),
        "exporting container filesystem"
    );
    runtime
        .export_filesystem(key, namespace, extracted.tarball())
        .await
        .map_err(|e| SbomError::Extraction(e.to_string()))?;

    let tarball = extracted.tarball.clone();
    let target = extracted.path().to_path_buf();
    tokio::task::spawn_blocking(move || unpack(&tarball, &target))
        .await
        .map_err(|e| SbomError::Extraction(format!("spawn_blocking failed: {e}")))??;

    Ok(extracted)
}

/// tarball을 `target`에 풉니다 (동기 I/O).
fn unpack(tarball: &Path, target: &Path) -> Result<(), SbomError> {
    let file = std::fs::File::open(tarball)
        .map_err(|e| SbomError::Extraction(format!("open {}: {e}", tarball.display())))?;
    let mut archive = tar::Archive::new(std::io::BufReader::new(file));
    archive
        .unpack(target)
        .map_err(|e| SbomError::Extraction(format!("unpack {}: {e}", tarball.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pkgscan_container_runtime::{RuntimeError, RuntimeKind};

    /// 고정된 tar 내용을 내보내는 테스트용 런타임
    struct TarRuntime {
        payload: Option<Vec<u8>>,
    }

    impl RuntimeOps for TarRuntime {
        fn kind(&self) -> RuntimeKind {
            RuntimeKind::Docker
        }

        async fn export_filesystem(
            &self,
            key: &str,
            _namespace: &str,
            tar_path: &Path,
        ) -> Result<(), RuntimeError> {
            match &self.payload {
                Some(bytes) => Ok(std::fs::write(tar_path, bytes)?),
                None => Err(RuntimeError::Export {
                    key: key.to_owned(),
                    reason: "no such container".to_owned(),
                }),
            }
        }

        async fn save_image(&self, _image: &str, _tar_path: &Path) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    fn sample_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let data = b"ID=alpine\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "etc/os-release", &data[..])
            .unwrap();
        builder.into_inner().unwrap()
    }

    #[test]
    fn cluster_containers_use_id_and_empty_namespace() {
        let request = ScanRequest::builder("abc")
            .container_id("0123abcd")
            .container_name("web")
            .kubernetes_cluster_name("prod")
            .build();
        assert_eq!(container_key(&request), ("0123abcd", ""));
    }

    #[test]
    fn local_containers_use_name_and_default_namespace() {
        let request = ScanRequest::builder("abc")
            .container_id("0123abcd")
            .container_name("web")
            .build();
        assert_eq!(container_key(&request), ("web", "default"));
    }

    #[tokio::test]
    async fn missing_runtime_is_runtime_undetected() {
        let root = tempfile::tempdir().unwrap();
        let err = extract::<TarRuntime>(None, "web", "default", root.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SbomError::RuntimeUndetected));
    }

    #[tokio::test]
    async fn extracts_and_cleans_up_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let runtime = TarRuntime {
            payload: Some(sample_tar()),
        };

        let extracted = extract(Some(&runtime), "web", "default", root.path())
            .await
            .unwrap();
        let dir = extracted.path().to_path_buf();
        let tarball = extracted.tarball().to_path_buf();
        assert!(dir.join("etc/os-release").exists());
        assert!(tarball.exists());
        assert!(tarball.to_string_lossy().ends_with(".tar"));

        drop(extracted);
        assert!(!dir.exists(), "temp dir must be removed on drop");
        assert!(!tarball.exists(), "tarball must be removed on drop");
    }

    #[tokio::test]
    async fn export_failure_carries_diagnostic_and_leaves_nothing() {
        let root = tempfile::tempdir().unwrap();
        let runtime = TarRuntime { payload: None };

        let err = extract(Some(&runtime), "web", "default", root.path())
            .await
            .unwrap_err();
        match err {
            SbomError::Extraction(msg) => assert!(msg.contains("no such container")),
            other => panic!("expected Extraction, got {other:?}"),
        }
        let leftovers = std::fs::read_dir(root.path()).unwrap().count();
        assert_eq!(leftovers, 0, "failed extraction must not leave artifacts");
    }

    #[tokio::test]
    async fn corrupt_tarball_is_unpack_failure() {
        let root = tempfile::tempdir().unwrap();
        // 헤더 체크섬이 맞지 않는 데이터
        let runtime = TarRuntime {
            payload: Some(b"definitely not a tar archive".repeat(40)),
        };

        let err = extract(Some(&runtime), "web", "default", root.path())
            .await
            .unwrap_err();
        assert!(matches!(err, SbomError::Extraction(_)));
        let leftovers = std::fs::read_dir(root.path()).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}

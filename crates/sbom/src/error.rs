//! SBOM 파이프라인 에러 타입
//!
//! [`SbomError`]는 한 번의 SBOM 생성 시도를 중단시키는 모든 에러를 나타냅니다.
//! `From<SbomError> for PkgscanError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **런타임**: `RuntimeUndetected`
//! - **임시 아티팩트**: `TempDir`, `ArtifactIo`
//! - **컨테이너/이미지**: `ImageSave`, `Extraction`
//! - **카탈로그 도구**: `ToolExecution`
//! - **백엔드**: `Backend`
//! - **설정**: `Config`

use pkgscan_core::error::{ConfigError, PkgscanError, ScanError};

/// SBOM 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SbomError {
    /// 컨테이너 런타임이 감지되지 않았는데 런타임이 필요한 대상
    #[error("container runtime not detected")]
    RuntimeUndetected,

    /// 임시 디렉토리/파일 생성 실패
    #[error("temp dir error: {0}")]
    TempDir(String),

    /// 이미지 아카이브 저장 실패
    #[error("image save failed: {0}")]
    ImageSave(String),

    /// 컨테이너 파일시스템 내보내기/압축 해제 실패
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// 카탈로그 도구가 0이 아닌 코드로 종료
    #[error("syft failed for args [{args}]: {output}")]
    ToolExecution {
        /// 실행 인자 (공백 구분)
        args: String,
        /// 도구의 stdout+stderr 및 종료 상태
        output: String,
    },

    /// 출력 아티팩트 I/O 실패 (파일 없음, 빈 SBOM 포함)
    #[error("artifact io error: {0}")]
    ArtifactIo(String),

    /// 취약점 백엔드 통신 실패
    #[error("backend error: {0}")]
    Backend(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl SbomError {
    /// 메트릭/로그용 짧은 분류명
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RuntimeUndetected => "runtime_undetected",
            Self::TempDir(_) => "temp_dir",
            Self::ImageSave(_) => "image_save",
            Self::Extraction(_) => "extraction",
            Self::ToolExecution { .. } => "tool_execution",
            Self::ArtifactIo(_) => "artifact_io",
            Self::Backend(_) => "backend",
            Self::Config { .. } => "config",
        }
    }
}

impl From<SbomError> for PkgscanError {
    fn from(err: SbomError) -> Self {
        match err {
            SbomError::RuntimeUndetected => PkgscanError::Scan(ScanError::RuntimeUndetected),
            SbomError::ImageSave(msg) | SbomError::Extraction(msg) => {
                PkgscanError::Scan(ScanError::Extraction(msg))
            }
            e @ SbomError::ToolExecution { .. } => {
                PkgscanError::Scan(ScanError::ToolExecution(e.to_string()))
            }
            SbomError::TempDir(msg) | SbomError::ArtifactIo(msg) => {
                PkgscanError::Scan(ScanError::ArtifactIo(msg))
            }
            SbomError::Backend(msg) => PkgscanError::Scan(ScanError::Backend(msg)),
            SbomError::Config { field, reason } => {
                PkgscanError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

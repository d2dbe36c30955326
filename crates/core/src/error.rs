//! 에러 타입 — 도메인별 에러 정의

/// pkgscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum PkgscanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 처리 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스캔 단위 에러
///
/// 한 번의 SBOM 생성 시도를 중단시키는 에러입니다.
/// 서비스 경로에서는 워커 경계에서 로깅되고 버려집니다.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 컨테이너 런타임을 감지하지 못함
    #[error("container runtime not detected")]
    RuntimeUndetected,

    /// 컨테이너 파일시스템 추출 실패
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// 카탈로그 도구 실행 실패
    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    /// 임시 아티팩트 I/O 실패
    #[error("artifact io failed: {0}")]
    ArtifactIo(String),

    /// 취약점 백엔드 통신 실패
    #[error("backend error: {0}")]
    Backend(String),
}

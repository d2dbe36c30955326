//! 컨테이너 런타임 에러 타입
//!
//! [`RuntimeError`]는 런타임 감지와 내보내기 과정의 모든 에러를 표현합니다.
//! `From<RuntimeError> for PkgscanError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use pkgscan_core::error::{PkgscanError, ScanError};

/// 컨테이너 런타임 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// 어떤 런타임 소켓도 발견되지 않음
    #[error("no container runtime detected (probed: {probed})")]
    NotDetected {
        /// 확인한 소켓 경로 목록
        probed: String,
    },

    /// 런타임 연결 실패
    #[error("runtime connection error: {0}")]
    Connection(String),

    /// 컨테이너 파일시스템 내보내기 실패
    #[error("export of '{key}' failed: {reason}")]
    Export {
        /// 컨테이너 키 (ID 또는 이름)
        key: String,
        /// 실패 사유 (런타임 진단 메시지)
        reason: String,
    },

    /// 이미지 저장 실패
    #[error("save of image '{image}' failed: {reason}")]
    Save {
        /// 이미지 참조
        image: String,
        /// 실패 사유
        reason: String,
    },

    /// 허용되지 않는 식별자
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// 로컬 파일 I/O 실패
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RuntimeError> for PkgscanError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::NotDetected { .. } => PkgscanError::Scan(ScanError::RuntimeUndetected),
            RuntimeError::Io(e) => PkgscanError::Io(e),
            other => PkgscanError::Scan(ScanError::Extraction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_error_keeps_diagnostic() {
        let err = RuntimeError::Export {
            key: "web".to_owned(),
            reason: "no such container".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("web"));
        assert!(msg.contains("no such container"));
    }

    #[test]
    fn not_detected_converts_to_runtime_undetected() {
        let err: PkgscanError = RuntimeError::NotDetected {
            probed: "/var/run/docker.sock".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            PkgscanError::Scan(ScanError::RuntimeUndetected)
        ));
    }

    #[test]
    fn save_error_converts_to_extraction() {
        let err: PkgscanError = RuntimeError::Save {
            image: "nginx".to_owned(),
            reason: "denied".to_owned(),
        }
        .into();
        assert!(matches!(err, PkgscanError::Scan(ScanError::Extraction(_))));
    }
}

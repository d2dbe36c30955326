//! SBOM 파이프라인 설정
//!
//! [`SbomConfig`]는 core의 [`PkgscanConfig`]에서 파이프라인이 사용하는
//! 필드(카탈로그 도구 명령, 임시 디렉토리, 마운트 탐색, 상태 재전송 간격)만 추려낸 설정입니다.
//!
//! # 사용 예시
//!
//! ```
//! use pkgscan_sbom::SbomConfigBuilder;
//!
//! let config = SbomConfigBuilder::new()
//!     .syft_command(vec!["syft".to_owned()])
//!     .status_heartbeat_secs(10)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.program(), "syft");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pkgscan_core::config::PkgscanConfig;

use crate::error::SbomError;

/// SBOM 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbomConfig {
    /// 카탈로그 도구 명령 (바이너리 + 선행 인자)
    pub syft_command: Vec<String>,
    /// 임시 아티팩트 루트 (비어 있으면 시스템 임시 디렉토리)
    pub temp_dir: String,
    /// 디렉토리 스캔 시 NFS/tmpfs 마운트 제외 여부
    pub detect_mounts: bool,
    /// 스캔 상태 재전송 간격 (초)
    pub status_heartbeat_secs: u64,
}

impl Default for SbomConfig {
    fn default() -> Self {
        Self {
            syft_command: vec!["syft".to_owned()],
            temp_dir: String::new(),
            detect_mounts: true,
            status_heartbeat_secs: 30,
        }
    }
}

impl SbomConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &PkgscanConfig) -> Self {
        Self {
            syft_command: core.scanner.syft_command.clone(),
            temp_dir: core.scanner.temp_dir.clone(),
            detect_mounts: core.scanner.detect_mounts,
            status_heartbeat_secs: core.console.status_heartbeat_secs,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SbomError> {
        if self.syft_command.first().is_none_or(|p| p.is_empty()) {
            return Err(SbomError::Config {
                field: "syft_command".to_owned(),
                reason: "must name the cataloging tool binary".to_owned(),
            });
        }
        if self.status_heartbeat_secs == 0 {
            return Err(SbomError::Config {
                field: "status_heartbeat_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }

    /// 도구 바이너리
    pub fn program(&self) -> &str {
        self.syft_command.first().map(String::as_str).unwrap_or("syft")
    }

    /// 도구 바이너리 뒤에 붙는 선행 인자
    pub fn program_args(&self) -> &[String] {
        self.syft_command.get(1..).unwrap_or(&[])
    }

    /// 임시 아티팩트 루트 디렉토리
    pub fn temp_root(&self) -> PathBuf {
        if self.temp_dir.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(&self.temp_dir)
        }
    }

    pub fn status_heartbeat(&self) -> Duration {
        Duration::from_secs(self.status_heartbeat_secs)
    }
}

/// [`SbomConfig`] 빌더
#[derive(Debug, Clone, Default)]
pub struct SbomConfigBuilder {
    config: SbomConfig,
}

impl SbomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn syft_command(mut self, command: Vec<String>) -> Self {
        self.config.syft_command = command;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.temp_dir = dir.into();
        self
    }

    pub fn detect_mounts(mut self, enabled: bool) -> Self {
        self.config.detect_mounts = enabled;
        self
    }

    pub fn status_heartbeat_secs(mut self, secs: u64) -> Self {
        self.config.status_heartbeat_secs = secs;
        self
    }


    /// 검증 후 설정을 반환합니다.
    pub fn build(self) -> Result<SbomConfig, SbomError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SbomConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_copies_scanner_and_console_fields() {
        let mut core = PkgscanConfig::default();
        core.scanner.syft_command = vec!["sh".to_owned(), "/opt/fake-syft.sh".to_owned()];
        core.scanner.temp_dir = "/var/tmp/pkgscan".to_owned();
        core.console.status_heartbeat_secs = 7;

        let config = SbomConfig::from_core(&core);
        assert_eq!(config.program(), "sh");
        assert_eq!(config.program_args(), ["/opt/fake-syft.sh".to_owned()]);
        assert_eq!(config.temp_root(), PathBuf::from("/var/tmp/pkgscan"));
        assert_eq!(config.status_heartbeat(), Duration::from_secs(7));
    }

    #[test]
    fn empty_temp_dir_uses_system_default() {
        let config = SbomConfig::default();
        assert_eq!(config.temp_root(), std::env::temp_dir());
    }

    #[test]
    fn builder_rejects_empty_command() {
        let result = SbomConfigBuilder::new().syft_command(vec![]).build();
        assert!(matches!(result, Err(SbomError::Config { .. })));
    }
}

//! 설정 관리 — pkgscan.toml 파싱 및 런타임 설정
//!
//! [`PkgscanConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//! 프로세스 시작 시 한 번 로드되며 이후 변경되지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PKGSCAN_SERVER_PORT=8005` 형식)
//! 3. 설정 파일 (`pkgscan.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), pkgscan_core::error::PkgscanError> {
//! use pkgscan_core::config::PkgscanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = PkgscanConfig::load("pkgscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = PkgscanConfig::parse("[server]\nport = \"8005\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, PkgscanError};

/// 워커 풀 기본 크기
pub const DEFAULT_SCAN_CONCURRENCY: usize = 5;

/// 백엔드 기본 포트
pub const DEFAULT_CONSOLE_PORT: &str = "443";

/// 워커 수 오버라이드용 레거시 환경변수
pub const LEGACY_CONCURRENCY_ENV: &str = "PACKAGE_SCAN_CONCURRENCY";

/// 콘솔 주소용 레거시 환경변수
pub const LEGACY_CONSOLE_URL_ENV: &str = "MGMT_CONSOLE_URL";

/// 콘솔 포트용 레거시 환경변수
pub const LEGACY_CONSOLE_PORT_ENV: &str = "MGMT_CONSOLE_PORT";

/// 콘솔 액세스 키용 레거시 환경변수
pub const LEGACY_ACCESS_KEY_ENV: &str = "DEEPFENCE_KEY";

/// pkgscan 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PkgscanConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 요청 서비스 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 취약점 백엔드 설정
    #[serde(default)]
    pub console: ConsoleConfig,
    /// 카탈로그 도구 실행 설정
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// 컨테이너 런타임 설정
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl PkgscanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, PkgscanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 없으면 기본값에서 시작하여 로드합니다.
    ///
    /// CLI 단발 실행처럼 설정 파일이 선택 사항인 경우에 사용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, PkgscanError> {
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(PkgscanError::Config(ConfigError::FileNotFound { .. })) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, PkgscanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PkgscanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                PkgscanError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, PkgscanError> {
        toml::from_str(toml_str).map_err(|e| {
            PkgscanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PKGSCAN_{SECTION}_{FIELD}`
    /// 예: `PKGSCAN_CONSOLE_URL=console.example.com`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PKGSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PKGSCAN_GENERAL_LOG_FORMAT");

        // Server (레거시 변수 먼저, 네임스페이스 변수가 우선)
        override_usize(&mut self.server.concurrency, LEGACY_CONCURRENCY_ENV);
        override_usize(&mut self.server.concurrency, "PKGSCAN_SERVER_CONCURRENCY");
        override_string(&mut self.server.port, "PKGSCAN_SERVER_PORT");
        override_string(&mut self.server.socket_path, "PKGSCAN_SERVER_SOCKET_PATH");

        // Console
        override_string(&mut self.console.url, LEGACY_CONSOLE_URL_ENV);
        override_string(&mut self.console.url, "PKGSCAN_CONSOLE_URL");
        override_string(&mut self.console.port, LEGACY_CONSOLE_PORT_ENV);
        override_string(&mut self.console.port, "PKGSCAN_CONSOLE_PORT");
        override_string(&mut self.console.access_key, LEGACY_ACCESS_KEY_ENV);
        override_string(&mut self.console.access_key, "PKGSCAN_CONSOLE_ACCESS_KEY");
        override_bool(
            &mut self.console.insecure_skip_verify,
            "PKGSCAN_CONSOLE_INSECURE_SKIP_VERIFY",
        );
        override_u64(
            &mut self.console.status_heartbeat_secs,
            "PKGSCAN_CONSOLE_STATUS_HEARTBEAT_SECS",
        );
        override_u64(
            &mut self.console.results_poll_interval_secs,
            "PKGSCAN_CONSOLE_RESULTS_POLL_INTERVAL_SECS",
        );

        // Scanner
        override_words(&mut self.scanner.syft_command, "PKGSCAN_SCANNER_SYFT_COMMAND");
        override_string(&mut self.scanner.temp_dir, "PKGSCAN_SCANNER_TEMP_DIR");
        override_bool(&mut self.scanner.detect_mounts, "PKGSCAN_SCANNER_DETECT_MOUNTS");

        // Runtime
        override_string(&mut self.runtime.docker_socket, "PKGSCAN_RUNTIME_DOCKER_SOCKET");
        override_string(
            &mut self.runtime.containerd_socket,
            "PKGSCAN_RUNTIME_CONTAINERD_SOCKET",
        );
        override_string(&mut self.runtime.crio_socket, "PKGSCAN_RUNTIME_CRIO_SOCKET");
        override_string(
            &mut self.runtime.containerd_image_namespace,
            "PKGSCAN_RUNTIME_CONTAINERD_IMAGE_NAMESPACE",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "PKGSCAN_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "PKGSCAN_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "PKGSCAN_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 리스너 선택(포트 vs 소켓)은 서비스 시작 시점에 검증합니다.
    /// CLI 단발 실행에는 리스너가 필요하지 않기 때문입니다.
    pub fn validate(&self) -> Result<(), PkgscanError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if !self.server.port.is_empty() && self.server.port.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_owned(),
                reason: format!("'{}' is not a valid port number", self.server.port),
            }
            .into());
        }

        if !self.server.port.is_empty() && !self.server.socket_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server".to_owned(),
                reason: "port and socket_path are mutually exclusive".to_owned(),
            }
            .into());
        }

        if self.scanner.syft_command.is_empty() || self.scanner.syft_command[0].is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scanner.syft_command".to_owned(),
                reason: "must name the cataloging tool binary".to_owned(),
            }
            .into());
        }

        if self.console.status_heartbeat_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "console.status_heartbeat_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.console.results_poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "console.results_poll_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 요청 서비스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP 포트 (`socket_path`와 배타적)
    pub port: String,
    /// Unix 소켓 경로 (`port`와 배타적)
    pub socket_path: String,
    /// 동시 스캔 워커 수 (0이면 기본값)
    pub concurrency: usize,
}

impl ServerConfig {
    /// 실제 사용할 워커 수를 반환합니다. 0은 기본값으로 대체됩니다.
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            DEFAULT_SCAN_CONCURRENCY
        } else {
            self.concurrency
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            socket_path: String::new(),
            concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }
}

/// 취약점 백엔드(관리 콘솔) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// 콘솔 호스트 (비어 있으면 취약점 스캔 불가)
    pub url: String,
    /// 콘솔 포트
    pub port: String,
    /// 접근 키
    pub access_key: String,
    /// TLS 인증서 검증 생략 여부
    pub insecure_skip_verify: bool,
    /// 스캔 상태 재전송 간격 (초)
    pub status_heartbeat_secs: u64,
    /// 결과 폴링 간격 (초)
    pub results_poll_interval_secs: u64,
}

impl ConsoleConfig {
    /// 콘솔 연결 정보가 설정되었는지 반환합니다.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    /// 포트가 비어 있으면 기본 포트를 사용합니다.
    pub fn effective_port(&self) -> &str {
        if self.port.is_empty() {
            DEFAULT_CONSOLE_PORT
        } else {
            &self.port
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            port: DEFAULT_CONSOLE_PORT.to_owned(),
            access_key: String::new(),
            insecure_skip_verify: false,
            status_heartbeat_secs: 30,
            results_poll_interval_secs: 5,
        }
    }
}

/// 카탈로그 도구 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 도구 실행 명령 (바이너리와 선행 인자)
    pub syft_command: Vec<String>,
    /// 임시 파일 디렉토리 (비어 있으면 시스템 기본값)
    pub temp_dir: String,
    /// 시작 시 NFS/tmpfs 마운트 탐색 여부
    pub detect_mounts: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            syft_command: vec!["syft".to_owned()],
            temp_dir: String::new(),
            detect_mounts: true,
        }
    }
}

/// 컨테이너 런타임 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Docker 제어 소켓
    pub docker_socket: String,
    /// containerd 제어 소켓
    pub containerd_socket: String,
    /// CRI-O 제어 소켓
    pub crio_socket: String,
    /// 이미지 저장/클러스터 컨테이너에 사용할 containerd 네임스페이스
    pub containerd_image_namespace: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            containerd_socket: "/run/containerd/containerd.sock".to_owned(),
            crio_socket: "/var/run/crio/crio.sock".to_owned(),
            containerd_image_namespace: "k8s.io".to_owned(),
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 리스닝 주소
    pub listen_addr: String,
    /// 리스닝 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9108,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_words(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split_whitespace().map(str::to_owned).collect();
    }
}

//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 요청 수신(daemon), 동기 실행(cli), SBOM 파이프라인(sbom)이 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 디렉토리 대상 접두어
pub const DIR_SCHEME: &str = "dir:";

/// 레지스트리 대상 접두어
pub const REGISTRY_SCHEME: &str = "registry:";

/// 스캔 대상 노드 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// 호스트 파일시스템 (디렉토리 스캔)
    Host,
    /// 실행 중인 컨테이너
    Container,
    /// 컨테이너 이미지
    #[default]
    Image,
}

impl NodeType {
    /// 와이어/백엔드에서 사용하는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Container => "container",
            Self::Image => "image",
        }
    }

    /// 문자열 힌트를 해석합니다. 알 수 없는 값은 `None`.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "host" => Some(Self::Host),
            "container" => Some(Self::Container),
            "image" | "container_image" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 대상 문자열이 디렉토리 스캔(`dir:` 접두어 또는 `.`)인지 확인합니다.
pub fn is_directory_source(source: &str) -> bool {
    source.starts_with(DIR_SCHEME) || source == "."
}

/// 대상 문자열이 레지스트리 스캔인지 확인합니다.
pub fn is_registry_source(source: &str) -> bool {
    source.starts_with(REGISTRY_SCHEME)
}

/// 정책 게이트 임계값
///
/// 양수인 임계값만 활성화됩니다. 0 이하는 비활성.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    /// 전체 취약점 수 임계값
    pub fail_on_count: i64,
    /// Critical 취약점 수 임계값
    pub fail_on_critical_count: i64,
    /// High 취약점 수 임계값
    pub fail_on_high_count: i64,
    /// Medium 취약점 수 임계값
    pub fail_on_medium_count: i64,
    /// Low 취약점 수 임계값
    pub fail_on_low_count: i64,
    /// 누적 CVE 점수 임계값
    pub fail_on_score: f64,
}

impl PolicyThresholds {
    /// 활성화된 임계값이 하나라도 있는지 반환합니다.
    pub fn any_active(&self) -> bool {
        self.fail_on_count > 0
            || self.fail_on_critical_count > 0
            || self.fail_on_high_count > 0
            || self.fail_on_medium_count > 0
            || self.fail_on_low_count > 0
            || self.fail_on_score > 0.0
    }
}

/// 심각도별 취약점 수
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// 취약점 스캔 결과 요약
///
/// 스캔당 한 번 생성되며 이후 읽기 전용입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityScanDetail {
    /// 전체 취약점 수
    pub total: u64,
    /// 심각도별 취약점 수
    pub severity: SeverityCounts,
    /// 누적 CVE 점수
    pub cve_score: f64,
}

/// SBOM 생성 요청
///
/// 요청당 한 번 생성되며, 분류된 노드 식별자 주입 외에는 변경되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// 스캔 대상 (`dir:/path`, `.`, `registry:image:tag`, 이미지명, 컨테이너 ID)
    pub source: String,
    /// 분류된 노드 ID
    pub node_id: String,
    /// 분류된 노드 종류
    pub node_type: NodeType,
    /// 에코시스템 필터 (쉼표 구분 또는 "all")
    pub scan_type: String,
    /// 스캔 ID (백엔드 상관관계용)
    pub scan_id: String,
    /// 레지스트리 ID
    pub registry_id: String,
    /// 호스트명
    pub host_name: String,
    /// 이미지 ID
    pub image_id: String,
    /// 컨테이너 이름
    pub container_name: String,
    /// 컨테이너 ID
    pub container_id: String,
    /// 쿠버네티스 클러스터 이름
    pub kubernetes_cluster_name: String,
    /// 취약점 스캔 연동 여부
    pub vulnerability_scan: bool,
    /// 결과 출력 억제 여부
    pub quiet: bool,
    /// 정책 게이트 임계값
    pub thresholds: PolicyThresholds,
}

impl ScanRequest {
    /// 새 빌더를 생성합니다.
    pub fn builder(source: impl Into<String>) -> ScanRequestBuilder {
        ScanRequestBuilder::new(source)
    }

    /// 디렉토리 스캔 여부
    pub fn is_directory(&self) -> bool {
        is_directory_source(&self.source)
    }

    /// 레지스트리 스캔 여부
    pub fn is_registry(&self) -> bool {
        is_registry_source(&self.source)
    }
}

/// [`ScanRequest`] 빌더
#[derive(Debug, Clone)]
pub struct ScanRequestBuilder {
    request: ScanRequest,
}

impl ScanRequestBuilder {
    /// 대상 문자열로 빌더를 생성합니다.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            request: ScanRequest {
                source: source.into(),
                ..Default::default()
            },
        }
    }

    pub fn node(mut self, node_id: impl Into<String>, node_type: NodeType) -> Self {
        self.request.node_id = node_id.into();
        self.request.node_type = node_type;
        self
    }

    pub fn scan_type(mut self, scan_type: impl Into<String>) -> Self {
        self.request.scan_type = scan_type.into();
        self
    }

    pub fn scan_id(mut self, scan_id: impl Into<String>) -> Self {
        self.request.scan_id = scan_id.into();
        self
    }

    pub fn registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.request.registry_id = registry_id.into();
        self
    }

    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.request.host_name = host_name.into();
        self
    }

    pub fn image_id(mut self, image_id: impl Into<String>) -> Self {
        self.request.image_id = image_id.into();
        self
    }

    pub fn container_name(mut self, container_name: impl Into<String>) -> Self {
        self.request.container_name = container_name.into();
        self
    }

    pub fn container_id(mut self, container_id: impl Into<String>) -> Self {
        self.request.container_id = container_id.into();
        self
    }

    pub fn kubernetes_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.request.kubernetes_cluster_name = name.into();
        self
    }

    pub fn vulnerability_scan(mut self, enabled: bool) -> Self {
        self.request.vulnerability_scan = enabled;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.request.quiet = quiet;
        self
    }

    pub fn thresholds(mut self, thresholds: PolicyThresholds) -> Self {
        self.request.thresholds = thresholds;
        self
    }

    /// 요청을 완성합니다.
    pub fn build(self) -> ScanRequest {
        self.request
    }
}

//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `pkgscan_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(pkgscan_core::metrics::SCANS_STARTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 노드 종류 레이블 키 (host, container, image)
pub const LABEL_NODE_TYPE: &str = "node_type";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 정책 위반 종류 레이블 키 (count, critical, high, medium, low, score)
pub const LABEL_BREACH_KIND: &str = "kind";

// ─── 메트릭 이름 ────────────────────────────────────────────────────

/// 시작된 스캔 수 (Counter, label: node_type)
pub const SCANS_STARTED_TOTAL: &str = "pkgscan_scans_started_total";

/// 완료된 스캔 수 (Counter, label: result)
pub const SCANS_COMPLETED_TOTAL: &str = "pkgscan_scans_completed_total";

/// 실패한 스캔 수 (Counter)
pub const SCAN_FAILURES_TOTAL: &str = "pkgscan_scan_failures_total";

/// 정책 임계값 위반 수 (Counter, label: kind)
pub const POLICY_BREACHES_TOTAL: &str = "pkgscan_policy_breaches_total";

/// 스캔 소요 시간 (Histogram)
pub const SCAN_DURATION_SECONDS: &str = "pkgscan_scan_duration_seconds";

/// 워커 큐 대기 작업 수 (Gauge)
pub const WORKER_QUEUE_DEPTH: &str = "pkgscan_worker_queue_depth";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 스캔 소요 시간 히스토그램 버킷 (초)
///
/// 1s ~ 30m 범위 (이미지 저장, 카탈로그, 취약점 폴링 포함)
pub const SCAN_DURATION_BUCKETS: [f64; 10] = [
    1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 900.0, 1800.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        SCANS_STARTED_TOTAL,
        "Total number of SBOM generation attempts started"
    );
    describe_counter!(
        SCANS_COMPLETED_TOTAL,
        "Total number of SBOM generation attempts finished, by result"
    );
    describe_counter!(
        SCAN_FAILURES_TOTAL,
        "Total number of SBOM generation attempts that ended in an error"
    );
    describe_counter!(
        POLICY_BREACHES_TOTAL,
        "Total number of vulnerability threshold breaches"
    );
    describe_histogram!(
        SCAN_DURATION_SECONDS,
        "Time to complete a single SBOM generation in seconds"
    );
    describe_gauge!(
        WORKER_QUEUE_DEPTH,
        "Number of accepted scan requests waiting for a worker"
    );
}

//! 대상 분류기 — 스캔 대상 문자열을 (노드 ID, 노드 종류)로 정규화
//!
//! 분류 규칙 (먼저 일치하는 규칙 적용):
//!
//! 1. `dir:` 접두어 또는 `.` → `(host_name, Host)`
//! 2. 노드 종류 힌트가 `container` → `(source, Container)`
//! 3. 그 외 → `(source, Image)`
//!
//! 분류는 항상 성공하며 같은 입력에 같은 결과를 반환합니다.

use pkgscan_core::types::{NodeType, is_directory_source};

/// 스캔 대상을 분류합니다.
pub fn classify_target(source: &str, node_type_hint: &str, host_name: &str) -> (String, NodeType) {
    if is_directory_source(source) {
        return (host_name.to_owned(), NodeType::Host);
    }
    if NodeType::from_str_loose(node_type_hint) == Some(NodeType::Container) {
        return (source.to_owned(), NodeType::Container);
    }
    (source.to_owned(), NodeType::Image)
}

/// 커널에 설정된 호스트명을 읽습니다.
///
/// `/proc/sys/kernel/hostname` → `HOSTNAME` 환경변수 → `"localhost"` 순으로 시도합니다.
pub fn local_host_name() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "localhost".to_owned())
}

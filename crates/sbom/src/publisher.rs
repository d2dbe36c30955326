//! 취약점 백엔드(관리 콘솔) 연동
//!
//! [`ScanPublisher`]는 스캔 상태 알림, SBOM 제출, 결과 조회를,
//! [`RegistryResolver`]는 레지스트리 접속 정보 조회를 추상화합니다.
//! 운영 구현은 [`ConsoleClient`] (reqwest)이며, 테스트는 mock 구현을 사용합니다.
//!
//! # HTTP 계약
//!
//! ```text
//! POST /pkgscan/v1/scans/{scan_id}/status       {node_id, node_type, status, message}
//! POST /pkgscan/v1/scans/{scan_id}/sbom?node_id=&node_type=   body = SBOM
//! GET  /pkgscan/v1/scans/{scan_id}/results      {status, detail}
//! GET  /pkgscan/v1/registries/{id}/credentials  {insecure, auths}
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use pkgscan_core::config::ConsoleConfig;
use pkgscan_core::types::{NodeType, ScanRequest, VulnerabilityScanDetail};

use crate::error::SbomError;

/// 백엔드에 알리는 스캔 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// SBOM 생성 중 (하트비트로 반복 전송)
    GeneratingSbom,
    /// 실패
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneratingSbom => "GENERATING_SBOM",
            Self::Error => "ERROR",
        }
    }
}

/// 백엔드 호출에 필요한 스캔 식별 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    pub scan_id: String,
    pub node_id: String,
    pub node_type: NodeType,
}

impl ScanContext {
    pub fn from_request(request: &ScanRequest) -> Self {
        Self {
            scan_id: request.scan_id.clone(),
            node_id: request.node_id.clone(),
            node_type: request.node_type,
        }
    }
}

/// 레지스트리 접속 정보
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// TLS/HTTP 검증 생략 여부
    pub insecure: bool,
    /// Docker `config.json`의 `auths` 객체
    pub auths: serde_json::Value,
}

impl RegistrySettings {
    /// 자격 증명이 있는지 반환합니다.
    pub fn has_auths(&self) -> bool {
        match &self.auths {
            serde_json::Value::Object(map) => !map.is_empty(),
            _ => false,
        }
    }

    /// 카탈로그 도구에 넘길 Docker `config.json` 내용
    pub fn docker_config(&self) -> serde_json::Value {
        serde_json::json!({ "auths": self.auths })
    }
}

/// 스캔 진행 상황과 SBOM을 백엔드에 전달하는 trait
///
/// 하트비트 태스크와 공유하기 위해 `Send + Sync + 'static`을 요구합니다.
pub trait ScanPublisher: Send + Sync + 'static {
    /// 스캔 상태를 알립니다.
    fn publish_status(
        &self,
        ctx: &ScanContext,
        status: ScanStatus,
        message: &str,
    ) -> impl Future<Output = Result<(), SbomError>> + Send;

    /// SBOM을 제출하여 취약점 분석을 시작합니다.
    fn submit_sbom(
        &self,
        ctx: &ScanContext,
        sbom: &[u8],
    ) -> impl Future<Output = Result<(), SbomError>> + Send;

    /// 분석 결과를 조회합니다. 결과가 준비될 때까지 대기합니다.
    fn vulnerability_results(
        &self,
        ctx: &ScanContext,
    ) -> impl Future<Output = Result<VulnerabilityScanDetail, SbomError>> + Send;
}

/// 레지스트리 ID로 접속 정보를 조회하는 trait
pub trait RegistryResolver: Send + Sync + 'static {
    fn registry_settings(
        &self,
        registry_id: &str,
    ) -> impl Future<Output = Result<RegistrySettings, SbomError>> + Send;
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    node_id: &'a str,
    node_type: &'a str,
    status: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResultsBody {
    status: String,
    #[serde(default)]
    detail: Option<VulnerabilityScanDetail>,
    #[serde(default)]
    message: String,
}

/// 관리 콘솔 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    base_url: String,
    access_key: String,
    poll_interval: Duration,
}

impl ConsoleClient {
    /// 콘솔 설정으로 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// `console.url`이 비어 있거나 HTTP 클라이언트 생성에 실패하면 에러를 반환합니다.
    pub fn new(config: &ConsoleConfig) -> Result<Self, SbomError> {
        if !config.is_configured() {
            return Err(SbomError::Config {
                field: "console.url".to_owned(),
                reason: "must be set to talk to the vulnerability backend".to_owned(),
            });
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(|e| SbomError::Backend(format!("failed to build http client: {e}")))?;

        Ok(Self {
            http,
            base_url: format!(
                "https://{}:{}/pkgscan/v1",
                config.url,
                config.effective_port()
            ),
            access_key: config.access_key.clone(),
            poll_interval: Duration::from_secs(config.results_poll_interval_secs.max(1)),
        })
    }

    /// 기본 URL을 직접 지정합니다 (프록시, 테스트 서버 등).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SbomError> {
        let response = request
            .bearer_auth(&self.access_key)
            .send()
            .await
            .map_err(|e| SbomError::Backend(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| SbomError::Backend(e.to_string()))
    }
}

impl ScanPublisher for ConsoleClient {
    async fn publish_status(
        &self,
        ctx: &ScanContext,
        status: ScanStatus,
        message: &str,
    ) -> Result<(), SbomError> {
        debug!(scan_id = %ctx.scan_id, status = status.as_str(), "publishing scan status");
        let body = StatusBody {
            node_id: &ctx.node_id,
            node_type: ctx.node_type.as_str(),
            status: status.as_str(),
            message,
        };
        let path = format!("/scans/{}/status", ctx.scan_id);
        self.send(self.http.post(self.url(&path)).json(&body))
            .await
            .map(|_| ())
    }

    async fn submit_sbom(&self, ctx: &ScanContext, sbom: &[u8]) -> Result<(), SbomError> {
        debug!(scan_id = %ctx.scan_id, bytes = sbom.len(), "submitting sbom");
        let path = format!("/scans/{}/sbom", ctx.scan_id);
        let request = self
            .http
            .post(self.url(&path))
            .query(&[
                ("node_id", ctx.node_id.as_str()),
                ("node_type", ctx.node_type.as_str()),
            ])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(sbom.to_vec());
        self.send(request).await.map(|_| ())
    }

    async fn vulnerability_results(
        &self,
        ctx: &ScanContext,
    ) -> Result<VulnerabilityScanDetail, SbomError> {
        let path = format!("/scans/{}/results", ctx.scan_id);
        loop {
            let response = self.send(self.http.get(self.url(&path))).await?;
            let body: ResultsBody = response
                .json()
                .await
                .map_err(|e| SbomError::Backend(format!("invalid results body: {e}")))?;

            match body.status.as_str() {
                "COMPLETE" => return Ok(body.detail.unwrap_or_default()),
                "ERROR" => {
                    return Err(SbomError::Backend(format!(
                        "vulnerability scan failed: {}",
                        body.message
                    )));
                }
                other => {
                    debug!(scan_id = %ctx.scan_id, status = other, "results not ready");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

impl RegistryResolver for ConsoleClient {
    async fn registry_settings(&self, registry_id: &str) -> Result<RegistrySettings, SbomError> {
        let path = format!("/registries/{registry_id}/credentials");
        let response = self.send(self.http.get(self.url(&path))).await?;
        response
            .json()
            .await
            .map_err(|e| SbomError::Backend(format!("invalid registry credentials: {e}")))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_backend_contract() {
        assert_eq!(ScanStatus::GeneratingSbom.as_str(), "GENERATING_SBOM");
        assert_eq!(ScanStatus::Error.as_str(), "ERROR");
    }

    #[test]
    fn console_client_requires_url() {
        let err = ConsoleClient::new(&ConsoleConfig::default()).unwrap_err();
        assert!(matches!(err, SbomError::Config { .. }));
    }

    #[test]
    fn console_client_uses_default_port() {
        let config = ConsoleConfig {
            url: "console.internal".to_owned(),
            port: String::new(),
            ..Default::default()
        };
        let client = ConsoleClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://console.internal:443/pkgscan/v1");
    }

    #[test]
    fn console_client_polls_at_configured_interval() {
        let config = ConsoleConfig {
            url: "console.internal".to_owned(),
            results_poll_interval_secs: 9,
            ..Default::default()
        };
        let client = ConsoleClient::new(&config).unwrap();
        assert_eq!(client.poll_interval, Duration::from_secs(9));

        let zero = ConsoleConfig {
            results_poll_interval_secs: 0,
            ..config
        };
        let client = ConsoleClient::new(&zero).unwrap();
        assert_eq!(client.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn registry_settings_parse_and_render_docker_config() {
        let settings: RegistrySettings = serde_json::from_str(
            r#"{"insecure": true, "auths": {"registry.local:5000": {"auth": "dXNlcjpwYXNz"}}}"#,
        )
        .unwrap();
        assert!(settings.insecure);
        assert!(settings.has_auths());
        let config = settings.docker_config();
        assert_eq!(
            config["auths"]["registry.local:5000"]["auth"],
            "dXNlcjpwYXNz"
        );
    }

    #[test]
    fn empty_registry_settings_have_no_auths() {
        let settings: RegistrySettings = serde_json::from_str("{}").unwrap();
        assert!(!settings.insecure);
        assert!(!settings.has_auths());
    }

    #[test]
    fn scan_context_copies_request_identity() {
        let request = ScanRequest::builder("nginx")
            .node("nginx", NodeType::Image)
            .scan_id("scan-9")
            .build();
        let ctx = ScanContext::from_request(&request);
        assert_eq!(ctx.scan_id, "scan-9");
        assert_eq!(ctx.node_type, NodeType::Image);
    }

    #[test]
    fn results_body_accepts_missing_detail() {
        let body: ResultsBody = serde_json::from_str(r#"{"status": "IN_PROGRESS"}"#).unwrap();
        assert_eq!(body.status, "IN_PROGRESS");
        assert!(body.detail.is_none());
    }
}

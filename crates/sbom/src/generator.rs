//! SBOM 생성 오케스트레이터 -- 스캔 한 건의 전체 흐름 관리
//!
//! [`SbomGenerator`]는 프로세스 시작 시 한 번 생성되어 모든 스캔이 공유합니다.
//! 감지된 컨테이너 런타임과 탐색된 마운트 목록은 생성 시점에 고정됩니다.
//!
//! # 내부 흐름
//!
//! ```text
//! ScanRequest --> RegistryResolver (registry_id) --> CommandBuilder --> ExecutionPlan
//!                                                                          |
//!                                 VulnerabilityGate::begin --> ScanExecutor::execute
//!                                                                          |
//!                                                    VulnerabilityGate::finish --> ScanOutcome
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use pkgscan_container_runtime::RuntimeOps;
use pkgscan_core::metrics as m;
use pkgscan_core::types::{NodeType, ScanRequest};

use crate::command::CommandBuilder;
use crate::config::SbomConfig;
use crate::error::SbomError;
use crate::executor::ScanExecutor;
use crate::gate::{ScanOutcome, VulnerabilityGate};
use crate::publisher::{RegistryResolver, RegistrySettings, ScanContext, ScanPublisher};

/// SBOM 생성기
///
/// `R`은 감지된 컨테이너 런타임, `P`는 취약점 백엔드입니다.
/// 둘 다 없을 수 있으며, 없으면 해당 기능이 필요한 스캔만 실패합니다.
pub struct SbomGenerator<R, P> {
    config: SbomConfig,
    runtime: Option<Arc<R>>,
    console: Option<Arc<P>>,
    mounts: Vec<PathBuf>,
    executor: ScanExecutor,
}

impl<R, P> SbomGenerator<R, P>
where
    R: RuntimeOps,
    P: ScanPublisher + RegistryResolver,
{
    pub fn config(&self) -> &SbomConfig {
        &self.config
    }

    /// 스캔 한 건을 수행합니다.
    ///
    /// 정책 위반은 에러가 아니라 [`ScanOutcome::breach`]로 반환됩니다.
    pub async fn generate(&self, request: &ScanRequest) -> Result<ScanOutcome, SbomError> {
        let started = Instant::now();
        metrics::counter!(m::SCANS_STARTED_TOTAL, m::LABEL_NODE_TYPE => request.node_type.as_str())
            .increment(1);

        let result = self.run(request).await;

        metrics::histogram!(m::SCAN_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => {
                metrics::counter!(m::SCANS_COMPLETED_TOTAL, m::LABEL_RESULT => "success").increment(1);
                if let Some(breach) = &outcome.breach {
                    metrics::counter!(m::POLICY_BREACHES_TOTAL, m::LABEL_BREACH_KIND => breach.kind.as_str())
                        .increment(1);
                }
                info!(
                    scan_id = %request.scan_id,
                    node_id = %request.node_id,
                    bytes = outcome.sbom.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "sbom generated"
                );
            }
            Err(e) => {
                metrics::counter!(m::SCANS_COMPLETED_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                metrics::counter!(m::SCAN_FAILURES_TOTAL).increment(1);
                warn!(scan_id = %request.scan_id, node_id = %request.node_id, error = %e, "sbom generation failed");
            }
        }
        result
    }

    async fn run(&self, request: &ScanRequest) -> Result<ScanOutcome, SbomError> {
        if request.vulnerability_scan && self.console.is_none() {
            return Err(SbomError::Config {
                field: "console.url".to_owned(),
                reason: "vulnerability scan requested but no console is configured".to_owned(),
            });
        }

        let registry = self.registry_settings(request).await?;
        let insecure = registry.as_ref().is_some_and(|r| r.insecure);

        let temp_root = self.config.temp_root();
        let plan = CommandBuilder::new(self.runtime.as_deref(), &self.mounts, &temp_root)
            .build(request, insecure)
            .await?;

        let ctx = ScanContext::from_request(request);
        let mut gate = match (&self.console, request.vulnerability_scan) {
            (Some(console), true) => {
                VulnerabilityGate::new(Arc::clone(console), ctx, self.config.status_heartbeat())
            }
            _ => VulnerabilityGate::disabled(ctx),
        };
        gate.begin().await;

        let credentials = registry.as_ref().filter(|r| r.has_auths());
        let sbom = match self.executor.execute(plan, credentials).await {
            Ok(sbom) => sbom,
            Err(e) => {
                gate.fail(&e.to_string()).await;
                return Err(e);
            }
        };

        gate.finish(sbom, request.quiet, &request.thresholds).await
    }

    /// 요청의 레지스트리 접속 정보를 조회합니다.
    ///
    /// 레지스트리 ID가 있는 이미지 스캔에서만 조회합니다.
    async fn registry_settings(
        &self,
        request: &ScanRequest,
    ) -> Result<Option<RegistrySettings>, SbomError> {
        if request.registry_id.is_empty() || request.node_type != NodeType::Image {
            return Ok(None);
        }
        let Some(console) = &self.console else {
            warn!(
                registry_id = %request.registry_id,
                "no console configured, registry credentials unavailable"
            );
            return Ok(None);
        };
        debug!(registry_id = %request.registry_id, "resolving registry settings");
        console.registry_settings(&request.registry_id).await.map(Some)
    }
}

/// SBOM 생성기 빌더
pub struct SbomGeneratorBuilder<R, P> {
    config: SbomConfig,
    runtime: Option<Arc<R>>,
    console: Option<Arc<P>>,
    mounts: Vec<PathBuf>,
}

impl<R, P> SbomGeneratorBuilder<R, P>
where
    R: RuntimeOps,
    P: ScanPublisher + RegistryResolver,
{
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: SbomConfig::default(),
            runtime: None,
            console: None,
            mounts: Vec::new(),
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: SbomConfig) -> Self {
        self.config = config;
        self
    }

    /// 감지된 컨테이너 런타임을 지정합니다.
    pub fn runtime(mut self, runtime: Arc<R>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// 취약점 백엔드를 지정합니다.
    pub fn console(mut self, console: Arc<P>) -> Self {
        self.console = Some(console);
        self
    }

    /// 디렉토리 스캔에서 제외할 마운트 목록을 지정합니다.
    pub fn mounts(mut self, mounts: Vec<PathBuf>) -> Self {
        self.mounts = mounts;
        self
    }

    /// 생성기를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패 시 `SbomError::Config`.
    pub fn build(self) -> Result<SbomGenerator<R, P>, SbomError> {
        self.config.validate()?;
        let executor = ScanExecutor::new(&self.config);
        Ok(SbomGenerator {
            config: self.config,
            runtime: self.runtime,
            console: self.console,
            mounts: self.mounts,
            executor,
        })
    }
}

impl<R, P> Default for SbomGeneratorBuilder<R, P>
where
    R: RuntimeOps,
    P: ScanPublisher + RegistryResolver,
{
    fn default() -> Self {
        Self::new()
    }
}

//! 취약점 게이트 — 스캔 단계 알림, SBOM 제출, 결과 조회, 정책 임계값 평가
//!
//! # 상태 전이
//!
//! ```text
//! Idle ──begin()──▶ Generating ──finish()──▶ Scanning ──▶ Completed
//!                        │                      │
//!                        └──fail()──▶ Failed ◀──┘
//! ```
//!
//! - `Generating` 동안 `GENERATING_SBOM` 상태를 하트비트 간격으로 재전송합니다.
//! - 임계값 위반은 프로세스를 종료하지 않고 [`PolicyBreach`]로 반환됩니다.
//!   종료 여부는 최상위 동기 호출자(CLI)가 결정합니다.
//! - 비활성 게이트는 백엔드를 전혀 호출하지 않습니다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use pkgscan_core::types::{PolicyThresholds, VulnerabilityScanDetail};

use crate::error::SbomError;
use crate::publisher::{ScanContext, ScanPublisher, ScanStatus};

/// 게이트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Generating,
    Scanning,
    Completed,
    Failed,
}

/// 위반된 임계값 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachKind {
    TotalCount,
    CriticalCount,
    HighCount,
    MediumCount,
    LowCount,
    Score,
}

impl BreachKind {
    /// 메트릭 레이블 값
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalCount => "count",
            Self::CriticalCount => "critical",
            Self::HighCount => "high",
            Self::MediumCount => "medium",
            Self::LowCount => "low",
            Self::Score => "score",
        }
    }
}

impl fmt::Display for BreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정책 임계값 위반
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyBreach {
    pub kind: BreachKind,
    /// 측정값 (개수 또는 점수)
    pub measured: f64,
    /// 임계값
    pub limit: f64,
}

impl fmt::Display for PolicyBreach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BreachKind::Score => write!(
                f,
                "Exit vulnerability scan. Vulnerability score ({:.6}) reached/exceeded the limit ({:.6}).",
                self.measured, self.limit
            ),
            _ => write!(
                f,
                "Exit vulnerability scan. Number of vulnerabilities ({}) reached/exceeded the limit ({}).",
                self.measured as i64, self.limit as i64
            ),
        }
    }
}

/// 결과를 임계값과 비교합니다.
///
/// 활성(양수) 임계값만 검사하며, 순서는 전체 → critical → high → medium → low → 점수.
/// 처음 위반된(`>=`) 임계값이 반환됩니다.
pub fn evaluate_thresholds(
    detail: &VulnerabilityScanDetail,
    thresholds: &PolicyThresholds,
) -> Option<PolicyBreach> {
    let counts = [
        (BreachKind::TotalCount, detail.total, thresholds.fail_on_count),
        (
            BreachKind::CriticalCount,
            detail.severity.critical,
            thresholds.fail_on_critical_count,
        ),
        (
            BreachKind::HighCount,
            detail.severity.high,
            thresholds.fail_on_high_count,
        ),
        (
            BreachKind::MediumCount,
            detail.severity.medium,
            thresholds.fail_on_medium_count,
        ),
        (
            BreachKind::LowCount,
            detail.severity.low,
            thresholds.fail_on_low_count,
        ),
    ];

    let count_breach = counts
        .into_iter()
        .filter(|(_, _, limit)| *limit > 0)
        .find(|(_, measured, limit)| *measured >= *limit as u64)
        .map(|(kind, measured, limit)| PolicyBreach {
            kind,
            measured: measured as f64,
            limit: limit as f64,
        });
    if count_breach.is_some() {
        return count_breach;
    }

    if thresholds.fail_on_score > 0.0 && detail.cve_score >= thresholds.fail_on_score {
        return Some(PolicyBreach {
            kind: BreachKind::Score,
            measured: detail.cve_score,
            limit: thresholds.fail_on_score,
        });
    }
    None
}

/// 게이트를 통과한 스캔 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// 카탈로그 도구가 만든 SBOM (그대로)
    pub sbom: Vec<u8>,
    /// 취약점 분석 결과 (조회를 건너뛰었으면 `None`)
    pub detail: Option<VulnerabilityScanDetail>,
    /// 위반된 임계값
    pub breach: Option<PolicyBreach>,
}

struct Heartbeat {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// 스캔 한 건의 취약점 게이트
pub struct VulnerabilityGate<P: ScanPublisher> {
    publisher: Option<Arc<P>>,
    ctx: ScanContext,
    heartbeat_interval: Duration,
    state: GateState,
    heartbeat: Option<Heartbeat>,
}

impl<P: ScanPublisher> VulnerabilityGate<P> {
    /// 백엔드와 연동하는 게이트를 생성합니다.
    pub fn new(publisher: Arc<P>, ctx: ScanContext, heartbeat_interval: Duration) -> Self {
        Self {
            publisher: Some(publisher),
            ctx,
            heartbeat_interval,
            state: GateState::Idle,
            heartbeat: None,
        }
    }

    /// 백엔드를 호출하지 않는 비활성 게이트를 생성합니다.
    pub fn disabled(ctx: ScanContext) -> Self {
        Self {
            publisher: None,
            ctx,
            heartbeat_interval: Duration::ZERO,
            state: GateState::Idle,
            heartbeat: None,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// `Generating` 단계로 진입하고 하트비트를 시작합니다.
    pub async fn begin(&mut self) {
        self.state = GateState::Generating;
        let Some(publisher) = self.publisher.clone() else {
            return;
        };

        announce(&*publisher, &self.ctx, ScanStatus::GeneratingSbom, "").await;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let ctx = self.ctx.clone();
        let period = self.heartbeat_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // 첫 tick은 즉시 완료됨
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        announce(&*publisher, &ctx, ScanStatus::GeneratingSbom, "").await;
                    }
                }
            }
        });
        self.heartbeat = Some(Heartbeat { cancel, handle });
    }

    /// 실패를 알리고 `Failed` 상태로 전이합니다.
    pub async fn fail(&mut self, diagnostic: &str) {
        self.stop_heartbeat().await;
        self.state = GateState::Failed;
        if let Some(publisher) = &self.publisher {
            announce(&**publisher, &self.ctx, ScanStatus::Error, diagnostic).await;
        }
    }

    /// SBOM을 제출하고 결과를 평가합니다.
    ///
    /// `quiet`이고 활성 임계값이 없으면 결과 조회를 건너뜁니다.
    ///
    /// # Errors
    ///
    /// 제출 또는 결과 조회 실패 시 `SbomError::Backend` (게이트는 `Failed`).
    pub async fn finish(
        &mut self,
        sbom: Vec<u8>,
        quiet: bool,
        thresholds: &PolicyThresholds,
    ) -> Result<ScanOutcome, SbomError> {
        self.stop_heartbeat().await;
        self.state = GateState::Scanning;

        let Some(publisher) = self.publisher.clone() else {
            self.state = GateState::Completed;
            return Ok(ScanOutcome {
                sbom,
                ..Default::default()
            });
        };

        if let Err(e) = publisher.submit_sbom(&self.ctx, &sbom).await {
            self.fail(&e.to_string()).await;
            return Err(e);
        }

        if quiet && !thresholds.any_active() {
            debug!(scan_id = %self.ctx.scan_id, "quiet scan without thresholds, skipping results");
            self.state = GateState::Completed;
            return Ok(ScanOutcome {
                sbom,
                ..Default::default()
            });
        }

        let detail = match publisher.vulnerability_results(&self.ctx).await {
            Ok(detail) => detail,
            Err(e) => {
                self.fail(&e.to_string()).await;
                return Err(e);
            }
        };
        let breach = evaluate_thresholds(&detail, thresholds);
        if let Some(breach) = &breach {
            warn!(scan_id = %self.ctx.scan_id, kind = %breach.kind, "{breach}");
        }

        self.state = GateState::Completed;
        Ok(ScanOutcome {
            sbom,
            detail: Some(detail),
            breach,
        })
    }

    async fn stop_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel.cancel();
            if let Err(e) = heartbeat.handle.await {
                warn!(error = %e, "status heartbeat task ended abnormally");
            }
        }
    }
}

impl<P: ScanPublisher> Drop for VulnerabilityGate<P> {
    fn drop(&mut self) {
        if let Some(heartbeat) = &self.heartbeat {
            heartbeat.cancel.cancel();
        }
    }
}

/// 상태를 전송합니다. 실패는 스캔을 중단시키지 않습니다.
async fn announce<P: ScanPublisher>(
    publisher: &P,
    ctx: &ScanContext,
    status: ScanStatus,
    message: &str,
) {
    if let Err(e) = publisher.publish_status(ctx, status, message).await {
        warn!(scan_id = %ctx.scan_id, status = status.as_str(), error = %e, "failed to publish scan status");
    }
}

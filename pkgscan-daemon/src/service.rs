//! `pkgscan.v1.PackageScanner` service implementation.
//!
//! `GenerateSbom` classifies the target, enqueues the scan and answers
//! immediately. The caller gets no completion signal; failures are visible
//! only in logs and in `pkgscan_scan_failures_total`.

use tonic::{Request, Response, Status};
use tracing::{info, instrument};

use pkgscan_api::{PackageScanner, SbomRequest, SbomResult};
use pkgscan_core::ScanRequest;
use pkgscan_sbom::classify_target;

use crate::pool::PoolHandle;

/// Acknowledgement returned for every accepted request.
pub const SCAN_STARTED: &str = "sbom generation started";

/// gRPC service backed by the scan worker pool.
#[derive(Debug, Clone)]
pub struct PackageScannerService {
    pool: PoolHandle,
}

impl PackageScannerService {
    pub fn new(pool: PoolHandle) -> Self {
        Self { pool }
    }
}

/// Map an inbound request to a scan request.
///
/// Service scans always report to the vulnerability backend and never
/// render results locally.
pub fn scan_request_from(request: SbomRequest) -> ScanRequest {
    let (node_id, node_type) =
        classify_target(&request.source, &request.node_type, &request.host_name);
    ScanRequest::builder(request.source)
        .node(node_id, node_type)
        .scan_type(request.scan_type)
        .scan_id(request.scan_id)
        .host_name(request.host_name)
        .image_id(request.image_id)
        .container_name(request.container_name)
        .container_id(request.container_id)
        .kubernetes_cluster_name(request.kubernetes_cluster_name)
        .registry_id(request.registry_id)
        .vulnerability_scan(true)
        .quiet(true)
        .build()
}

#[tonic::async_trait]
impl PackageScanner for PackageScannerService {
    #[instrument(skip_all, fields(scan_id = %request.get_ref().scan_id))]
    async fn generate_sbom(
        &self,
        request: Request<SbomRequest>,
    ) -> Result<Response<SbomResult>, Status> {
        let scan = scan_request_from(request.into_inner());
        let source = scan.source.clone();
        let node_type = scan.node_type;
        let job_id = self
            .pool
            .submit(scan)
            .map_err(|e| Status::unavailable(e.to_string()))?;

        info!(%job_id, %source, %node_type, queued = self.pool.queued(), "scan accepted");
        Ok(Response::new(SbomResult {
            sbom: SCAN_STARTED.to_owned(),
        }))
    }
}

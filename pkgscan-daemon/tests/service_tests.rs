//! End-to-end tests for the request service.
//!
//! A daemon is started on an ephemeral TCP port with runtime sockets pointed
//! at an empty directory, then driven through the generated gRPC client.

use std::time::Duration;

use pkgscan_api::{PackageScannerClient, SbomRequest};
use pkgscan_core::PkgscanConfig;
use pkgscan_daemon::daemon;
use pkgscan_daemon::service::SCAN_STARTED;
use tokio::sync::oneshot;

fn test_config(dir: &std::path::Path) -> PkgscanConfig {
    let mut config = PkgscanConfig::default();
    config.server.port = "0".to_owned();
    config.server.concurrency = 2;
    config.scanner.syft_command = vec!["true".to_owned()];
    config.scanner.temp_dir = dir.display().to_string();
    config.scanner.detect_mounts = false;
    config.runtime.docker_socket = dir.join("docker.sock").display().to_string();
    config.runtime.containerd_socket = dir.join("containerd.sock").display().to_string();
    config.runtime.crio_socket = dir.join("crio.sock").display().to_string();
    config
}

struct RunningDaemon {
    port: u16,
    stop: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<anyhow::Result<()>>,
}

async fn start(config: PkgscanConfig) -> RunningDaemon {
    let (bound_tx, bound_rx) = oneshot::channel::<String>();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(daemon::run(
        config,
        move |addr| {
            let _ = bound_tx.send(addr.to_owned());
        },
        async move {
            let _ = stop_rx.await;
        },
    ));
    let addr = tokio::time::timeout(Duration::from_secs(5), bound_rx)
        .await
        .expect("daemon should bind within 5s")
        .expect("bound address");
    let port = addr
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .expect("bound address carries a port");
    RunningDaemon { port, stop, task }
}

#[tokio::test]
async fn generate_sbom_is_acknowledged_immediately() {
    // Given: a running daemon
    let dir = tempfile::tempdir().unwrap();
    let daemon = start(test_config(dir.path())).await;
    let mut client = PackageScannerClient::connect(format!("http://127.0.0.1:{}", daemon.port))
        .await
        .unwrap();

    // When: a scan is requested
    let response = client
        .generate_sbom(SbomRequest {
            source: "dir:/tmp".to_owned(),
            scan_type: "python".to_owned(),
            scan_id: "scan-1".to_owned(),
            host_name: "node-a".to_owned(),
            ..Default::default()
        })
        .await
        .unwrap();

    // Then: the fixed acknowledgement comes back
    assert_eq!(response.into_inner().sbom, SCAN_STARTED);

    daemon.stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(10), daemon.task)
        .await
        .expect("daemon should stop after shutdown signal")
        .unwrap();
    assert!(result.is_ok(), "daemon exited with {result:?}");
}

#[tokio::test]
async fn many_requests_are_all_acknowledged() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = start(test_config(dir.path())).await;
    let mut client = PackageScannerClient::connect(format!("http://127.0.0.1:{}", daemon.port))
        .await
        .unwrap();

    for i in 0..10 {
        let response = client
            .generate_sbom(SbomRequest {
                source: format!("nginx:1.{i}"),
                node_type: "image".to_owned(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.into_inner().sbom, SCAN_STARTED);
    }

    daemon.stop.send(()).unwrap();
    assert!(daemon.task.await.unwrap().is_ok());
}

#[tokio::test]
async fn unix_socket_is_removed_after_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("pkgscan.sock");
    let mut config = test_config(dir.path());
    config.server.port.clear();
    config.server.socket_path = socket.display().to_string();

    let (bound_tx, bound_rx) = oneshot::channel::<String>();
    let (stop, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(daemon::run(
        config,
        move |addr| {
            let _ = bound_tx.send(addr.to_owned());
        },
        async move {
            let _ = stop_rx.await;
        },
    ));

    let bound = bound_rx.await.unwrap();
    assert_eq!(bound, socket.display().to_string());
    assert!(socket.exists());

    stop.send(()).unwrap();
    assert!(task.await.unwrap().is_ok());
    assert!(!socket.exists(), "socket file should be cleaned up");
}

#[tokio::test]
async fn missing_listener_fails_before_binding() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.server.port.clear();

    let result = daemon::run(config, |_| panic!("must not bind"), async {}).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("socket_path or server.port"));
}

//! Shared fixtures for integration tests

use hdfs_bridge::protocol::{Server, ServerMode};
use hdfs_bridge::{BridgeService, FsEndpoint, LocalFileSystem, StatsSnapshot};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Endpoint every fixture serves
#[allow(dead_code)]
pub fn endpoint() -> FsEndpoint {
    FsEndpoint::new("localhost", 8020)
}

/// A service over a fresh scratch namespace
#[allow(dead_code)]
pub fn service() -> (TempDir, BridgeService<LocalFileSystem>) {
    let temp_dir = TempDir::new().unwrap();
    let fs = LocalFileSystem::new(endpoint(), temp_dir.path());
    (temp_dir, BridgeService::new(fs))
}

/// A server running on an ephemeral localhost port
#[allow(dead_code)]
pub struct RunningServer {
    pub temp_dir: TempDir,
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<StatsSnapshot>,
}

#[allow(dead_code)]
impl RunningServer {
    /// Bind and start serving a scratch namespace
    pub async fn start(mode: ServerMode) -> Self {
        let (temp_dir, service) = service();
        let server = Server::bind("127.0.0.1:0", service, mode).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = shutdown_rx.await;
        }));
        Self {
            temp_dir,
            addr,
            shutdown: Some(shutdown),
            task,
        }
    }

    /// Stop the server and return its final counters
    pub async fn stop(mut self) -> (TempDir, StatsSnapshot) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let stats = tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("server did not stop")
            .unwrap();
        (self.temp_dir, stats)
    }
}

#[allow(dead_code)]
pub struct TestTimeoutGuard {
    cancelled: Arc<AtomicBool>,
}

impl Drop for TestTimeoutGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[allow(dead_code)]
pub fn test_timeout_guard(duration: Duration) -> TestTimeoutGuard {
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = Arc::clone(&cancelled);
    std::thread::spawn(move || {
        std::thread::sleep(duration);
        if !cancelled_clone.load(Ordering::SeqCst) {
            eprintln!("Test timeout exceeded ({}s). Aborting.", duration.as_secs());
            std::process::abort();
        }
    });
    TestTimeoutGuard { cancelled }
}

//! Test server harness.

use seqscore::batch::BatchOrchestrator;
use seqscore::gateway::{HandlerState, create_router_with_state};
use seqscore::strategy::StrategySelector;
use seqscore::upstream::{CompletionProvider, MockProvider};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;
pub const TEST_MODEL: &str = "mock/echo-model";

#[derive(Clone)]
pub struct TestServerConfig {
    pub provider: Arc<dyn CompletionProvider>,
    pub default_model: Option<String>,
    pub max_concurrency: usize,
    pub deadline: Duration,
    pub max_candidates: usize,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            provider: Arc::new(MockProvider::new()),
            default_model: Some(TEST_MODEL.to_string()),
            max_concurrency: 4,
            deadline: Duration::from_secs(10),
            max_candidates: 16,
        }
    }
}

impl TestServerConfig {
    pub fn with_provider(mut self, provider: impl CompletionProvider + 'static) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn wait_for_server_ready(
    addr: SocketAddr,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();

    loop {
        if start.elapsed() > timeout {
            return Err(ServerStartupError::Timeout);
        }

        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => {
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

/// Spawns the real router on an ephemeral port, backed by `config.provider`
/// (the scripted [`MockProvider`] unless a test swaps it).
pub async fn spawn_test_server(config: TestServerConfig) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let local_addr = listener.local_addr()?;

    let selector = Arc::new(StrategySelector::new(config.provider, config.default_model));
    let orchestrator = Arc::new(BatchOrchestrator::new(
        selector,
        config.max_concurrency,
        config.deadline,
    ));
    let app = create_router_with_state(HandlerState::new(orchestrator, config.max_candidates));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    wait_for_server_ready(
        local_addr,
        Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS),
        Duration::from_millis(STARTUP_POLL_INTERVAL_MS),
    )
    .await?;

    Ok(TestServer {
        addr: local_addr,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}

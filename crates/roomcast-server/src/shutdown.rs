//! Server teardown: stop accepting, close every hub session, wait for tasks.

use std::time::Duration;

use roomcast_hub::Hub;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`ShutdownCoordinator::graceful_shutdown`] waits by default.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a graceful shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Sessions still registered when the wait ended.
    pub sessions_open: usize,
    /// Whether the timeout expired before sessions and tasks were done.
    pub timed_out: bool,
}

/// Owns the listener's cancellation token and the hub's teardown.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    hub: Hub,
}

impl ShutdownCoordinator {
    /// Coordinator for `hub`.
    pub fn new(hub: Hub) -> Self {
        Self {
            token: CancellationToken::new(),
            hub,
        }
    }

    /// Token the HTTP listener stops on.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting and close every session. Repeated calls do nothing.
    pub fn shutdown(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.hub.shutdown();
    }

    /// Whether a shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Shut down, then wait up to `timeout` for the hub to empty and for
    /// `handles` to finish.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> ShutdownReport {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown();
        info!(
            sessions = self.hub.session_count(),
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "draining"
        );

        let drain = async {
            self.hub.idle().await;
            drop(futures::future::join_all(handles).await);
        };
        let timed_out = tokio::time::timeout(timeout, drain).await.is_err();
        let report = ShutdownReport {
            sessions_open: self.hub.session_count(),
            timed_out,
        };
        if timed_out {
            warn!(sessions_open = report.sessions_open, "shutdown timed out after {timeout:?}");
        } else {
            info!("all sessions closed");
        }
        report
    }
}

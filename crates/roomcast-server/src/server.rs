//! `RoomcastServer`: Axum HTTP + WebSocket server in front of a [`Hub`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::{FromRef, State};
use axum::response::Json;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use roomcast_hub::Hub;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::JwtVerifier;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics;
use crate::rooms;
use crate::shutdown::{ShutdownCoordinator, ShutdownReport};
use crate::websocket;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The hub every connection is registered with.
    pub hub: Hub,
    /// Token verification.
    pub verifier: Arc<JwtVerifier>,
    /// Listener and heartbeat settings.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle.
    pub metrics: PrometheusHandle,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.verifier)
    }
}

/// The roomcast server.
pub struct RoomcastServer {
    config: Arc<ServerConfig>,
    hub: Hub,
    verifier: Arc<JwtVerifier>,
    metrics: PrometheusHandle,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl RoomcastServer {
    /// Create a new server around an existing hub.
    pub fn new(
        config: ServerConfig,
        hub: Hub,
        verifier: JwtVerifier,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: Arc::new(ShutdownCoordinator::new(hub.clone())),
            hub,
            verifier: Arc::new(verifier),
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: self.hub.clone(),
            verifier: Arc::clone(&self.verifier),
            config: Arc::clone(&self.config),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(websocket::ws_handler))
            .route("/rooms/{code}/online", get(rooms::online_handler))
            .route("/rooms/{code}/events", post(rooms::publish_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown is requested.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = served {
                error!(error = %e, "server error");
            }
        });
        info!(%addr, "roomcast server listening");
        Ok((addr, handle))
    }

    /// Stop accepting, close every session, and wait for `handles`.
    pub async fn stop(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> ShutdownReport {
        self.shutdown.graceful_shutdown(handles, timeout).await
    }

    /// The hub behind this server.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.hub.session_count(),
        state.hub.room_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    metrics::render(&state.metrics)
}

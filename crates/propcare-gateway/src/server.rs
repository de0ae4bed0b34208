// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the chat surface.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use dashmap::DashMap;
use propcare_config::model::ServerConfig;
use propcare_core::PropcareError;
use propcare_core::traits::SessionStore;
use propcare_triage::TurnOrchestrator;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Upper bound on requests processed at once.
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub sessions: Arc<dyn SessionStore>,
    /// One mutex per in-flight session ID. Entries are dropped once idle.
    pub session_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<TurnOrchestrator>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            orchestrator,
            sessions,
            session_locks: Arc::new(DashMap::new()),
            start_time: Instant::now(),
        }
    }
}

/// Builds the CORS layer. A `*` entry allows any origin; entries that are
/// not valid header values are skipped with a warning.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Routes:
/// - POST /v1/chat
/// - GET /health
pub fn build_router(state: GatewayState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/v1/chat", post(handlers::post_chat))
        .route("/health", get(handlers::get_health))
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

/// Binds to the configured host:port and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), PropcareError> {
    let app = build_router(state, &config.allowed_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PropcareError::Config(format!("failed to bind server to {addr}: {e}")))?;

    tracing::info!("server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| PropcareError::Internal(format!("server error: {e}")))?;

    tracing::info!("server stopped");
    Ok(())
}

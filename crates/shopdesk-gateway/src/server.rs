// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use shopdesk_agent::ChatPipeline;
use shopdesk_config::ShopdeskConfig;
use shopdesk_core::{ShopdeskError, ToolLayer};
use shopdesk_tools::ToolServer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, PERMISSIONS_HEADER, SESSION_ID_HEADER, USER_ID_HEADER, auth_middleware};
use crate::handlers;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
    /// Renders Prometheus text; `None` disables `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: ChatPipeline,
    pub tool_server: Arc<ToolServer>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

impl GatewayState {
    /// State serving `pipeline`, with the tool server over `tools`.
    pub fn new(config: &ShopdeskConfig, pipeline: ChatPipeline, tools: Arc<dyn ToolLayer>) -> Self {
        Self {
            pipeline,
            tool_server: Arc::new(ToolServer::new(tools)),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: None,
            },
        }
    }

    /// Enables `/metrics` with the given renderer.
    pub fn with_metrics(mut self, render: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.health.prometheus_render = Some(Arc::new(render));
        self
    }
}

/// Listener and browser-facing settings, taken from `[server]` and `[gateway]`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. `"*"` allows any; empty allows none.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_config(config: &ShopdeskConfig) -> Self {
        Self {
            host: config.server.bind_address.clone(),
            port: config.server.port,
            cors_origins: config.gateway.cors_origins.clone(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(PERMISSIONS_HEADER),
            HeaderName::from_static(SESSION_ID_HEADER),
        ]);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Builds the gateway router.
///
/// - `GET /health`, `GET /metrics` (public)
/// - `POST /v1/chat`, `GET /v1/chat/usage`, `POST /v1/chat/limits/reset`,
///   `GET /v1/analytics/summary`, `POST /v1/tools/rpc` (bearer auth)
pub fn router(state: GatewayState, cors_origins: &[String]) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/chat", post(handlers::post_chat))
        .route("/v1/chat/usage", get(handlers::get_usage))
        .route("/v1/chat/limits/reset", post(handlers::post_reset_limits))
        .route("/v1/analytics/summary", get(handlers::get_analytics_summary))
        .route("/v1/tools/rpc", post(handlers::post_tools_rpc))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Serves the gateway until `shutdown` resolves.
pub async fn start_server<F>(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: F,
) -> Result<(), ShopdeskError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state, &config.cors_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ShopdeskError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ShopdeskError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

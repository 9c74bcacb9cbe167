// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shopdesk_agent::{AnalyticsSummary, HealthReport, UsageReport, rate_limiter::RateLimiterStatus};

use crate::auth::caller_context;
use crate::server::GatewayState;
use crate::sse;

/// Days summarized when the caller does not say.
const DEFAULT_SUMMARY_DAYS: u32 = 7;
/// Daily counters are kept for 30 days.
const MAX_SUMMARY_DAYS: u32 = 30;

/// Request body for POST /v1/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    /// Continue an existing chat session.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response body for GET /v1/chat/usage.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub usage: UsageReport,
    pub rate_limiter: RateLimiterStatus,
}

/// Response body for POST /v1/chat/limits/reset.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub reset: bool,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    #[serde(default)]
    pub days: Option<u32>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub report: HealthReport,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A handler failure rendered as a JSON [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// POST /v1/chat
///
/// Streams pipeline events as SSE when the client accepts
/// `text/event-stream`, otherwise waits for the final result.
pub async fn post_chat(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let ctx = caller_context(&headers, body.session_id)?;

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept.contains("text/event-stream") {
        let events = state.pipeline.process_stream(body.query, ctx);
        return Ok(sse::event_stream(events).into_response());
    }

    let result = state.pipeline.process(body.query, ctx).await;
    Ok(Json(result).into_response())
}

/// GET /v1/chat/usage
pub async fn get_usage(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Json<UsageResponse>, ApiError> {
    let ctx = caller_context(&headers, None)?;
    let limiter = state.pipeline.rate_limiter();
    Ok(Json(UsageResponse {
        usage: limiter.get_current_usage(&ctx).await,
        rate_limiter: limiter.circuit_breaker_status(),
    }))
}

/// POST /v1/chat/limits/reset
///
/// Clears the caller's own quota. Requires admin permission.
pub async fn post_reset_limits(
    State(state): State<GatewayState>,
    headers: HeaderMap,
) -> Result<Json<ResetResponse>, ApiError> {
    let ctx = caller_context(&headers, None)?;
    if !ctx.is_admin() {
        tracing::warn!(user_id = ctx.user_id(), "rate limit reset denied");
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            "Insufficient permissions",
        ));
    }
    let reset = state.pipeline.rate_limiter().reset_user_limits(&ctx).await;
    Ok(Json(ResetResponse {
        reset,
        user_id: ctx.user_id().to_string(),
    }))
}

/// GET /v1/analytics/summary?days=N
pub async fn get_analytics_summary(
    State(state): State<GatewayState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("days must be between 1 and {MAX_SUMMARY_DAYS}"),
        ));
    }
    state
        .pipeline
        .analytics()
        .get_analytics_summary(days)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(error = %e, "analytics summary failed");
            ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "analytics unavailable")
        })
}

/// POST /v1/tools/rpc
///
/// Protocol errors travel inside the JSON-RPC envelope, so this always
/// answers 200.
pub async fn post_tools_rpc(
    State(state): State<GatewayState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    Json(state.tool_server.handle_value(body).await).into_response()
}

/// GET /health (unauthenticated)
///
/// 200 while every collaborator is healthy, 503 otherwise.
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let report = state.pipeline.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthResponse {
        report,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    };
    (status, Json(body)).into_response()
}

/// GET /metrics (unauthenticated)
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            render(),
        )
            .into_response(),
        None => ApiError::new(StatusCode::NOT_FOUND, "metrics not enabled").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_deserializes_with_query_only() {
        let req: ChatRequest = serde_json::from_str(r#"{"query": "sales?"}"#).unwrap();
        assert_eq!(req.query, "sales?");
        assert!(req.session_id.is_none());
    }

    #[test]
    fn chat_request_requires_query() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"session_id": "s"}"#).is_err());
    }

    #[test]
    fn api_error_carries_status() {
        let response = ApiError::new(StatusCode::FORBIDDEN, "nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn summary_days_default_to_none() {
        let params: SummaryParams = serde_json::from_str("{}").unwrap();
        assert!(params.days.is_none());
    }
}

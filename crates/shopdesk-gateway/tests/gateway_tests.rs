// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway routes over a mock-backed pipeline.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use serde_json::{Value, json};
use shopdesk_core::Intent;
use shopdesk_gateway::{GatewayState, router};
use shopdesk_test_utils::{TestHarness, classification, generation};
use tower::ServiceExt; // for `oneshot`

const TOKEN: &str = "test-token";

fn state(harness: &TestHarness) -> GatewayState {
    let mut state = GatewayState::new(
        &harness.config,
        harness.pipeline.clone(),
        harness.tools.clone(),
    );
    state.auth.bearer_token = Some(TOKEN.to_string());
    state
}

fn app(harness: &TestHarness) -> Router {
    router(state(harness), &[])
}

fn api(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header("x-user-id", "u1")
        .header("x-permissions", "read")
}

fn chat_body(query: &str) -> Body {
    Body::from(json!({"query": query, "session_id": "s1"}).to_string())
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::new().await.unwrap();
    let response = app(&harness)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    assert_eq!(body["services"]["store"]["status"], "healthy");
}

#[tokio::test]
async fn unhealthy_store_makes_health_unavailable() {
    let harness = TestHarness::new().await.unwrap();
    harness.store.set_failing(true);
    let response = app(&harness)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn chat_requires_bearer_token() {
    let harness = TestHarness::new().await.unwrap();
    let request = Request::post("/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .header("x-user-id", "u1")
        .body(chat_body("sales"))
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.provider.call_count(), 0);
}

#[tokio::test]
async fn unconfigured_token_rejects_everything() {
    let harness = TestHarness::new().await.unwrap();
    let mut state = state(&harness);
    state.auth.bearer_token = None;
    let request = api("GET", "/v1/chat/usage").body(Body::empty()).unwrap();
    let response = router(state, &[]).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_user_header_is_a_bad_request() {
    let harness = TestHarness::new().await.unwrap();
    let request = Request::get("/v1/chat/usage")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing X-User-Id header");
}

#[tokio::test]
async fn single_shot_chat_returns_result() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            classification(Intent::SalesData),
            generation("Sales are up."),
        ])
        .build()
        .await
        .unwrap();
    let request = api("POST", "/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(chat_body("what are my sales this week?"))
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["intent"], "sales_data");
    assert_eq!(body["response"], "Sales are up.");
    assert_eq!(body["session_id"], "s1");
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn streaming_chat_emits_named_events() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec![
            classification(Intent::InventoryStatus),
            generation("All stocked."),
        ])
        .build()
        .await
        .unwrap();
    let request = api("POST", "/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .body(chat_body("inventory?"))
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let text = body_text(response).await;
    let names: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .collect();
    assert_eq!(
        names,
        [
            "status_update",
            "intent_classified",
            "status_update",
            "data_fetched",
            "status_update",
            "final_response",
        ]
    );
    assert!(text.contains(r#"data: {"intent":"inventory_status"}"#), "{text}");
}

#[tokio::test]
async fn streaming_validation_failure_is_a_single_error_frame() {
    let harness = TestHarness::new().await.unwrap();
    let request = api("POST", "/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .body(chat_body("   "))
        .unwrap();
    let text = body_text(app(&harness).oneshot(request).await.unwrap()).await;
    assert_eq!(text.matches("event: ").count(), 1, "{text}");
    assert!(text.contains("event: error"));
    assert!(text.contains("Query cannot be empty"));
}

#[tokio::test]
async fn usage_reports_primary_counts() {
    let harness = TestHarness::new().await.unwrap();
    harness.ask("orders", TestHarness::context("u1")).await;

    let request = api("GET", "/v1/chat/usage").body(Body::empty()).unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["usage"]["source"], "primary");
    assert!(body["usage"]["hour_usage"].as_u64().unwrap() >= 1);
    assert_eq!(body["rate_limiter"]["state"], "closed");
}

#[tokio::test]
async fn reset_requires_admin() {
    let harness = TestHarness::new().await.unwrap();
    let request = api("POST", "/v1/chat/limits/reset")
        .body(Body::empty())
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::post("/v1/chat/limits/reset")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header("x-user-id", "ops")
        .header("x-permissions", "read,admin")
        .body(Body::empty())
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["reset"], true);
    assert_eq!(body["user_id"], "ops");
}

#[tokio::test]
async fn analytics_summary_validates_days() {
    let harness = TestHarness::new().await.unwrap();
    harness.ask("inventory", TestHarness::context("u1")).await;

    let request = api("GET", "/v1/analytics/summary?days=0")
        .body(Body::empty())
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = api("GET", "/v1/analytics/summary").body(Body::empty()).unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["period_days"], 7);
    assert_eq!(body["total_queries"], 1);
}

#[tokio::test]
async fn tool_rpc_lists_and_calls_tools() {
    let harness = TestHarness::new().await.unwrap();
    let request = api("POST", "/v1/tools/rpc")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}).to_string(),
        ))
        .unwrap();
    let body = body_json(app(&harness).oneshot(request).await.unwrap()).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 4);

    let request = api("POST", "/v1/tools/rpc")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}).to_string(),
        ))
        .unwrap();
    let body = body_json(app(&harness).oneshot(request).await.unwrap()).await;
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn metrics_render_when_enabled() {
    let harness = TestHarness::new().await.unwrap();
    let response = app(&harness)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let state = state(&harness).with_metrics(|| "shopdesk_chat_requests_total 3\n".to_string());
    let response = router(state, &[])
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("shopdesk_chat_requests_total 3"));
}

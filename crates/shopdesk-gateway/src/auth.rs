// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication and caller identity for the `/v1` routes.
//!
//! Every `/v1` request must carry `Authorization: Bearer <token>` matching the
//! configured token. With no token configured every request is rejected
//! (fail-closed).
//!
//! The bearer token authenticates the calling dashboard backend, which then
//! asserts the end user through headers:
//!
//! - `X-User-Id` (required): the user the query is made on behalf of
//! - `X-Permissions`: comma-separated permission names
//! - `X-Session-Id`: chat session, when the body does not name one

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use shopdesk_core::RequestContext;

use crate::handlers::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PERMISSIONS_HEADER: &str = "x-permissions";
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Authentication configuration for the gateway.
#[derive(Clone)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables every authenticated route.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Middleware that validates the bearer token.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        tracing::error!("gateway has no bearer token configured, rejecting request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let presented = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            tracing::debug!(path = %request.uri().path(), "bearer token rejected");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Builds the pipeline context for the asserted caller.
///
/// `session_id` wins over the `X-Session-Id` header; with neither a fresh
/// session is started.
pub fn caller_context(
    headers: &HeaderMap,
    session_id: Option<String>,
) -> Result<RequestContext, ApiError> {
    let user_id = header(headers, USER_ID_HEADER).ok_or_else(|| {
        ApiError::new(StatusCode::BAD_REQUEST, "missing X-User-Id header")
    })?;
    let session_id = session_id
        .filter(|s| !s.trim().is_empty())
        .or_else(|| header(headers, SESSION_ID_HEADER).map(str::to_string))
        .unwrap_or_else(|| format!("api-{}", uuid::Uuid::new_v4()));
    let permissions = header(headers, PERMISSIONS_HEADER)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(RequestContext::new(user_id, session_id)
        .with_permissions(permissions)
        .with_metadata("channel", serde_json::json!("api")))
}

// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible Chat Completions endpoint.
//!
//! [`OpenRouterClient`] owns authentication and attribution headers, the
//! per-request timeout, and retry with backoff on transient failures.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use shopdesk_core::ShopdeskError;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// Settings for building an [`OpenRouterClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub site_url: String,
    /// Sent as `X-Title`.
    pub site_name: String,
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ShopdeskError> {
    HeaderValue::from_str(value)
        .map_err(|e| ShopdeskError::Config(format!("invalid {name} header value: {e}")))
}

impl OpenRouterClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ShopdeskError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value("authorization", &format!("Bearer {}", settings.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("HTTP-Referer", header_value("HTTP-Referer", &settings.site_url)?);
        headers.insert("X-Title", header_value("X-Title", &settings.site_name)?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ShopdeskError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Overrides the initial backoff between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a completion request, retrying transient failures with
    /// exponential backoff.
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ShopdeskError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_delay.saturating_mul(1 << (attempt - 1).min(6));
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying completion request");
                tokio::time::sleep(delay).await;
            }

            let response = match self.client.post(&url).json(request).send().await {
                Ok(response) => response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    warn!(error = %e, "transport error, will retry");
                    last_error = Some(ShopdeskError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                    continue;
                }
                Err(e) => {
                    return Err(ShopdeskError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| ShopdeskError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| ShopdeskError::Provider {
                    message: format!("failed to parse API response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = describe_error(status, &body);
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(ShopdeskError::provider(message));
                continue;
            }
            return Err(ShopdeskError::provider(message));
        }

        Err(last_error
            .unwrap_or_else(|| ShopdeskError::provider("completion request failed after retries")))
    }

    /// Lightweight reachability probe against the model listing endpoint.
    pub async fn ping(&self, timeout: Duration) -> Result<(), ShopdeskError> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ShopdeskError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ShopdeskError::provider(format!(
                "model listing returned {}",
                response.status()
            )))
        }
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!("API error ({status}): {}", api_err.error.message),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

/// Rate limiting and server-side failures are worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::types::ResponseFormat;

    fn client(base_url: &str, max_retries: u32) -> OpenRouterClient {
        OpenRouterClient::new(ClientSettings {
            api_key: "sk-or-test".into(),
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            max_retries,
            site_url: "http://localhost:8000".into(),
            site_name: "Shopdesk Analytics".into(),
        })
        .unwrap()
        .with_retry_delay(Duration::ZERO)
    }

    fn request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "test/model".into(),
            messages: vec![shopdesk_core::ChatMessage::user("hello")],
            temperature: 0.0,
            max_tokens: 150,
            response_format: Some(ResponseFormat::json_object()),
        }
    }

    fn ok_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "gen-1",
            "model": "test/model",
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        })
    }

    #[tokio::test]
    async fn sends_auth_attribution_and_json_mode() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-or-test"))
            .and(header("HTTP-Referer", "http://localhost:8000"))
            .and(header("X-Title", "Shopdesk Analytics"))
            .and(body_partial_json(serde_json::json!({
                "model": "test/model",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("{\"intent\":\"sales_data\"}")))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client(&server.uri(), 0).chat_completion(&request()).await.unwrap();
        assert_eq!(
            resp.choices[0].message.content.as_deref(),
            Some("{\"intent\":\"sales_data\"}")
        );
        assert_eq!(resp.usage.unwrap().prompt_tokens, 12);
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limited", "code": 429}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("after retry")))
            .mount(&server)
            .await;

        let resp = client(&server.uri(), 3).chat_completion(&request()).await.unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("after retry"));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "Unknown model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri(), 3)
            .chat_completion(&request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("Unknown model"), "got: {err}");
    }

    #[tokio::test]
    async fn exhausts_retries_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server.uri(), 2)
            .chat_completion(&request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("503"), "got: {err}");
    }

    #[tokio::test]
    async fn ping_checks_model_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        client(&server.uri(), 0)
            .ping(Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let c = client("https://openrouter.ai/api/v1/", 0);
        assert_eq!(c.base_url(), "https://openrouter.ai/api/v1");
    }
}

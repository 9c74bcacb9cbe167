// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible LLM provider for Shopdesk.
//!
//! Implements [`LlmProvider`] on top of the Chat Completions API. The default
//! base URL targets OpenRouter; any compatible endpoint works.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use shopdesk_config::model::LlmConfig;
use shopdesk_core::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, LlmProvider, PluginAdapter,
    ShopdeskError, TokenUsage,
};
use tracing::{debug, info};

use crate::client::{ClientSettings, OpenRouterClient};
use crate::types::{ChatCompletionRequest, ResponseFormat};

const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Chat completion provider backed by [`OpenRouterClient`].
///
/// API key resolution order: config, then `OPENROUTER_API_KEY`, else error.
pub struct OpenRouterProvider {
    client: OpenRouterClient,
    health_timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, ShopdeskError> {
        let api_key = resolve_api_key(config.api_key.as_deref(), std::env::var(API_KEY_ENV).ok())?;
        let client = OpenRouterClient::new(ClientSettings {
            api_key,
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            site_url: config.site_url.clone(),
            site_name: config.site_name.clone(),
        })?;
        info!(base_url = %client.base_url(), model = %config.model, "LLM provider initialized");
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: OpenRouterClient) -> Self {
        Self {
            client,
            health_timeout: Duration::from_secs(5),
        }
    }
}

fn resolve_api_key(
    configured: Option<&str>,
    from_env: Option<String>,
) -> Result<String, ShopdeskError> {
    configured
        .map(str::to_string)
        .or(from_env)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ShopdeskError::Config(format!(
                "no LLM API key: set llm.api_key or the {API_KEY_ENV} environment variable"
            ))
        })
}

#[async_trait]
impl PluginAdapter for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ShopdeskError> {
        match self.client.ping(self.health_timeout).await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ShopdeskError> {
        debug!("LLM provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ShopdeskError> {
        let api_request = ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then(ResponseFormat::json_object),
        };
        let response = self.client.chat_completion(&api_request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ShopdeskError::provider("completion contained no message content"))?;

        Ok(CompletionResponse {
            content,
            model: response.model.unwrap_or(request.model),
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}

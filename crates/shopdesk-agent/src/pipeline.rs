// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat pipeline orchestrator.
//!
//! Each query runs on its own producer task that pushes [`PipelineEvent`]s
//! into a bounded channel. The stream always ends with exactly one
//! `final_response` or `error`. Persistence, caching and analytics happen on
//! tracked background tasks once the answer has been handed to the channel.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use shopdesk_config::ShopdeskConfig;
use shopdesk_core::{
    Intent, KeyValueStore, LlmProvider, MessageStore, PipelineEvent, PipelineResult,
    RequestContext, ShopdeskError, StoredMessage, ToolLayer,
};
use shopdesk_prometheus::RequestOutcome;
use shopdesk_resilience::CircuitBreakerConfig;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::analytics::AnalyticsTracker;
use crate::cache::ResponseCache;
use crate::confidence::{ConfidencePolicy, DefaultConfidence};
use crate::fetcher::DataFetcher;
use crate::generator::{GeneratedResponse, ResponseGenerator};
use crate::health::{self, HealthReport};
use crate::rate_limiter::RateLimiter;
use crate::validator::QueryValidator;

const UNEXPECTED_ERROR: &str = "An unexpected server error occurred";
const NO_RESPONSE: &str = "Failed to generate a response.";

/// External collaborators the pipeline is built on.
#[derive(Clone)]
pub struct PipelineDeps {
    pub store: Arc<dyn KeyValueStore>,
    pub provider: Arc<dyn LlmProvider>,
    pub tools: Arc<dyn ToolLayer>,
    pub messages: Arc<dyn MessageStore>,
}

struct Stages {
    validator: QueryValidator,
    rate_limiter: RateLimiter,
    cache: ResponseCache,
    generator: ResponseGenerator,
    fetcher: DataFetcher,
    analytics: AnalyticsTracker,
}

/// How a run ended, before it is turned into the terminal event.
enum Terminal {
    Cached(PipelineResult),
    Answered {
        result: PipelineResult,
        cache_key: String,
    },
}

#[derive(Clone)]
pub struct ChatPipeline {
    stages: Arc<Stages>,
    deps: PipelineDeps,
    confidence: Arc<dyn ConfidencePolicy>,
    tasks: TaskTracker,
    event_buffer: usize,
}

impl ChatPipeline {
    pub fn new(config: &ShopdeskConfig, deps: PipelineDeps) -> Result<Self, ShopdeskError> {
        let breakers = &config.circuit_breaker;
        let stages = Stages {
            validator: QueryValidator::new(&config.query)?,
            rate_limiter: RateLimiter::new(
                deps.store.clone(),
                &config.rate_limit,
                CircuitBreakerConfig {
                    failure_threshold: breakers.rate_limiter_failure_threshold,
                    recovery_timeout: Duration::from_secs(breakers.rate_limiter_recovery_secs),
                },
            ),
            cache: ResponseCache::new(deps.store.clone(), &config.cache),
            generator: ResponseGenerator::new(
                deps.provider.clone(),
                config.llm.model.clone(),
                CircuitBreakerConfig {
                    failure_threshold: breakers.llm_failure_threshold,
                    recovery_timeout: Duration::from_secs(breakers.llm_recovery_secs),
                },
            ),
            fetcher: DataFetcher::new(deps.tools.clone()),
            analytics: AnalyticsTracker::new(deps.store.clone(), &config.analytics),
        };
        info!(
            model = %config.llm.model,
            store = deps.store.name(),
            tools = deps.tools.name(),
            "chat pipeline initialized"
        );
        Ok(Self {
            stages: Arc::new(stages),
            deps,
            confidence: Arc::new(DefaultConfidence),
            tasks: TaskTracker::new(),
            event_buffer: config.server.event_buffer.max(1),
        })
    }

    /// Replaces the scoring applied to finished answers.
    pub fn with_confidence_policy(mut self, policy: impl ConfidencePolicy + 'static) -> Self {
        self.confidence = Arc::new(policy);
        self
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.stages.rate_limiter
    }

    pub fn analytics(&self) -> &AnalyticsTracker {
        &self.stages.analytics
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.stages.cache
    }

    /// Processes `query`, streaming progress events.
    ///
    /// Dropping the stream abandons the run at its next await point.
    pub fn process_stream(
        &self,
        query: impl Into<String>,
        ctx: RequestContext,
    ) -> ReceiverStream<PipelineEvent> {
        let (tx, rx) = mpsc::channel(self.event_buffer);
        let pipeline = self.clone();
        let query = query.into();
        self.tasks.spawn(async move {
            tokio::select! {
                _ = tx.closed() => {
                    debug!(user_id = ctx.user_id(), "event receiver dropped, abandoning query");
                }
                _ = pipeline.run(&query, &ctx, &tx) => {}
            }
        });
        ReceiverStream::new(rx)
    }

    /// Processes `query` to completion and returns only the outcome.
    pub async fn process(&self, query: impl Into<String>, ctx: RequestContext) -> PipelineResult {
        let query = query.into();
        let session_id = ctx.session_id().to_string();
        let mut events = self.process_stream(query.clone(), ctx);
        let mut last_error = None;
        while let Some(event) = events.next().await {
            match event {
                PipelineEvent::FinalResponse(result) => return result,
                PipelineEvent::Error { message } => last_error = Some(message),
                _ => {}
            }
        }
        PipelineResult::failed(
            query,
            session_id,
            last_error.unwrap_or_else(|| NO_RESPONSE.to_string()),
        )
    }

    /// Waits until every spawned query and finalize task has finished.
    pub async fn wait_for_background_tasks(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Probes every collaborator and reports breaker states.
    pub async fn health(&self) -> HealthReport {
        let (store, provider, tools, storage) = tokio::join!(
            health::probe(self.deps.store.as_ref()),
            health::probe(self.deps.provider.as_ref()),
            health::probe(self.deps.tools.as_ref()),
            health::probe(self.deps.messages.as_ref()),
        );
        let services = BTreeMap::from([
            ("store".to_string(), store),
            ("provider".to_string(), provider),
            ("tools".to_string(), tools),
            ("storage".to_string(), storage),
        ]);
        let mut breakers = vec![self.stages.rate_limiter.circuit_breaker_status().breaker];
        breakers.extend(self.stages.generator.breaker_snapshots());
        HealthReport::new(services, breakers)
    }

    async fn run(&self, query: &str, ctx: &RequestContext, tx: &mpsc::Sender<PipelineEvent>) {
        let started = Instant::now();
        // A panicking collaborator still ends the stream with an error event.
        let executed = AssertUnwindSafe(self.execute(query, ctx, tx, started))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ShopdeskError::Internal("pipeline stage panicked".into())));
        let (event, outcome) = match executed {
            Ok(Terminal::Cached(result)) => {
                shopdesk_prometheus::record_cache_hit();
                (PipelineEvent::FinalResponse(result), RequestOutcome::Cached)
            }
            Ok(Terminal::Answered { result, cache_key }) => {
                let delivered = tx
                    .send(PipelineEvent::FinalResponse(result.clone()))
                    .await
                    .is_ok();
                if delivered {
                    self.spawn_finalize(cache_key, result, ctx.clone());
                } else {
                    debug!(user_id = ctx.user_id(), "answer not delivered, skipping persistence");
                }
                shopdesk_prometheus::record_request(RequestOutcome::Answered);
                shopdesk_prometheus::record_latency(started.elapsed().as_secs_f64());
                return;
            }
            Err(e) if tx.is_closed() => {
                debug!(user_id = ctx.user_id(), error = %e, "query abandoned");
                return;
            }
            Err(e) => {
                let outcome = match &e {
                    ShopdeskError::Validation(_) => RequestOutcome::Rejected,
                    ShopdeskError::RateLimited(_) => RequestOutcome::RateLimited,
                    _ => RequestOutcome::Failed,
                };
                let message = if e.is_user_facing() {
                    e.to_string()
                } else {
                    error!(user_id = ctx.user_id(), error = %e, "unexpected pipeline failure");
                    UNEXPECTED_ERROR.to_string()
                };
                (PipelineEvent::error(message), outcome)
            }
        };
        // The receiver may already be gone; there is nobody left to tell.
        let _ = tx.send(event).await;
        shopdesk_prometheus::record_request(outcome);
        shopdesk_prometheus::record_latency(started.elapsed().as_secs_f64());
    }

    async fn execute(
        &self,
        query: &str,
        ctx: &RequestContext,
        tx: &mpsc::Sender<PipelineEvent>,
        started: Instant,
    ) -> Result<Terminal, ShopdeskError> {
        let stages = &self.stages;
        let sanitized = stages.validator.validate_and_sanitize(query, ctx)?;
        stages.rate_limiter.check_limits(ctx).await?;

        let cache_key = ResponseCache::generate_key(&sanitized, ctx);
        if let Some(cached) = stages.cache.get(&cache_key).await {
            info!(user_id = ctx.user_id(), "serving cached response");
            return Ok(Terminal::Cached(cached));
        }

        emit(tx, PipelineEvent::status("Classifying query...")).await?;
        let intent = match stages.generator.classify_intent(&sanitized).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(user_id = ctx.user_id(), error = %e, "intent classification failed, using general_stats");
                Intent::GeneralStats
            }
        };
        emit(tx, PipelineEvent::IntentClassified { intent }).await?;

        emit(
            tx,
            PipelineEvent::status(format!(
                "Fetching data for : {}...",
                intent.to_string().replace('_', " ")
            )),
        )
        .await?;
        let data = stages.fetcher.fetch_data(intent, &sanitized, ctx).await?;
        let size = serde_json::to_vec(&data).map(|bytes| bytes.len()).unwrap_or(0);
        emit(
            tx,
            PipelineEvent::DataFetched {
                data_summary: format!("{size} bytes of data received"),
            },
        )
        .await?;

        emit(tx, PipelineEvent::status("Generating insights...")).await?;
        let generated = match stages
            .generator
            .generate_response(&sanitized, intent, &data, ctx)
            .await
        {
            Ok(generated) => generated,
            Err(e) => {
                warn!(user_id = ctx.user_id(), error = %e, "response generation failed");
                GeneratedResponse::unavailable()
            }
        };

        let confidence = self.confidence.score(intent, &data);
        let result = PipelineResult::new(
            query,
            intent,
            generated.narrative.clone(),
            generated.to_value(),
            ctx.session_id(),
        )
        .with_execution_time(started.elapsed().as_secs_f64())
        .with_confidence(confidence);
        info!(
            user_id = ctx.user_id(),
            %intent,
            confidence = result.confidence(),
            execution_time = result.execution_time(),
            "query answered"
        );
        Ok(Terminal::Answered { result, cache_key })
    }

    fn spawn_finalize(&self, cache_key: String, result: PipelineResult, ctx: RequestContext) {
        let pipeline = self.clone();
        self.tasks.spawn(async move {
            pipeline.persist(&result, &ctx).await;
            pipeline.stages.cache.set(&cache_key, &result).await;
            pipeline
                .stages
                .analytics
                .track_query(&ctx, result.intent(), result.execution_time())
                .await;
        });
    }

    async fn persist(&self, result: &PipelineResult, ctx: &RequestContext) {
        let messages = &self.deps.messages;
        if let Err(e) = messages.ensure_session(ctx.session_id(), ctx.user_id()).await {
            error!(user_id = ctx.user_id(), session_id = ctx.session_id(), error = %e, "failed to create chat session");
            return;
        }
        let message = StoredMessage {
            id: result.message_id().to_string(),
            session_id: result.session_id().to_string(),
            query: result.query().to_string(),
            response: result.response().to_string(),
            intent: result.intent().to_string(),
            execution_time: result.execution_time(),
            confidence: result.confidence(),
            metadata: serde_json::json!({
                "structured_response": result.data(),
                "user_permissions": ctx.permissions(),
            }),
            created_at: result.timestamp().to_rfc3339(),
        };
        if let Err(e) = messages.append_message(&message).await {
            error!(user_id = ctx.user_id(), session_id = ctx.session_id(), error = %e, "failed to store chat message");
        }
    }
}

async fn emit(tx: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> Result<(), ShopdeskError> {
    tx.send(event)
        .await
        .map_err(|_| ShopdeskError::Internal("event receiver dropped".into()))
}

// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot commands: ask a question, inspect or reset quotas, summarize
//! analytics, probe health and prepare the database.
//!
//! Human-readable output goes to stdout with progress on stderr; `--json`
//! prints machine-readable JSON on stdout instead.

use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use shopdesk_agent::rate_limiter::UsageSource;
use shopdesk_agent::{AnalyticsSummary, HealthReport, UsageReport};
use shopdesk_config::ShopdeskConfig;
use shopdesk_core::{PipelineEvent, RequestContext, ShopdeskError};
use shopdesk_storage::SqliteStorage;

use crate::app::{Services, StoreServices};

/// Session used by commands that do not name one.
const CLI_SESSION: &str = "cli";
/// Persistence drain for one-shot commands.
const COMMAND_DRAIN: Duration = Duration::from_secs(5);

fn print_json<T: Serialize>(value: &T) -> Result<(), ShopdeskError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ShopdeskError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn cli_context(user: &str, session: Option<&str>, permissions: &[String]) -> RequestContext {
    RequestContext::new(user, session.unwrap_or(CLI_SESSION))
        .with_permissions(permissions.iter().cloned())
        .with_metadata("channel", serde_json::json!("cli"))
}

/// One progress line for a non-terminal event.
fn describe(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::StatusUpdate { message } => Some(message.clone()),
        PipelineEvent::IntentClassified { intent } => {
            Some(format!("Intent: {}", intent.display_name()))
        }
        PipelineEvent::DataFetched { data_summary } => Some(data_summary.clone()),
        PipelineEvent::FinalResponse(_) | PipelineEvent::Error { .. } => None,
    }
}

pub struct AskArgs<'a> {
    pub query: &'a str,
    pub user: &'a str,
    pub session: Option<&'a str>,
    pub permissions: &'a [String],
    pub json: bool,
}

/// Runs one query through the pipeline. Returns whether it was answered.
pub async fn run_ask(config: &ShopdeskConfig, args: AskArgs<'_>) -> Result<bool, ShopdeskError> {
    let services = Services::open(config).await?;
    let ctx = cli_context(args.user, args.session, args.permissions);

    let mut events = services.pipeline.process_stream(args.query, ctx);
    let mut answered = false;
    while let Some(event) = events.next().await {
        if args.json {
            println!(
                "{}",
                serde_json::json!({"event": event.name(), "data": event.data_json()})
            );
        } else if let Some(line) = describe(&event) {
            eprintln!("... {line}");
        }
        match event {
            PipelineEvent::FinalResponse(result) => {
                answered = result.is_successful();
                if !args.json {
                    println!("{}", result.response());
                    eprintln!(
                        "intent={} confidence={:.2} time={:.3}s",
                        result.intent(),
                        result.confidence(),
                        result.execution_time()
                    );
                }
            }
            PipelineEvent::Error { message } if !args.json => eprintln!("error: {message}"),
            _ => {}
        }
    }

    services.shutdown(COMMAND_DRAIN).await;
    Ok(answered)
}

fn source_label(source: UsageSource) -> &'static str {
    match source {
        UsageSource::Primary => "primary",
        UsageSource::Fallback => "fallback",
    }
}

fn format_usage(user: &str, usage: &UsageReport) -> String {
    format!(
        "user {user} ({} counters, breaker {})\n  minute: {}/{} ({} remaining)\n  hour:   {}/{} ({} remaining)",
        source_label(usage.source),
        usage.circuit_breaker_state,
        usage.minute_usage,
        usage.minute_limit,
        usage.minute_remaining,
        usage.hour_usage,
        usage.hour_limit,
        usage.hour_remaining,
    )
}

pub async fn run_usage(config: &ShopdeskConfig, user: &str, json: bool) -> Result<(), ShopdeskError> {
    let services = StoreServices::open(config)?;
    let usage = services
        .rate_limiter(config)
        .get_current_usage(&cli_context(user, None, &[]))
        .await;
    if json {
        print_json(&usage)
    } else {
        println!("{}", format_usage(user, &usage));
        Ok(())
    }
}

pub async fn run_reset_limits(config: &ShopdeskConfig, user: &str) -> Result<(), ShopdeskError> {
    let services = StoreServices::open(config)?;
    services
        .rate_limiter(config)
        .reset_user_limits(&cli_context(user, None, &[]))
        .await;
    println!("rate limits reset for {user}");
    Ok(())
}

fn format_summary(summary: &AnalyticsSummary) -> String {
    let mut lines = vec![format!(
        "{} queries over {} days, average {:.3}s",
        summary.total_queries, summary.period_days, summary.avg_execution_time
    )];
    lines.extend(
        summary
            .daily_queries
            .iter()
            .map(|day| format!("  {}  {}", day.date, day.queries)),
    );
    lines.join("\n")
}

pub async fn run_analytics(
    config: &ShopdeskConfig,
    days: u32,
    json: bool,
) -> Result<(), ShopdeskError> {
    if days == 0 {
        return Err(ShopdeskError::Validation("days must be at least 1".into()));
    }
    let services = StoreServices::open(config)?;
    let summary = services.analytics(config).get_analytics_summary(days).await?;
    if json {
        print_json(&summary)
    } else {
        println!("{}", format_summary(&summary));
        Ok(())
    }
}

fn format_health(report: &HealthReport) -> String {
    let mut lines = vec![format!("status: {}", report.status)];
    for (name, service) in &report.services {
        let detail = service
            .detail
            .as_deref()
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        lines.push(format!(
            "  {name:<9} {:<9} {:>7.1}ms  {}{detail}",
            service.status,
            service.response_time * 1000.0,
            service.adapter,
        ));
    }
    for breaker in &report.circuit_breakers {
        lines.push(format!(
            "  breaker {} {} ({} failures)",
            breaker.name, breaker.state, breaker.failure_count
        ));
    }
    lines.join("\n")
}

/// Probes every backend. Returns whether all are healthy.
pub async fn run_health(config: &ShopdeskConfig, json: bool) -> Result<bool, ShopdeskError> {
    let services = Services::open(config).await?;
    let report = services.pipeline.health().await;
    if json {
        print_json(&report)?;
    } else {
        println!("{}", format_health(&report));
    }
    services.shutdown(COMMAND_DRAIN).await;
    Ok(report.is_healthy())
}

pub async fn run_init_db(config: &ShopdeskConfig) -> Result<(), ShopdeskError> {
    let storage = SqliteStorage::open(&config.storage).await?;
    storage.database().checkpoint().await?;
    println!("database ready at {}", config.storage.database_path);
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage counters kept in the shared store.
//!
//! Tracking is fire-and-forget: a store failure is logged, and the same
//! fields are written to the log so nothing is lost outright.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shopdesk_config::model::AnalyticsConfig;
use shopdesk_core::{BatchOp, Intent, KeyValueStore, RequestContext, ShopdeskError};
use tracing::{info, warn};

const EXECUTION_TIMES_KEY: &str = "chat_analytics:execution_times";
const AVERAGE_WINDOW: isize = 100;
const SAMPLE_SIZE: usize = 10;
const DAY: Duration = Duration::from_secs(24 * 3600);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyQueries {
    pub date: String,
    pub queries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub period_days: u32,
    /// Most recent day first.
    pub daily_queries: Vec<DailyQueries>,
    pub total_queries: u64,
    pub avg_execution_time: f64,
    pub execution_times_sample: Vec<f64>,
}

pub struct AnalyticsTracker {
    store: Arc<dyn KeyValueStore>,
    enabled: bool,
    daily_ttl: Duration,
    hourly_ttl: Duration,
    max_samples: usize,
}

fn date_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

impl AnalyticsTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &AnalyticsConfig) -> Self {
        Self {
            store,
            enabled: config.enabled,
            daily_ttl: DAY * config.daily_retention_days as u32,
            hourly_ttl: DAY * config.hourly_retention_days as u32,
            max_samples: config.max_samples.max(1),
        }
    }

    /// Records one answered query. Never fails.
    pub async fn track_query(&self, ctx: &RequestContext, intent: Intent, execution_time: f64) {
        if !self.enabled {
            return;
        }
        let ops = self.tracking_ops(ctx, intent, execution_time, Utc::now());
        if let Err(e) = self.store.execute(ops).await {
            warn!(error = %e, "analytics tracking failed");
            info!(
                user_id = ctx.user_id(),
                session_id = ctx.session_id(),
                %intent,
                execution_time = format!("{execution_time:.3}"),
                "analytics"
            );
        }
    }

    fn tracking_ops(
        &self,
        ctx: &RequestContext,
        intent: Intent,
        execution_time: f64,
        now: DateTime<Utc>,
    ) -> Vec<BatchOp> {
        let date = date_key(now);
        let hour = now.format("%Y-%m-%d-%H").to_string();
        let daily = [
            format!("chat_analytics:queries:total:{date}"),
            format!("chat_analytics:queries:intent:{intent}:{date}"),
            format!("chat_analytics:users:active:{date}"),
            format!("chat_analytics:user_queries:{}:{date}", ctx.user_id()),
        ];
        let hourly = format!("chat_analytics:queries:hourly:{hour}");

        let mut ops = Vec::with_capacity(12);
        for key in daily.iter().chain(std::iter::once(&hourly)) {
            ops.push(BatchOp::Incr { key: key.clone() });
        }
        ops.push(BatchOp::LPush {
            key: EXECUTION_TIMES_KEY.into(),
            value: execution_time.to_string(),
        });
        ops.push(BatchOp::LTrim {
            key: EXECUTION_TIMES_KEY.into(),
            start: 0,
            stop: self.max_samples as isize - 1,
        });
        for key in daily {
            ops.push(BatchOp::Expire {
                key,
                ttl: self.daily_ttl,
            });
        }
        ops.push(BatchOp::Expire {
            key: hourly,
            ttl: self.hourly_ttl,
        });
        ops
    }

    /// Query volume for the last `days` days (today included) and recent latency.
    pub async fn get_analytics_summary(&self, days: u32) -> Result<AnalyticsSummary, ShopdeskError> {
        let now = Utc::now();
        let dates: Vec<String> = (0..days)
            .map(|i| date_key(now - chrono::Duration::days(i64::from(i))))
            .collect();
        let keys: Vec<String> = dates
            .iter()
            .map(|d| format!("chat_analytics:queries:total:{d}"))
            .collect();

        let counts = self.store.get_many(&keys).await?;
        let samples = self
            .store
            .list_range(EXECUTION_TIMES_KEY, 0, AVERAGE_WINDOW - 1)
            .await?;

        let daily_queries: Vec<DailyQueries> = dates
            .into_iter()
            .zip(counts)
            .map(|(date, count)| DailyQueries {
                date,
                queries: count.and_then(|c| c.parse().ok()).unwrap_or(0),
            })
            .collect();
        let execution_times: Vec<f64> = samples.iter().filter_map(|s| s.parse().ok()).collect();
        let avg_execution_time = if execution_times.is_empty() {
            0.0
        } else {
            let mean = execution_times.iter().sum::<f64>() / execution_times.len() as f64;
            (mean * 1000.0).round() / 1000.0
        };

        Ok(AnalyticsSummary {
            period_days: days,
            total_queries: daily_queries.iter().map(|d| d.queries).sum(),
            daily_queries,
            avg_execution_time,
            execution_times_sample: execution_times.into_iter().take(SAMPLE_SIZE).collect(),
        })
    }
}

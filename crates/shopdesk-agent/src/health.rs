// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency health probes.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use shopdesk_core::{HealthStatus, PluginAdapter};
use shopdesk_resilience::BreakerSnapshot;
use tokio::time::Instant;

/// Upper bound on a single adapter health check.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceHealth {
    pub adapter: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Seconds the probe took.
    pub response_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// Worst status across all services.
    pub status: &'static str,
    pub services: BTreeMap<String, ServiceHealth>,
    pub circuit_breakers: Vec<BreakerSnapshot>,
}

impl HealthReport {
    pub fn new(
        services: BTreeMap<String, ServiceHealth>,
        circuit_breakers: Vec<BreakerSnapshot>,
    ) -> Self {
        let status = ["unhealthy", "degraded"]
            .into_iter()
            .find(|level| services.values().any(|s| s.status == *level))
            .unwrap_or("healthy");
        Self {
            status,
            services,
            circuit_breakers,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Runs one adapter's health check, timing it and bounding it.
pub async fn probe<A>(adapter: &A) -> ServiceHealth
where
    A: PluginAdapter + ?Sized,
{
    let started = Instant::now();
    let status = match tokio::time::timeout(PROBE_TIMEOUT, adapter.health_check()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => HealthStatus::Unhealthy(e.to_string()),
        Err(_) => HealthStatus::Unhealthy(format!("health check timed out after {PROBE_TIMEOUT:?}")),
    };
    let detail = match &status {
        HealthStatus::Healthy => None,
        HealthStatus::Degraded(d) | HealthStatus::Unhealthy(d) => Some(d.clone()),
    };
    ServiceHealth {
        adapter: adapter.name().to_string(),
        status: status.label(),
        detail,
        response_time: (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use shopdesk_store::MemoryStore;
    use shopdesk_test_utils::FlakyStore;

    use super::*;

    #[tokio::test]
    async fn healthy_adapter_reports_healthy() {
        let health = probe(&MemoryStore::new()).await;
        assert_eq!(health.adapter, "memory");
        assert_eq!(health.status, "healthy");
        assert!(health.detail.is_none());
    }

    #[tokio::test]
    async fn failing_adapter_makes_report_unhealthy() {
        let flaky = FlakyStore::new();
        flaky.set_failing(true);
        let mut services = BTreeMap::new();
        services.insert("store".to_string(), probe(&flaky).await);
        services.insert("cache".to_string(), probe(&MemoryStore::new()).await);
        let report = HealthReport::new(services, Vec::new());
        assert_eq!(report.status, "unhealthy");
        assert!(!report.is_healthy());
        assert!(report.services["store"].detail.is_some());
    }

    #[test]
    fn empty_report_is_healthy() {
        assert!(HealthReport::new(BTreeMap::new(), Vec::new()).is_healthy());
    }
}

// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for Shopdesk.
//!
//! Recording goes through the metrics-rs facade, so the helpers in
//! [`recording`] are no-ops until [`PrometheusExporter::install`] has run.
//! The gateway renders the exporter at `/metrics`.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shopdesk_core::ShopdeskError;

pub use recording::{
    RequestOutcome, record_cache_hit, record_latency, record_rate_limit_fallback, record_request,
};

/// Installed Prometheus recorder.
#[derive(Clone)]
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Installs the Prometheus recorder globally and registers descriptions.
    ///
    /// Only one recorder can be installed per process.
    pub fn install() -> Result<Self, ShopdeskError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ShopdeskError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");
        Ok(Self { handle })
    }

    /// Wraps an existing handle, for recorders built outside this crate.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Renders all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusExporter").finish_non_exhaustive()
    }
}

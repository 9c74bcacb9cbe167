// SPDX-FileCopyrightText: 2026 Shopdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shopdesk serve` command implementation.
//!
//! Opens the counter store, the SQLite database and the LLM provider, builds
//! the chat pipeline on them and serves it through the HTTP gateway until
//! SIGINT or SIGTERM. In-flight persistence is drained before the backends
//! are closed.

use std::time::Duration;

use shopdesk_config::ShopdeskConfig;
use shopdesk_core::ShopdeskError;
use shopdesk_gateway::{GatewayState, ServerConfig};
use shopdesk_prometheus::PrometheusExporter;
use tracing::{error, info, warn};

use crate::app::Services;
use crate::shutdown;

/// Upper bound on waiting for background persistence at shutdown.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Runs the `shopdesk serve` command.
pub async fn run_serve(config: ShopdeskConfig) -> Result<(), ShopdeskError> {
    info!("starting shopdesk serve");

    // Fail-closed: refuse to start a gateway that would reject every request.
    if config.gateway.bearer_token.is_none() {
        return Err(ShopdeskError::Config(
            "gateway.bearer_token must be set to serve the HTTP API".to_string(),
        ));
    }

    let exporter = match PrometheusExporter::install() {
        Ok(exporter) => Some(exporter),
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    };

    let services = Services::open(&config).await.map_err(|e| {
        error!(error = %e, "failed to open backends");
        e
    })?;

    let mut state = GatewayState::new(&config, services.pipeline.clone(), services.tools.clone());
    if let Some(exporter) = exporter {
        state = state.with_metrics(move || exporter.render());
    }

    let health = services.pipeline.health().await;
    for (service, probe) in &health.services {
        if probe.status != "healthy" {
            warn!(
                service = service.as_str(),
                status = probe.status,
                detail = probe.detail.as_deref().unwrap_or(""),
                "backend not healthy at startup"
            );
        }
    }

    let cancel = shutdown::install_signal_handler();
    let on_signal = cancel.clone();
    let served = shopdesk_gateway::start_server(
        &ServerConfig::from_config(&config),
        state,
        async move { on_signal.cancelled().await },
    )
    .await;

    // Serving can also end on a bind or I/O error; close the backends either way.
    cancel.cancel();
    services.shutdown(SHUTDOWN_DRAIN).await;
    served?;

    info!("shopdesk serve stopped");
    Ok(())
}

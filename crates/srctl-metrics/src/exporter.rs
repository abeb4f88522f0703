//! Prometheus scrape endpoint (`spec.md` §6.3): `GET /metrics` rendering
//! the `srctl_replicate_*` counters/gauges, both labeled with `source` and
//! `target`.

use crate::stats::Stats;
use axum::routing::get;
use axum::{Router, extract::State};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Registers the process-wide Prometheus recorder. Must be called exactly
/// once before the first metric is emitted.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install prometheus recorder: {e}"))
}

#[derive(Clone)]
struct ExporterState {
    handle: PrometheusHandle,
}

async fn metrics_handler(State(state): State<ExporterState>) -> String {
    state.handle.render()
}

/// Periodically copies the [`Stats`] snapshot into the `metrics` registry.
/// Runs until `cancel` fires.
pub async fn run_updater(
    stats: Arc<Stats>,
    source: String,
    target: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let snap = stats.snapshot();
                let labels = [("source", source.clone()), ("target", target.clone())];
                metrics::register_counter!("srctl_replicate_schemas_total", &labels).absolute(snap.schemas);
                metrics::register_counter!("srctl_replicate_configs_total", &labels).absolute(snap.configs);
                metrics::register_counter!("srctl_replicate_deletes_total", &labels).absolute(snap.deletes);
                metrics::register_counter!("srctl_replicate_modes_total", &labels).absolute(snap.modes);
                metrics::register_counter!("srctl_replicate_errors_total", &labels).absolute(snap.errors);
                metrics::register_counter!("srctl_replicate_events_processed_total", &labels).absolute(snap.events_processed);
                metrics::register_counter!("srctl_replicate_events_filtered_total", &labels).absolute(snap.events_filtered);
                metrics::register_gauge!("srctl_replicate_last_offset", &labels).set(snap.last_offset as f64);
                metrics::register_gauge!("srctl_replicate_uptime_seconds", &labels).set(snap.uptime.as_secs_f64());
            }
        }
    }
}

/// Serves `GET /metrics` until `cancel` fires, then drains in-flight
/// requests for up to five seconds before returning (`spec.md` §5).
pub async fn serve(
    addr: SocketAddr,
    handle: PrometheusHandle,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let state = ExporterState { handle };
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "metrics server listening");

    let shutdown_signal = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal.cancelled().await;
            })
            .await
    });

    cancel.cancelled().await;
    info!("metrics server shutting down, draining for up to 5s");
    match tokio::time::timeout(Duration::from_secs(5), server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "metrics server exited with error"),
        Ok(Err(e)) => warn!(error = %e, "metrics server task panicked"),
        Err(_) => warn!("metrics server did not drain within the 5s grace period"),
    }
    Ok(())
}

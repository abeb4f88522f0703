//! Periodic textual status reporter (`spec.md` §6.3):
//! `HH:MM:SS | src -> tgt | schemas=… configs=… deletes=… errors=… events=… filtered=… offset=… uptime=…`
//!
//! Logged through `tracing::info!` rather than raw `println!` so the status
//! line shares a sink with the rest of the replicator's structured output.

use crate::stats::Stats;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run(
    stats: Arc<Stats>,
    source_name: String,
    target_name: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let snap = stats.snapshot();
                let now = chrono::Local::now().format("%H:%M:%S");
                let events = snap.events_processed;
                info!(
                    "{now} | {source_name} \u{2192} {target_name} | schemas={} configs={} deletes={} errors={} events={} filtered={} offset={} uptime={}s",
                    snap.schemas,
                    snap.configs,
                    snap.deletes,
                    snap.errors,
                    events,
                    snap.events_filtered,
                    snap.last_offset,
                    snap.uptime.as_secs(),
                );
            }
        }
    }
}

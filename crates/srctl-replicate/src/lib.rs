//! Applier, retry harness, replication loop, and initial sync — the
//! replication engine itself, built on the capability traits from
//! `srctl-core` so it never depends on `reqwest` or `rdkafka` directly
//! (`spec.md` §4.3-§4.5, §4.7).

pub mod apply;
pub mod initial_sync;
pub mod replication_loop;
pub mod retry;

use srctl_core::config::ReplicatorConfig;
use srctl_core::{KafkaConsumer, SourceClient, SrctlError, TargetClient};
use srctl_decode::Glob;
use srctl_metrics::Stats;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Owns the replicator's collaborators and scalar configuration. Built once
/// by `bins/srctl` and shared across the replication-loop task and the
/// initial-sync one-shot; `Stats` is handed out by `Arc` to the two
/// observer tasks as well, never through a global (`spec.md` §9).
pub struct Replicator {
    source_client: Arc<dyn SourceClient>,
    target_client: Arc<dyn TargetClient>,
    consumer: Arc<dyn KafkaConsumer>,
    config: ReplicatorConfig,
    stats: Arc<Stats>,
}

impl Replicator {
    pub fn new(
        source_client: Arc<dyn SourceClient>,
        target_client: Arc<dyn TargetClient>,
        consumer: Arc<dyn KafkaConsumer>,
        config: ReplicatorConfig,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            source_client,
            target_client,
            consumer,
            config,
            stats,
        }
    }

    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    fn filter(&self) -> Glob {
        Glob::new(&self.config.filter)
    }

    /// Runs the one-shot subject walk (`spec.md` §4.7). Intended to run to
    /// completion before [`Replicator::run_replication_loop`] starts.
    pub async fn run_initial_sync(&self) -> Result<(), SrctlError> {
        initial_sync::run(
            self.source_client.as_ref(),
            self.target_client.as_ref(),
            &self.filter(),
            self.config.preserve_ids,
            self.stats.as_ref(),
        )
        .await
    }

    /// Runs the streaming replication loop until `cancel` fires.
    pub async fn run_replication_loop(&self, cancel: CancellationToken) {
        replication_loop::run(
            Arc::clone(&self.consumer),
            Arc::clone(&self.target_client),
            self.filter(),
            self.config.preserve_ids,
            Arc::clone(&self.stats),
            cancel,
        )
        .await
    }
}

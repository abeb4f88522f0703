//! srctl — continuous, one-way replicator for a Schema Registry's `_schemas`
//! write-ahead log. Loads configuration, wires the capability
//! implementations together, and runs the replication loop alongside its
//! two observer tasks until a shutdown signal arrives.
//!
//! ```bash
//! srctl --config srctl.toml
//! srctl --config srctl.toml --initial-sync-only
//! srctl --config srctl.toml --dry-run
//! ```

mod dry_run;

use anyhow::{Context, Result};
use clap::Parser;
use dry_run::DryRunTargetClient;
use srctl_core::{AppConfig, KafkaConsumer, SourceClient, TargetClient};
use srctl_kafka::SchemaLogConsumer;
use srctl_metrics::{exporter, reporter, Stats};
use srctl_registry::HttpRegistryClient;
use srctl_replicate::Replicator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const METRICS_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "srctl")]
#[command(about = "Continuous replicator for a Schema Registry's write-ahead log")]
struct Args {
    /// Path to the TOML configuration file. Falls back to defaults plus
    /// `SRCTL__*` environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the initial subject sync and exit without starting the
    /// streaming loop.
    #[arg(long)]
    initial_sync_only: bool,

    /// Log every applier action instead of calling the target registry.
    #[arg(long)]
    dry_run: bool,

    /// Overrides the `RUST_LOG`-style filter directive otherwise read from
    /// the environment.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let app_config = AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let source_url = app_config.source.url.clone();
    let target_url = app_config.target.url.clone();
    let kafka = app_config.kafka.clone();
    let replicator_config = app_config
        .into_replicator_config()
        .context("invalid configuration")?;

    let source_client: Arc<dyn SourceClient> = Arc::new(HttpRegistryClient::new(source_url));
    let target_client: Arc<dyn TargetClient> = if args.dry_run {
        info!("dry-run mode: no writes will reach the target registry");
        Arc::new(DryRunTargetClient)
    } else {
        Arc::new(HttpRegistryClient::new(target_url))
    };
    let consumer: Arc<dyn KafkaConsumer> = Arc::new(
        SchemaLogConsumer::new(&kafka.brokers, &kafka.group_id, &kafka.topic)
            .context("failed to create Kafka consumer")?,
    );

    let stats = Arc::new(Stats::new());
    let replicator = Arc::new(Replicator::new(
        source_client,
        target_client,
        consumer,
        replicator_config.clone(),
        Arc::clone(&stats),
    ));

    if replicator_config.initial_sync {
        info!("starting initial sync");
        if let Err(e) = replicator.run_initial_sync().await {
            warn!(error = %e, "initial sync did not complete cleanly; streaming replication will still catch up");
        } else {
            info!("initial sync complete");
        }
    }

    if args.initial_sync_only {
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let recorder = exporter::install_recorder().context("failed to install metrics recorder")?;
    let mut handles = Vec::new();

    let loop_replicator = Arc::clone(&replicator);
    let loop_cancel = cancel.clone();
    handles.push(tokio::spawn(async move {
        loop_replicator.run_replication_loop(loop_cancel).await;
    }));

    let reporter_stats = Arc::clone(&stats);
    let reporter_cancel = cancel.clone();
    let source_name = replicator_config.source_name.clone();
    let target_name = replicator_config.target_name.clone();
    let report_interval = replicator_config.report_interval;
    handles.push(tokio::spawn(async move {
        reporter::run(reporter_stats, source_name, target_name, report_interval, reporter_cancel).await;
    }));

    let updater_stats = Arc::clone(&stats);
    let updater_cancel = cancel.clone();
    let updater_source = replicator_config.source_name.clone();
    let updater_target = replicator_config.target_name.clone();
    handles.push(tokio::spawn(async move {
        exporter::run_updater(
            updater_stats,
            updater_source,
            updater_target,
            METRICS_UPDATE_INTERVAL,
            updater_cancel,
        )
        .await;
    }));

    let metrics_addr = replicator_config.metrics_addr;
    let server_cancel = cancel.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = exporter::serve(metrics_addr, recorder, server_cancel).await {
            tracing::error!(error = %e, "metrics server exited with error");
        }
    }));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, cancelling all tasks");
    cancel.cancel();

    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => tracing_subscriber::EnvFilter::new(level.to_string()),
        None => tracing_subscriber::EnvFilter::from_default_env(),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

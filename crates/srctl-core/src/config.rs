//! Configuration loading and the immutable [`ReplicatorConfig`] it resolves
//! into.
//!
//! `spec.md` §9 calls the global-mutable-config singleton a pattern to
//! re-architect: here [`AppConfig`] is loaded exactly once in `bins/srctl`,
//! validated, and consumed by value into a `ReplicatorConfig` that is never
//! mutated again and is handed out by reference, not through a global.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid metrics_addr {0:?}: {1}")]
    InvalidMetricsAddr(String, std::net::AddrParseError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEndpointConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    pub group_id: String,
}

fn default_topic() -> String {
    "_schemas".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_report_interval_secs() -> u64 {
    10
}

/// On-disk/environment configuration surface, loaded once via the `config`
/// crate: defaults, then an optional TOML file, then `SRCTL__*`
/// double-underscore-nested environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub source: RegistryEndpointConfig,
    pub target: RegistryEndpointConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub preserve_ids: bool,
    #[serde(default)]
    pub initial_sync: bool,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("filter", "")?
            .set_default("preserve_ids", false)?
            .set_default("initial_sync", false)?
            .set_default("report_interval_secs", 10)?
            .set_default("metrics_addr", default_metrics_addr())?
            .set_default("kafka.topic", default_topic())?;

        if let Some(p) = path {
            builder = builder.add_source(config::File::from(p));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SRCTL")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder.build()?;
        let app: AppConfig = raw.try_deserialize()?;
        Ok(app)
    }

    pub fn into_replicator_config(self) -> Result<ReplicatorConfig, ConfigError> {
        let metrics_addr = self
            .metrics_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidMetricsAddr(self.metrics_addr.clone(), e))?;
        Ok(ReplicatorConfig {
            source_name: self.source.name,
            target_name: self.target.name,
            filter: self.filter,
            preserve_ids: self.preserve_ids,
            initial_sync: self.initial_sync,
            metrics_addr,
            report_interval: Duration::from_secs(self.report_interval_secs),
        })
    }
}

/// Scalar replicator settings, immutable after construction (`spec.md` §3).
/// The source/target clients and the consumer are owned alongside this by
/// `srctl_replicate::Replicator`, not folded into this struct, so they can
/// stay trait objects without forcing `ReplicatorConfig` to give up `Clone`.
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    pub source_name: String,
    pub target_name: String,
    pub filter: String,
    pub preserve_ids: bool,
    pub initial_sync: bool,
    pub metrics_addr: SocketAddr,
    pub report_interval: Duration,
}

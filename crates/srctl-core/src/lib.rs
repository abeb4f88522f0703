//! Data model, capability traits, configuration, and errors shared by every
//! `srctl` crate.
//!
//! This crate has no tokio runtime dependency of its own and no knowledge of
//! Kafka or HTTP wire formats beyond the trait surfaces in [`client`] and
//! [`kafka`] — those are implemented by `srctl-registry` and `srctl-kafka`
//! respectively, keeping the event model and the replication logic
//! (`srctl-decode`, `srctl-replicate`) decoupled from any particular
//! transport.

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod kafka;

pub use client::{RegisterRequest, SourceClient, SourceSchema, TargetClient};
pub use config::{AppConfig, KafkaConfig, RegistryEndpointConfig, ReplicatorConfig};
pub use error::{ClientErrorKind, SrctlError};
pub use event::{EventPayload, Reference, SchemaEvent};
pub use kafka::{ConsumerRecord, KafkaConsumer};

//! The transport surface the replication loop needs against the broker
//! (`spec.md` §6.1, §4.9). `srctl-kafka` wraps `rdkafka::StreamConsumer`
//! behind this trait; tests in `srctl-replicate` use an in-memory fake.

use crate::error::SrctlError;
use async_trait::async_trait;
use std::time::Duration;

/// One raw record pulled from the `_schemas` topic — exactly the four
/// inputs the decoder needs, decoupling decode and apply logic from
/// `rdkafka`'s message types.
#[derive(Debug, Clone)]
pub struct ConsumerRecord {
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub offset: i64,
    pub partition: i32,
}

#[async_trait]
pub trait KafkaConsumer: Send + Sync {
    /// Waits up to `timeout` for at least one record, then drains whatever
    /// is immediately available. May return an empty vec on timeout — that
    /// is not an error.
    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<ConsumerRecord>, SrctlError>;

    /// Commits the offsets of every record returned by the most recent
    /// `poll_batch` call.
    async fn commit(&self) -> Result<(), SrctlError>;
}

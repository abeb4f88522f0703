//! Wraps `rdkafka::consumer::StreamConsumer` behind the [`KafkaConsumer`]
//! capability trait (`spec.md` §4.9, §6.1), so `srctl-replicate` never
//! touches `rdkafka` types directly.
//!
//! Unlike the teacher's `KafkaSource` (which relies on
//! `enable.auto.commit`), offsets here are committed explicitly and only
//! when the replication loop asks for it — that is the whole point of the
//! offset-commit discipline in `spec.md` §4.5.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message as _;
use rdkafka::{Offset, TopicPartitionList};
use srctl_core::{ConsumerRecord, KafkaConsumer, SrctlError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

pub struct SchemaLogConsumer {
    consumer: StreamConsumer,
    topic: String,
    /// Highest offset seen per partition since the last commit, staged here
    /// until `commit` is called — this is what lets the replication loop
    /// decide *when* to advance the broker's committed offset, independent
    /// of when records are pulled off the wire.
    pending: Mutex<HashMap<i32, i64>>,
}

impl SchemaLogConsumer {
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, SrctlError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.partition.eof", "false")
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| SrctlError::Transient(format!("failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| SrctlError::Transient(format!("failed to subscribe to {topic}: {e}")))?;

        Ok(Self {
            consumer,
            topic: topic.to_string(),
            pending: Mutex::new(HashMap::new()),
        })
    }

    fn track(&self, partition: i32, offset: i64) {
        let mut pending = self.pending.lock().unwrap();
        let entry = pending.entry(partition).or_insert(offset);
        if offset > *entry {
            *entry = offset;
        }
    }
}

#[async_trait]
impl KafkaConsumer for SchemaLogConsumer {
    async fn poll_batch(&self, timeout: Duration) -> Result<Vec<ConsumerRecord>, SrctlError> {
        let mut records = Vec::new();

        let first = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(e)) => return Err(SrctlError::Transient(e.to_string())),
            Err(_) => return Ok(records), // timed out with nothing available — not an error
        };
        let partition = first.partition();
        let offset = first.offset();
        records.push(ConsumerRecord {
            key: first.key().map(|k| k.to_vec()),
            value: first.payload().map(|v| v.to_vec()),
            offset,
            partition,
        });
        self.track(partition, offset);
        drop(first);

        // Drain whatever else is immediately available without waiting
        // further — this is what makes a "batch" out of a per-message
        // stream consumer.
        loop {
            match tokio::time::timeout(Duration::from_millis(0), self.consumer.recv()).await {
                Ok(Ok(msg)) => {
                    let partition = msg.partition();
                    let offset = msg.offset();
                    records.push(ConsumerRecord {
                        key: msg.key().map(|k| k.to_vec()),
                        value: msg.payload().map(|v| v.to_vec()),
                        offset,
                        partition,
                    });
                    self.track(partition, offset);
                }
                _ => break,
            }
        }

        debug!(count = records.len(), "polled batch from {}", self.topic);
        Ok(records)
    }

    async fn commit(&self) -> Result<(), SrctlError> {
        let offsets = {
            let mut pending = self.pending.lock().unwrap();
            std::mem::take(&mut *pending)
        };
        if offsets.is_empty() {
            return Ok(());
        }
        let mut tpl = TopicPartitionList::new();
        for (partition, offset) in offsets {
            tpl.add_partition_offset(&self.topic, partition, Offset::Offset(offset + 1))
                .map_err(|e| SrctlError::Transient(e.to_string()))?;
        }
        let consumer = &self.consumer;
        tokio::task::block_in_place(|| consumer.commit(&tpl, CommitMode::Sync))
            .map_err(|e| SrctlError::Transient(format!("offset commit failed: {e}")))
    }
}

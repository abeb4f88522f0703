//! Stats Core (`spec.md` §4.6): thread-safe counters/gauges, one atomic per
//! field, read by two independent observers without ever blocking the
//! replication loop's writes.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub start_time: DateTime<Utc>,
    pub schemas: u64,
    pub configs: u64,
    pub deletes: u64,
    pub modes: u64,
    pub errors: u64,
    pub events_processed: u64,
    pub events_filtered: u64,
    pub last_offset: i64,
    pub last_event_time: Option<DateTime<Utc>>,
    pub uptime: Duration,
}

/// Owned by the replicator (not a `static`, per `spec.md` §9's
/// re-architecture note) and handed out by `Arc` reference to the textual
/// reporter and the Prometheus exporter.
#[derive(Debug)]
pub struct Stats {
    start_time: DateTime<Utc>,
    schemas: AtomicU64,
    configs: AtomicU64,
    deletes: AtomicU64,
    modes: AtomicU64,
    errors: AtomicU64,
    events_processed: AtomicU64,
    events_filtered: AtomicU64,
    /// -1 means "no event observed yet".
    last_offset: AtomicI64,
    /// Milliseconds since epoch; 0 means "unset".
    last_event_time_millis: AtomicI64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            start_time: Utc::now(),
            schemas: AtomicU64::new(0),
            configs: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            modes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            events_filtered: AtomicU64::new(0),
            last_offset: AtomicI64::new(-1),
            last_event_time_millis: AtomicI64::new(0),
        }
    }

    pub fn incr_schemas(&self) {
        self.schemas.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_configs(&self) {
        self.configs.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_modes(&self) {
        self.modes.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_events_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }
    pub fn incr_events_filtered(&self) {
        self.events_filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// `last_offset` is the largest offset seen by the worker so far across
    /// all partitions (`spec.md` §5) — not per-partition — so this takes
    /// the max rather than overwriting unconditionally.
    pub fn set_offset(&self, offset: i64) {
        self.last_offset.fetch_max(offset, Ordering::Relaxed);
    }

    pub fn set_last_event_time(&self, time: DateTime<Utc>) {
        self.last_event_time_millis
            .store(time.timestamp_millis(), Ordering::Relaxed);
    }

    /// Wait-free for the reader: every field is a single atomic load, and
    /// the snapshot is consistent enough for monitoring purposes even
    /// though it isn't a single atomic transaction across fields.
    pub fn snapshot(&self) -> StatsSnapshot {
        let last_offset = self.last_offset.load(Ordering::Relaxed);
        let last_event_millis = self.last_event_time_millis.load(Ordering::Relaxed);
        StatsSnapshot {
            start_time: self.start_time,
            schemas: self.schemas.load(Ordering::Relaxed),
            configs: self.configs.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            modes: self.modes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_filtered: self.events_filtered.load(Ordering::Relaxed),
            last_offset: if last_offset < 0 { 0 } else { last_offset },
            last_event_time: if last_event_millis == 0 {
                None
            } else {
                DateTime::from_timestamp_millis(last_event_millis)
            },
            uptime: (Utc::now() - self.start_time)
                .to_std()
                .unwrap_or(Duration::ZERO),
        }
    }
}

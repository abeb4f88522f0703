//! Replication Loop (`spec.md` §4.5). Module named `replication_loop`
//! rather than `loop` to avoid the reserved keyword.
//!
//! Poll, decode, filter, apply-with-retry, repeat; commit offsets only when
//! every record in the batch applied successfully. A batch with one failure
//! still processes every other record in that batch (an isolated bad record
//! must not stall the rest of the log) but withholds the commit, so the
//! failed record and everything after it is redelivered next poll.

use crate::apply::apply;
use crate::retry::with_retry;
use chrono::Utc;
use srctl_core::KafkaConsumer;
use srctl_core::TargetClient;
use srctl_decode::{decode, Glob};
use srctl_metrics::Stats;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const POLL_TIMEOUT: Duration = Duration::from_secs(1);
const INITIAL_POLL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_POLL_BACKOFF: Duration = Duration::from_secs(30);

/// Runs until `cancel` fires. Never returns `Err` for ordinary replication
/// faults — those are logged and counted; it only returns early on
/// cancellation.
pub async fn run(
    consumer: Arc<dyn KafkaConsumer>,
    target: Arc<dyn TargetClient>,
    filter: Glob,
    preserve_ids: bool,
    stats: Arc<Stats>,
    cancel: CancellationToken,
) {
    let mut poll_backoff = INITIAL_POLL_BACKOFF;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let records = match consumer.poll_batch(POLL_TIMEOUT).await {
            Ok(records) => records,
            Err(e) => {
                stats.incr_errors();
                warn!(error = %e, backoff_secs = poll_backoff.as_secs(), "poll failed, backing off");
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(poll_backoff) => {}
                }
                poll_backoff = (poll_backoff * 2).min(MAX_POLL_BACKOFF);
                continue;
            }
        };
        poll_backoff = INITIAL_POLL_BACKOFF;

        if records.is_empty() {
            continue;
        }

        let mut batch_ok = true;

        for record in &records {
            let event = match decode(
                record.key.as_deref(),
                record.value.as_deref(),
                record.offset,
                record.partition,
            ) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!(offset = record.offset, error = %e, "skipping malformed record");
                    stats.incr_errors();
                    continue;
                }
            };

            stats.incr_events_processed();

            if !event.is_global() && !filter.matches(&event.subject) {
                stats.incr_events_filtered();
                continue;
            }

            let target = Arc::clone(&target);
            let stats_for_apply = Arc::clone(&stats);
            let apply_result = with_retry(
                || {
                    let target = Arc::clone(&target);
                    let stats = Arc::clone(&stats_for_apply);
                    let event = event.clone();
                    async move { apply(&event, target.as_ref(), preserve_ids, stats.as_ref()).await }
                },
                &cancel,
            )
            .await;

            if let Err(e) = apply_result {
                warn!(
                    subject = %event.subject,
                    offset = event.offset,
                    error = %e,
                    "apply failed after exhausting retries, withholding commit"
                );
                stats.incr_errors();
                batch_ok = false;
            }

            stats.set_offset(event.offset);
            stats.set_last_event_time(Utc::now());
        }

        if cancel.is_cancelled() {
            return;
        }

        if batch_ok {
            if let Err(e) = consumer.commit().await {
                warn!(error = %e, "offset commit failed, batch will be redelivered");
            }
        }
    }
}

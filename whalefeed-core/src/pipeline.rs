//! The constructed pipeline object.
//!
//! All shared state (dedup ledger, ingest buffer, subscriber set) hangs
//! off one [`Pipeline`] value with an explicit lifecycle, injected into
//! the intake endpoint and the processors. Nothing lives in ambient
//! process-wide variables, so the single-instance boundary stays visible
//! for a future shared-store swap.

use crate::broadcast::{Broadcaster, Subscription};
use crate::buffer::IngestBuffer;
use crate::dedup::DedupLedger;
use crate::entities::{MalformedPayload, TransferEvent, WebhookPayload};
use crate::lookup::{LabelBook, PriceBook};
use kanau::processor::Processor;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Tuning knobs for the pipeline and its processors.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Dedup ledger capacity (FIFO eviction past this).
    pub ledger_capacity: usize,
    /// Ingest buffer capacity (drop-oldest past this).
    pub buffer_capacity: usize,
    /// Maximum events per released batch.
    pub batch_size: usize,
    /// Release tick period.
    pub release_interval: Duration,
    /// Poll tick period (poll-mode ingestion only).
    pub poll_interval: Duration,
    /// Ledger maintenance tick period.
    pub prune_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ledger_capacity: crate::dedup::DEFAULT_LEDGER_CAPACITY,
            buffer_capacity: crate::buffer::DEFAULT_BUFFER_CAPACITY,
            batch_size: 10,
            release_interval: Duration::from_secs(2),
            poll_interval: Duration::from_secs(1),
            prune_interval: Duration::from_secs(60),
        }
    }
}

/// Outcome of ingesting one payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Transfers admitted to the buffer.
    pub accepted: usize,
    /// Transfers suppressed by the dedup ledger.
    pub duplicates: usize,
    /// Transfers dropped during normalization.
    pub malformed: usize,
}

/// The ingestion / fan-out pipeline.
///
/// Owns the dedup ledger, the ingest buffer, the broadcaster, and the
/// price/label books. One instance per process; running several
/// instances yields independent ledgers and split fan-out, which this
/// design does not attempt to reconcile.
pub struct Pipeline {
    config: PipelineConfig,
    prices: PriceBook,
    labels: LabelBook,
    ledger: Mutex<DedupLedger>,
    buffer: Mutex<IngestBuffer>,
    broadcaster: Broadcaster,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, prices: PriceBook, labels: LabelBook) -> Self {
        Self {
            ledger: Mutex::new(DedupLedger::new(config.ledger_capacity)),
            buffer: Mutex::new(IngestBuffer::new(config.buffer_capacity)),
            broadcaster: Broadcaster::new(),
            prices,
            labels,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize, dedup, and buffer one validated payload.
    ///
    /// Both locks are held for the whole batch, so `seen` + `record` is
    /// atomic per event and the batch lands in the buffer in payload
    /// order. Malformed transfers are dropped with a warning and counted;
    /// they never fail the batch.
    pub fn ingest(&self, payload: &WebhookPayload) -> Result<IngestSummary, MalformedPayload> {
        payload.validate()?;
        let block_timestamp = payload.block_instant()?;

        let mut summary = IngestSummary::default();
        let mut ledger = lock(&self.ledger);
        let mut buffer = lock(&self.buffer);

        for raw in &payload.erc20_transfers {
            let event = match TransferEvent::normalize(
                raw,
                block_timestamp,
                &self.prices,
                &self.labels,
            ) {
                Ok(event) => event,
                Err(e) => {
                    warn!(hash = %raw.transaction_hash, error = %e, "dropping malformed transfer");
                    summary.malformed += 1;
                    continue;
                }
            };

            if ledger.seen(&event.transaction_hash) {
                summary.duplicates += 1;
                continue;
            }
            ledger.record(event.transaction_hash.clone());

            if let Some(evicted) = buffer.push(event) {
                warn!(
                    hash = %evicted.transaction_hash,
                    dropped_total = buffer.dropped(),
                    "ingest buffer full, dropped oldest event"
                );
            }
            summary.accepted += 1;
        }

        debug!(
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            malformed = summary.malformed,
            buffered = buffer.len(),
            "ingested payload"
        );
        Ok(summary)
    }

    /// Drain up to one batch from the buffer and publish it.
    ///
    /// Returns the number of events released (0 when the buffer was
    /// empty and no publish happened).
    pub fn release(&self) -> usize {
        let batch = lock(&self.buffer).drain_up_to(self.config.batch_size);
        if batch.is_empty() {
            return 0;
        }
        let released = batch.len();
        let attempted = self.broadcaster.publish(batch);
        if attempted == 0 {
            debug!(released, "released batch with no subscribers listening");
        } else {
            debug!(released, subscribers = attempted, "released batch");
        }
        released
    }

    /// Register a new stream subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    /// Number of currently live subscriber channels.
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    /// Events currently waiting in the ingest buffer.
    pub fn buffered(&self) -> usize {
        lock(&self.buffer).len()
    }

    /// Hashes currently retained by the dedup ledger.
    pub fn ledger_len(&self) -> usize {
        lock(&self.ledger).len()
    }

    /// Re-enforce the ledger bound; returns how many entries were evicted.
    pub fn prune_ledger(&self) -> usize {
        lock(&self.ledger).prune_to_capacity()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Processor<WebhookPayload> for Pipeline {
    type Output = IngestSummary;
    type Error = MalformedPayload;

    async fn process(&self, payload: WebhookPayload) -> Result<IngestSummary, MalformedPayload> {
        self.ingest(&payload)
    }
}

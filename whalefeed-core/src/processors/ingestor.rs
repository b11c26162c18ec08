//! Ingestion processors.
//!
//! Two intake shapes, matching the two supported deployments:
//!
//! - **Push**: the webhook endpoint validates the payload and hands it
//!   over an mpsc channel; [`PushIngestor`] feeds it to the pipeline as
//!   it arrives.
//! - **Poll**: the stored payload lives behind a remote read endpoint;
//!   [`PollIngestor`] fetches it on a fixed interval and keeps a
//!   strictly-greater timestamp watermark so an unchanged payload is
//!   not re-ingested.

use crate::events::{PayloadReceiver, ShutdownReceiver};
use crate::pipeline::Pipeline;
use crate::source::PayloadSource;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Consumes validated payloads from the intake channel.
pub struct PushIngestor {
    pipeline: Arc<Pipeline>,
}

impl PushIngestor {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Run until shutdown is signaled or the intake channel closes.
    pub async fn run(self, mut shutdown_rx: ShutdownReceiver, mut payload_rx: PayloadReceiver) {
        info!("PushIngestor started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("PushIngestor received shutdown signal");
                        break;
                    }
                }

                maybe_payload = payload_rx.recv() => {
                    match maybe_payload {
                        Some(payload) => match self.pipeline.ingest(&payload) {
                            Ok(summary) => debug!(
                                accepted = summary.accepted,
                                duplicates = summary.duplicates,
                                malformed = summary.malformed,
                                "ingested pushed payload"
                            ),
                            // The endpoint validates before sending; this
                            // only fires when the two checks disagree.
                            Err(e) => warn!(error = %e, "rejected payload from intake channel"),
                        },
                        None => {
                            info!("payload intake channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("PushIngestor shutdown complete");
    }
}

/// Fetches the latest stored payload from a source on a fixed interval.
pub struct PollIngestor {
    pipeline: Arc<Pipeline>,
    source: Box<dyn PayloadSource>,
}

impl PollIngestor {
    pub fn new(pipeline: Arc<Pipeline>, source: Box<dyn PayloadSource>) -> Self {
        Self { pipeline, source }
    }

    /// Run until shutdown is signaled.
    ///
    /// A failed fetch yields zero events for the cycle and is retried on
    /// the next tick at the same interval; there is no backoff.
    pub async fn run(self, mut shutdown_rx: ShutdownReceiver) {
        info!(
            interval_ms = self.pipeline.config().poll_interval.as_millis() as u64,
            "PollIngestor started"
        );

        let mut ticker = tokio::time::interval(self.pipeline.config().poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Only payloads stored strictly after this are new.
        let mut watermark: i64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("PollIngestor received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    match self.source.fetch_latest().await {
                        Ok(Some(fetched)) if fetched.received_at > watermark => {
                            watermark = fetched.received_at;
                            match self.pipeline.ingest(&fetched.payload) {
                                Ok(summary) => debug!(
                                    accepted = summary.accepted,
                                    duplicates = summary.duplicates,
                                    malformed = summary.malformed,
                                    watermark,
                                    "ingested polled payload"
                                ),
                                Err(e) => warn!(error = %e, "polled payload failed validation"),
                            }
                        }
                        Ok(_) => {
                            // Nothing stored yet, or nothing newer than
                            // the watermark.
                        }
                        Err(e) => {
                            warn!(error = %e, "source fetch failed, retrying on next tick");
                        }
                    }
                }
            }
        }

        info!("PollIngestor shutdown complete");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::WebhookPayload;
    use crate::events::shutdown_channel;
    use crate::lookup::{LabelBook, PriceBook};
    use crate::pipeline::PipelineConfig;
    use crate::source::{FetchedPayload, SourceFetchError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn payload(hash: &str) -> WebhookPayload {
        WebhookPayload::from_value(json!({
            "confirmed": true,
            "chainId": "0x1",
            "block": { "number": "1", "hash": "0xblock", "timestamp": "1700000000" },
            "erc20Transfers": [{
                "transactionHash": hash,
                "from": "0x1111111111111111111111111111111111111111",
                "to": "0x2222222222222222222222222222222222222222",
                "tokenName": "Pepe",
                "tokenSymbol": "PEPE",
                "valueWithDecimals": "100"
            }]
        }))
        .unwrap()
    }

    fn fast_pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            PipelineConfig {
                poll_interval: Duration::from_millis(10),
                ..PipelineConfig::default()
            },
            PriceBook::default(),
            LabelBook::default(),
        ))
    }

    /// Replays a scripted sequence of fetch results, then `Ok(None)`.
    struct ScriptedSource {
        responses: Mutex<Vec<Result<Option<FetchedPayload>, SourceFetchError>>>,
    }

    #[async_trait]
    impl PayloadSource for ScriptedSource {
        async fn fetch_latest(&self) -> Result<Option<FetchedPayload>, SourceFetchError> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(None)
            } else {
                responses.remove(0)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_ingestor_feeds_pipeline() {
        let pipeline = fast_pipeline();
        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let (payload_tx, payload_rx) = crate::events::payload_channel();

        let handle = tokio::spawn(PushIngestor::new(pipeline.clone()).run(shutdown_rx, payload_rx));

        payload_tx.send(payload("0xA")).await.unwrap();
        payload_tx.send(payload("0xA")).await.unwrap();
        payload_tx.send(payload("0xB")).await.unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(pipeline.buffered(), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_ingestor_watermark_and_retry() {
        let pipeline = fast_pipeline();
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let source = ScriptedSource {
            responses: Mutex::new(vec![
                // First tick: stored payload at t=100.
                Ok(Some(FetchedPayload { payload: payload("0xA"), received_at: 100 })),
                // Second tick: same timestamp, must not be re-ingested.
                Ok(Some(FetchedPayload { payload: payload("0xA"), received_at: 100 })),
                // Third tick: fetch failure, logged and skipped.
                Err(SourceFetchError::BadStatus { status: 500 }),
                // Fourth tick: newer payload is picked up.
                Ok(Some(FetchedPayload { payload: payload("0xB"), received_at: 200 })),
            ]),
        };

        let handle = tokio::spawn(
            PollIngestor::new(pipeline.clone(), Box::new(source)).run(shutdown_rx),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;

        // 0xA once (duplicate tick suppressed by the watermark before the
        // ledger even sees it), 0xB once after the failed cycle.
        assert_eq!(pipeline.buffered(), 2);
        assert_eq!(pipeline.ledger_len(), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}

//! Release processor.
//!
//! Drains the ingest buffer one batch per tick and publishes it. The
//! release cadence is deliberately decoupled from ingestion: sources are
//! bursty, but consumers animating the batch want a steady rhythm.

use crate::events::ShutdownReceiver;
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Publishes one buffered batch per release tick.
pub struct Releaser {
    pipeline: Arc<Pipeline>,
}

impl Releaser {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Run until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: ShutdownReceiver) {
        info!(
            interval_ms = self.pipeline.config().release_interval.as_millis() as u64,
            batch_size = self.pipeline.config().batch_size,
            "Releaser started"
        );

        let mut ticker = tokio::time::interval(self.pipeline.config().release_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Releaser received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let released = self.pipeline.release();
                    if released > 0 {
                        debug!(
                            released,
                            remaining = self.pipeline.buffered(),
                            "release tick published a batch"
                        );
                    }
                }
            }
        }

        info!("Releaser shutdown complete");
    }
}

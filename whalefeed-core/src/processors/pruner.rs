//! Ledger maintenance processor.

use crate::events::ShutdownReceiver;
use crate::pipeline::Pipeline;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Slow tick that re-enforces the dedup ledger bound.
///
/// `record` already evicts inline, so this is a backstop plus a periodic
/// occupancy log, not the primary eviction path.
pub struct LedgerPruner {
    pipeline: Arc<Pipeline>,
}

impl LedgerPruner {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Run until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: ShutdownReceiver) {
        info!(
            interval_secs = self.pipeline.config().prune_interval.as_secs(),
            "LedgerPruner started"
        );

        let mut ticker = tokio::time::interval(self.pipeline.config().prune_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("LedgerPruner received shutdown signal");
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let evicted = self.pipeline.prune_ledger();
                    debug!(
                        evicted,
                        retained = self.pipeline.ledger_len(),
                        buffered = self.pipeline.buffered(),
                        "ledger maintenance tick"
                    );
                }
            }
        }

        info!("LedgerPruner shutdown complete");
    }
}

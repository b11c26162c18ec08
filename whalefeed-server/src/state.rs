//! Application state shared across all request handlers.

use std::sync::Arc;
use tokio::sync::RwLock;
use whalefeed_core::events::PayloadSender;
use whalefeed_core::pipeline::Pipeline;

/// The most recently stored webhook payload, kept verbatim for the poll
/// read side. Overwritten by each accepted POST.
#[derive(Debug, Clone)]
pub struct StoredPayload {
    /// The raw JSON body as received, so pollers see exactly what the
    /// indexing service sent.
    pub data: serde_json::Value,
    /// Unix milliseconds at which the payload was accepted; pollers
    /// compare this against their watermark with a strict greater-than.
    pub timestamp: i64,
}

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// The ingestion / fan-out pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Intake channel sender; `None` in poll mode, where ingestion runs
    /// through the poller instead.
    pub payload_tx: Option<PayloadSender>,
    /// Latest stored payload for the poll read side.
    pub latest: Arc<RwLock<Option<StoredPayload>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, payload_tx: Option<PayloadSender>) -> Self {
        Self {
            pipeline,
            payload_tx,
            latest: Arc::new(RwLock::new(None)),
        }
    }
}

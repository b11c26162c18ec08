//! Channel factories for the ingestion pipeline.
//!
//! The intake endpoint hands validated payloads to the ingestor over an
//! mpsc channel; processors observe shutdown over a shared watch channel.

use crate::entities::WebhookPayload;
use tokio::sync::{mpsc, watch};

/// Default buffer size for the payload intake channel.
///
/// Enough to absorb webhook bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for validated webhook payloads.
pub type PayloadSender = mpsc::Sender<WebhookPayload>;
/// Receiver handle for validated webhook payloads.
pub type PayloadReceiver = mpsc::Receiver<WebhookPayload>;

/// Sender half of the shutdown signal.
pub type ShutdownSender = watch::Sender<bool>;
/// Receiver half of the shutdown signal.
pub type ShutdownReceiver = watch::Receiver<bool>;

/// Create the payload intake channel.
///
/// Multiple senders can be cloned from the returned sender; the single
/// receiver belongs to the push-mode ingestor.
pub fn payload_channel() -> (PayloadSender, PayloadReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Create the shutdown watch channel, initially not shut down.
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

//! Polled payload sources.
//!
//! In poll-mode deployments the intake endpoint's read side lives in a
//! different process; the [`PollIngestor`](crate::processors::PollIngestor)
//! fetches its latest stored payload on an interval through this seam.

use crate::entities::WebhookPayload;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// A payload fetched from a source, with the instant it was stored.
///
/// `received_at` (unix milliseconds) is what the poller compares against
/// its watermark: only a strictly greater value is new data.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub payload: WebhookPayload,
    pub received_at: i64,
}

/// Errors from a source fetch.
///
/// The documented policy is fixed-interval retry: a failed fetch is
/// logged, yields zero events for the cycle, and the next tick proceeds
/// normally.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    /// The request failed or the body did not decode.
    #[error("source request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("source responded with status {status}")]
    BadStatus { status: u16 },
}

/// Read side of an intake endpoint, as seen by the poller.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    /// Fetch the most recently stored payload, or `None` when the source
    /// has nothing yet.
    async fn fetch_latest(&self) -> Result<Option<FetchedPayload>, SourceFetchError>;
}

/// Wire shape of the poll read side: `{ "data": payload|null, "timestamp": millis }`.
#[derive(Debug, Deserialize)]
struct PollResponse {
    data: Option<WebhookPayload>,
    #[serde(default)]
    timestamp: i64,
}

/// HTTP implementation of [`PayloadSource`] backed by reqwest.
pub struct HttpPayloadSource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPayloadSource {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint,
        }
    }
}

#[async_trait]
impl PayloadSource for HttpPayloadSource {
    async fn fetch_latest(&self) -> Result<Option<FetchedPayload>, SourceFetchError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;
        if !response.status().is_success() {
            return Err(SourceFetchError::BadStatus {
                status: response.status().as_u16(),
            });
        }
        let body: PollResponse = response.json().await?;
        Ok(body.data.map(|payload| FetchedPayload {
            payload,
            received_at: body.timestamp,
        }))
    }
}

//! Webhook intake endpoint.

use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use time::OffsetDateTime;
use whalefeed_core::entities::{MalformedPayload, WebhookPayload};

use crate::state::{AppState, StoredPayload};

/// Success body for an accepted webhook.
#[derive(Serialize)]
struct WebhookAccepted {
    success: bool,
    /// Unix milliseconds at which the payload was stored; pollers use
    /// this as their freshness watermark.
    timestamp: i64,
    /// Live stream subscribers at acceptance time.
    subscribers: usize,
}

/// Error body for a rejected webhook.
#[derive(Serialize)]
struct WebhookRejected {
    success: bool,
    error: String,
}

/// `POST /webhook` — accept one webhook payload.
///
/// The body must parse as the webhook shape and carry a non-empty
/// transfer list; anything else is rejected with a client-error status
/// and touches no pipeline state. An accepted payload overwrites the
/// stored latest payload (poll read side) and, in push mode, is handed
/// to the ingestor.
pub(crate) async fn receive_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    // Keep the raw JSON for the poll read side; parse the typed payload
    // from the same document so both views agree.
    let raw: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| WebhookApiError::Malformed(e.into()))?;
    let payload = WebhookPayload::from_value(raw.clone()).map_err(WebhookApiError::Malformed)?;

    let timestamp = unix_millis_now();
    {
        let mut latest = state.latest.write().await;
        *latest = Some(StoredPayload {
            data: raw,
            timestamp,
        });
    }

    if let Some(payload_tx) = &state.payload_tx {
        // Dropping on a full intake channel is the documented overload
        // policy; the payload is still served to pollers.
        if let Err(e) = payload_tx.try_send(payload) {
            tracing::warn!(error = %e, "intake channel unavailable, payload stored but not pushed");
        }
    }

    tracing::debug!(timestamp, "webhook payload accepted");
    Ok((
        StatusCode::OK,
        Json(WebhookAccepted {
            success: true,
            timestamp,
            subscribers: state.pipeline.subscriber_count(),
        }),
    ))
}

fn unix_millis_now() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Errors that can occur in the webhook intake handler.
#[derive(Debug)]
pub(crate) enum WebhookApiError {
    /// The body failed shape validation.
    Malformed(MalformedPayload),
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            WebhookApiError::Malformed(e) => {
                tracing::warn!(error = %e, "rejected malformed webhook payload");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(WebhookRejected {
                        success: false,
                        error: e.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

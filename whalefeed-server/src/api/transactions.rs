//! Poll read side and SSE stream.

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, unfold};
use serde::Serialize;
use std::convert::Infallible;
use whalefeed_core::broadcast::StreamMessage;

use crate::state::AppState;

/// Poll response: the latest stored payload and its store timestamp.
#[derive(Serialize)]
pub(crate) struct PollBody {
    data: Option<serde_json::Value>,
    timestamp: i64,
}

/// `GET /api/transactions` — the poll read side.
///
/// Returns the most recently stored webhook payload verbatim, plus the
/// unix-millisecond instant it was stored. Pollers treat the response
/// as new only when the timestamp is strictly greater than their
/// watermark; a timestamp of 0 means nothing has been stored yet.
pub(crate) async fn latest_payload(State(state): State<AppState>) -> Json<PollBody> {
    let latest = state.latest.read().await;
    match &*latest {
        Some(stored) => Json(PollBody {
            data: Some(stored.data.clone()),
            timestamp: stored.timestamp,
        }),
        None => Json(PollBody {
            data: None,
            timestamp: 0,
        }),
    }
}

/// `GET /api/transactions/stream` — SSE batch stream.
///
/// Subscribes the connection to the broadcaster. The first event is the
/// `{"status":"connected"}` sentinel; each subsequent event is one
/// released batch as a JSON array of normalized transfers. The
/// subscription is dropped when the client disconnects, which removes
/// its channel from the broadcaster.
pub(crate) async fn transaction_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.pipeline.subscribe();
    tracing::debug!(subscriber = %subscription.id(), "stream subscriber connected");

    let stream = unfold(subscription, |mut subscription| async move {
        let message = subscription.recv().await?;
        Some((Ok(to_event(&message)), subscription))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_event(message: &StreamMessage) -> Event {
    match message {
        StreamMessage::Connected => Event::default().data(r#"{"status":"connected"}"#),
        StreamMessage::Batch(batch) => {
            // A batch either serializes whole or not at all; consumers
            // never see a partial one.
            let body = serde_json::to_string(batch.as_ref()).unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to serialize batch, emitting empty one");
                "[]".to_string()
            });
            Event::default().data(body)
        }
    }
}

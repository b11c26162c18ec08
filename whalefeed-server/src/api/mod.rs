//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /webhook`                  – webhook intake (store + push)
//! - `GET  /api/transactions`         – poll read side (latest payload)
//! - `GET  /api/transactions/stream`  – SSE batch stream

pub mod transactions;
pub mod webhook;

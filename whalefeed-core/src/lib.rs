#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

//! Whale transfer ingestion and fan-out pipeline.
//!
//! Moves ERC-20 transfer events from an inbound webhook (or a polled
//! source) through deduplication and buffering out to every connected
//! stream subscriber, in paced batches.

pub mod broadcast;
pub mod buffer;
pub mod dedup;
pub mod entities;
pub mod events;
pub mod lookup;
pub mod pipeline;
pub mod processors;
pub mod source;

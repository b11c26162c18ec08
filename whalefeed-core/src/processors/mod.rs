//! Pipeline processors.
//!
//! Each processor is a long-running task driven by `tokio::select!`
//! over a shared shutdown watch channel plus its own input:
//!
//! - `PushIngestor`: consumes validated payloads from the intake channel
//! - `PollIngestor`: fetches payloads from a [`PayloadSource`](crate::source::PayloadSource) on a fixed interval
//! - `Releaser`: drains one batch per release tick and publishes it
//! - `LedgerPruner`: slow maintenance tick for the dedup ledger

pub mod ingestor;
pub mod pruner;
pub mod releaser;

pub use ingestor::{PollIngestor, PushIngestor};
pub use pruner::LedgerPruner;
pub use releaser::Releaser;

//! FIFO ingest buffer.

use crate::entities::TransferEvent;
use std::collections::VecDeque;

/// Default buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

/// Accumulates accepted transfers between ingestion and release ticks.
///
/// Strict FIFO: `drain_up_to` returns events in the exact order pushed.
/// The buffer is capped; under sustained overload the oldest event is
/// dropped to admit the newest, and the drop is counted.
#[derive(Debug)]
pub struct IngestBuffer {
    capacity: usize,
    queue: VecDeque<TransferEvent>,
    dropped: u64,
}

impl IngestBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Append an event.
    ///
    /// Returns the evicted oldest event when the buffer was full, so the
    /// caller can log the overflow.
    pub fn push(&mut self, event: TransferEvent) -> Option<TransferEvent> {
        let evicted = if self.queue.len() >= self.capacity {
            self.dropped += 1;
            self.queue.pop_front()
        } else {
            None
        };
        self.queue.push_back(event);
        evicted
    }

    /// Remove and return up to `max` oldest events, in insertion order.
    ///
    /// Non-blocking: an empty buffer yields an empty vec.
    pub fn drain_up_to(&mut self, max: usize) -> Vec<TransferEvent> {
        let take = max.min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total events dropped to overflow since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for IngestBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

// ABOUTME: Sequence number allocation against a counter shared by every engine instance
// ABOUTME: Issues values in 1..=0x7FFFFFFF and wraps back to 1 on overflow

use crate::error::SmppResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Highest sequence number SMPP allows an ESME to issue
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// A source of sequence numbers.
///
/// Implementations stand in for a counter living outside the engine, so
/// several engines bound with the same credentials never issue the same
/// value. `next` must behave as an atomic increment against that shared
/// store.
pub trait SequenceAllocator: Send + Sync {
    fn next(&self) -> SmppResult<u32>;
}

/// In-process shared counter. Clones share the same underlying value.
#[derive(Debug, Clone, Default)]
pub struct SharedSequence {
    last: Arc<AtomicU32>,
}

impl SharedSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously persisted value; the next call returns
    /// the value after `last`.
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: Arc::new(AtomicU32::new(last.min(MAX_SEQUENCE_NUMBER))),
        }
    }

    /// The most recently issued value, 0 if none has been issued yet
    pub fn current(&self) -> u32 {
        self.last.load(Ordering::SeqCst)
    }
}

fn successor(value: u32) -> u32 {
    if value >= MAX_SEQUENCE_NUMBER {
        1
    } else {
        value + 1
    }
}

impl SequenceAllocator for SharedSequence {
    fn next(&self) -> SmppResult<u32> {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                Some(successor(value))
            })
            .unwrap_or_else(|value| value);
        Ok(successor(previous))
    }
}

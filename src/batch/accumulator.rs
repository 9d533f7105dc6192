use crate::error::{KnockstreamError, Result};
use crate::ingest::reducer::ReducedSample;

/// Fill state of a batch.
///
/// `Empty → Filling → Full → Empty` on flush, repeated for the life of the
/// producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Empty,
    Filling,
    Full,
}

/// Fixed-capacity, append-only batch of reduced samples.
///
/// The buffer is allocated once; flushing hands out the samples and clears
/// them in the same call, so a full batch can never be appended to.
#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    samples: Vec<ReducedSample>,
    capacity: usize,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one sample.
    ///
    /// Returns `Full` exactly when this sample filled the batch. Appending to
    /// a full batch is rejected with `BatchFull` and leaves it untouched.
    pub fn append(&mut self, sample: ReducedSample) -> Result<BatchState> {
        if self.is_full() {
            return Err(KnockstreamError::BatchFull {
                capacity: self.capacity,
            });
        }
        self.samples.push(sample);
        Ok(self.state())
    }

    /// Hand a full batch to `send` and reset to empty.
    ///
    /// Returns `None` without calling `send` if the batch is not full: batches
    /// are never transmitted partially.
    pub fn flush<R>(&mut self, send: impl FnOnce(&[ReducedSample]) -> R) -> Option<R> {
        if !self.is_full() {
            return None;
        }
        let result = send(&self.samples);
        self.samples.clear();
        Some(result)
    }

    pub fn state(&self) -> BatchState {
        if self.samples.is_empty() {
            BatchState::Empty
        } else if self.samples.len() >= self.capacity {
            BatchState::Full
        } else {
            BatchState::Filling
        }
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn samples(&self) -> &[ReducedSample] {
        &self.samples
    }
}

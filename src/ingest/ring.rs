//! Circular store for the most recent raw audio frames.
//!
//! One writer, no per-slot readers: only aggregate statistics are computed
//! over the ring, so overwriting a slot nobody looked at loses nothing that
//! matters and needs no locking.

use crate::error::{KnockstreamError, Result};

/// Result of writing one frame into the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Empty read, nothing written and the cursor did not move.
    Skipped,
    /// Frame stored in `slot`; `samples` of it came from the read.
    Written { slot: usize, samples: usize },
}

impl IngestOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, IngestOutcome::Skipped)
    }
}

/// Fixed number of equal-size slots with a wrapping write cursor.
#[derive(Debug, Clone)]
pub struct AudioRing {
    slot_count: usize,
    slot_samples: usize,
    data: Vec<i32>,
    cursor: usize,
    last_slot: Option<usize>,
    last_len: usize,
    writes: u64,
}

impl AudioRing {
    /// Allocate a zeroed ring of `slot_count` × `slot_samples` samples.
    pub fn new(slot_count: usize, slot_samples: usize) -> Result<Self> {
        if slot_count == 0 || slot_samples == 0 {
            return Err(KnockstreamError::ConfigInvalidValue {
                key: "ring".to_string(),
                message: format!(
                    "ring needs at least one slot of one sample, got {}x{}",
                    slot_count, slot_samples
                ),
            });
        }
        Ok(Self {
            slot_count,
            slot_samples,
            data: vec![0; slot_count * slot_samples],
            cursor: 0,
            last_slot: None,
            last_len: 0,
            writes: 0,
        })
    }

    /// Write `frame` into the slot under the cursor and advance the cursor.
    ///
    /// A frame shorter than a slot is zero-padded; a longer one is cut to the
    /// slot size. Only `frame` is read, never past it.
    pub fn ingest(&mut self, frame: &[i32]) -> IngestOutcome {
        if frame.is_empty() {
            return IngestOutcome::Skipped;
        }

        let slot = self.cursor;
        let n = frame.len().min(self.slot_samples);
        let start = slot * self.slot_samples;
        let dest = &mut self.data[start..start + self.slot_samples];
        dest[..n].copy_from_slice(&frame[..n]);
        dest[n..].fill(0);

        self.last_slot = Some(slot);
        self.last_len = n;
        self.writes += 1;
        self.cursor = (self.cursor + 1) % self.slot_count;

        IngestOutcome::Written { slot, samples: n }
    }

    /// Every sample in the ring, slot 0 first.
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// Contents of one slot.
    pub fn slot(&self, index: usize) -> &[i32] {
        let start = index * self.slot_samples;
        &self.data[start..start + self.slot_samples]
    }

    /// The valid samples of the most recently written frame.
    pub fn latest_frame(&self) -> &[i32] {
        match self.last_slot {
            Some(slot) => {
                let start = slot * self.slot_samples;
                &self.data[start..start + self.last_len]
            }
            None => &[],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn slot_samples(&self) -> usize {
        self.slot_samples
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Index of the slot the next frame will land in.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Frames written since creation.
    pub fn writes(&self) -> u64 {
        self.writes
    }
}

use crate::ingest::reducer::ReducedSample;
use crate::wire;

/// Smallest transmit buffer accepted by configuration.
///
/// Room for a 10-digit level, a comma, a signed six-digit magnitude with
/// three decimals and the newline.
pub const MIN_FRAME_BYTES: usize = 24;

/// One encoded batch, ready for a single transport message.
#[derive(Debug, Clone, PartialEq)]
pub struct WireFrame {
    payload: String,
    records: usize,
    truncated: bool,
}

impl WireFrame {
    pub fn as_bytes(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Complete records in the payload.
    pub fn records(&self) -> usize {
        self.records
    }

    /// True if records were left out to stay within the buffer.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Serializes batches into the line protocol within a byte budget.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    max_bytes: usize,
    scratch: String,
}

impl FrameEncoder {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            scratch: String::with_capacity(MIN_FRAME_BYTES),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Encode `samples` as `<level>,<magnitude>\n` records.
    ///
    /// Stops at the last record that fits; a record is either written whole
    /// or not at all.
    pub fn encode(&mut self, samples: &[ReducedSample]) -> WireFrame {
        let mut payload = String::with_capacity(self.max_bytes.min(samples.len() * MIN_FRAME_BYTES));
        let mut records = 0;
        let mut truncated = false;

        for sample in samples {
            self.scratch.clear();
            wire::write_record(&mut self.scratch, sample);
            if payload.len() + self.scratch.len() > self.max_bytes {
                truncated = true;
                break;
            }
            payload.push_str(&self.scratch);
            records += 1;
        }

        if truncated {
            log::warn!(
                "Encoded {} of {} records, frame limit is {} bytes",
                records,
                samples.len(),
                self.max_bytes
            );
        }

        WireFrame {
            payload,
            records,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(count: usize) -> Vec<ReducedSample> {
        (0..count)
            .map(|i| ReducedSample::new(1200 + i as u32, 0.5 + i as f32 / 1000.0))
            .collect()
    }

    #[test]
    fn test_encodes_one_line_per_sample() {
        let mut encoder = FrameEncoder::new(1024);
        let frame = encoder.encode(&[
            ReducedSample::new(1423, 0.842),
            ReducedSample::new(0, 9.80665),
        ]);
        assert_eq!(frame.as_str(), "1423,0.842\n0,9.807\n");
        assert_eq!(frame.records(), 2);
        assert!(!frame.truncated());
    }

    #[test]
    fn test_negative_magnitude_keeps_sign() {
        let mut encoder = FrameEncoder::new(64);
        let frame = encoder.encode(&[ReducedSample::new(5, -1.25)]);
        assert_eq!(frame.as_str(), "5,-1.250\n");
    }

    #[test]
    fn test_truncates_at_record_boundary() {
        // Each record is "12xx,0.5xx\n" = 11 bytes
        let mut encoder = FrameEncoder::new(30);
        let frame = encoder.encode(&samples(5));

        assert_eq!(frame.records(), 2);
        assert!(frame.truncated());
        assert_eq!(frame.len(), 22);
        assert!(frame.as_str().ends_with('\n'));
    }

    #[test]
    fn test_exact_fit_is_not_truncated() {
        let mut encoder = FrameEncoder::new(33);
        let frame = encoder.encode(&samples(3));
        assert_eq!(frame.records(), 3);
        assert_eq!(frame.len(), 33);
        assert!(!frame.truncated());
    }

    #[test]
    fn test_output_never_exceeds_budget_or_splits_a_record() {
        let batch = samples(50);
        for budget in 0..700 {
            let mut encoder = FrameEncoder::new(budget);
            let frame = encoder.encode(&batch);

            assert!(frame.len() <= budget, "budget {}", budget);
            assert!(frame.records() <= batch.len());
            assert_eq!(frame.as_str().matches('\n').count(), frame.records());
            assert!(frame.is_empty() || frame.as_str().ends_with('\n'));
            for line in frame.as_str().lines() {
                assert!(wire::parse_record(line).is_ok(), "bad line {:?}", line);
            }
        }
    }

    #[test]
    fn test_empty_batch_encodes_empty_frame() {
        let mut encoder = FrameEncoder::new(100);
        let frame = encoder.encode(&[]);
        assert!(frame.is_empty());
        assert_eq!(frame.records(), 0);
        assert!(!frame.truncated());
    }
}

//! Knock detection on top of prediction lines.

use crate::config::DetectorConfig;
use crate::consumer::classifier::ClassificationResult;
use crate::defaults;
use crate::error::Result;
use crate::wire;
use std::io::{BufRead, Read};

/// One score that crossed the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub score: f32,
}

/// Reports a detection whenever one label's score reaches a threshold.
#[derive(Debug, Clone)]
pub struct KnockDetector {
    label: String,
    threshold: f32,
    detections: u64,
}

impl KnockDetector {
    pub fn new(label: impl Into<String>, threshold: f32) -> Self {
        Self {
            label: label.into(),
            threshold,
            detections: 0,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(config.label.clone(), config.threshold)
    }

    pub fn observe(&mut self, result: &ClassificationResult) -> Option<Detection> {
        let score = result.score(&self.label)?;
        if score < self.threshold {
            return None;
        }
        self.detections += 1;
        Some(Detection {
            label: self.label.clone(),
            score,
        })
    }

    /// Parse a `PRED` line and observe it. Other lines are ignored.
    pub fn observe_line(&mut self, line: &str) -> Option<Detection> {
        let result = wire::parse_prediction(line)?;
        self.observe(&result)
    }

    /// Observe every line of `reader`, calling `on_detection` for each hit.
    ///
    /// Input is decoded lossily, so corrupt bytes cost one line rather than
    /// the whole run. Reads are capped at `defaults::MAX_LINE_BYTES`.
    pub fn run<R: BufRead>(
        &mut self,
        mut reader: R,
        mut on_detection: impl FnMut(&Detection),
    ) -> Result<u64> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = (&mut reader)
                .take(defaults::MAX_LINE_BYTES as u64)
                .read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            if let Some(detection) = self.observe_line(line.trim_end()) {
                on_detection(&detection);
            }
        }
        Ok(self.detections)
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }
}

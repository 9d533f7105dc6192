//! Line protocols.
//!
//! Producer → consumer, one record per line, one transport message per batch:
//! ```text
//! <level>,<magnitude>\n        e.g. 1423,0.842
//! ```
//! Consumer → downstream, one line per inference:
//! ```text
//! PRED <label>=<score> <label>=<score> ...
//! ```

use crate::consumer::classifier::ClassificationResult;
use crate::error::{KnockstreamError, Result};
use crate::ingest::reducer::ReducedSample;
use std::fmt::Write;

/// Prefix of every prediction line.
pub const PRED_PREFIX: &str = "PRED";

/// One decoded producer record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireRecord {
    /// Reduced audio level. Carried for multi-channel models, unused by the
    /// single-channel window.
    pub mic_level: f32,
    pub imu_magnitude: f32,
}

/// Append one record, newline included.
pub fn write_record(out: &mut String, sample: &ReducedSample) {
    // Writing into a String cannot fail
    writeln!(out, "{},{:.3}", sample.mic_level, sample.imu_magnitude).ok();
}

/// Decode one line of the producer protocol.
///
/// Returns `Ok(None)` for a blank line. A line with fewer than two
/// comma-separated fields, or a field that is not a number, is
/// `MalformedRecord`. Fields past the second are ignored.
pub fn parse_record(line: &str) -> Result<Option<WireRecord>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let malformed = || KnockstreamError::MalformedRecord {
        line: line.to_string(),
    };

    let mut fields = line.split(',');
    let (Some(mic), Some(imu)) = (fields.next(), fields.next()) else {
        return Err(malformed());
    };

    let mic_level = mic.trim().parse::<f32>().map_err(|_| malformed())?;
    let imu_magnitude = imu.trim().parse::<f32>().map_err(|_| malformed())?;

    Ok(Some(WireRecord {
        mic_level,
        imu_magnitude,
    }))
}

/// Render a result as a `PRED` line, without the newline.
pub fn format_prediction(result: &ClassificationResult) -> String {
    let mut line = String::from(PRED_PREFIX);
    for (label, score) in result.scores() {
        write!(line, " {}={:.3}", label, score).ok();
    }
    line
}

/// Parse a `PRED` line.
///
/// Returns `None` for lines that are not predictions. Tokens without `=` or
/// with an unparsable score are skipped.
pub fn parse_prediction(line: &str) -> Option<ClassificationResult> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(PRED_PREFIX) {
        return None;
    }

    let scores = tokens
        .filter_map(|token| {
            let (label, value) = token.split_once('=')?;
            let score = value.parse::<f32>().ok()?;
            Some((label.to_string(), score))
        })
        .collect();

    Some(ClassificationResult::new(scores))
}

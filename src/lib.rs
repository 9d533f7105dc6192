//! knockstream - sensor streaming and knock classification
//!
//! A device-side loop reduces microphone and accelerometer data to a
//! `<level>,<magnitude>` line stream; a host-side consumer classifies the
//! accelerometer channel over a sliding window.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod consumer;
pub mod defaults;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod sensor;
pub mod transport;
pub mod wire;

// Collaborator traits (sensor → transport → classifier → sink)
pub use consumer::classifier::Classifier;
pub use consumer::sink::PredictionSink;
pub use sensor::bus::SensorBus;
pub use transport::Transport;

// Device side
pub use pipeline::producer::{Producer, ProducerStats, StepOutcome};

// Host side
pub use consumer::stream::{ConsumerStats, LineOutcome, StreamConsumer};

// Error handling
pub use error::{KnockstreamError, Result};

// Config
pub use config::Config;

pub use pipeline::error::{ErrorReporter, StationError};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_has_hash_only_when_built_from_git() {
        let ver = version_string();
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(ver.contains('+'), "expected '+<hash>', got: {}", ver);
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}

//! End-to-end streaming: the device loop and its error reporting.
//!
//! ```text
//! SensorBus → AudioRing → FeatureReducer → BatchAccumulator → FrameEncoder → Transport
//!                                                                               │
//!                                                                    "<level>,<magnitude>\n"
//!                                                                               ▼
//!                                   PredictionSink ← InferenceDriver ← StreamWindow ← StreamConsumer
//! ```

pub mod error;
pub mod producer;

pub use error::{ErrorReporter, LogReporter, StationError};
pub use producer::{Producer, ProducerStats, StepOutcome};

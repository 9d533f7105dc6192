//! Host-side consumer: protocol lines in, classification results out.
//!
//! ```text
//! line ──parse──▶ StreamWindow ──full?──▶ InferenceDriver ──▶ PredictionSink
//!                                                    │
//!                                         KnockDetector (optional)
//! ```

pub mod classifier;
pub mod detector;
pub mod driver;
pub mod features;
pub mod server;
pub mod sink;
pub mod stream;
pub mod window;

pub use classifier::{ClassificationResult, Classifier, FeatureClassifier, MockClassifier};
pub use detector::{Detection, KnockDetector};
pub use driver::InferenceDriver;
pub use features::WindowFeatures;
pub use server::LineServer;
pub use sink::{CollectorSink, JsonSink, PredLineSink, PredictionSink};
pub use stream::{ConsumerStats, LineOutcome, StreamConsumer};
pub use window::StreamWindow;

//! Batching and framing of reduced samples for the transport.

pub mod accumulator;
pub mod encoder;

pub use accumulator::{BatchAccumulator, BatchState};
pub use encoder::{FrameEncoder, WireFrame};

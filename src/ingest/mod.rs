//! Device-side ingestion: raw DMA frames in, one reduced sample pair out.
//!
//! ```text
//! SensorBus ──read──▶ AudioRing ──┐
//!     │                           ├──▶ FeatureReducer ──▶ ReducedSample
//!     └──poll (RateLimiter)───────┘
//! ```

pub mod rate_limit;
pub mod reducer;
pub mod ring;

pub use rate_limit::{Clock, RateLimiter, SystemClock};
pub use reducer::{AudioReduction, FeatureReducer, InertialReduction, ReducedSample};
pub use ring::{AudioRing, IngestOutcome};

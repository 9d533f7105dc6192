//! Default configuration constants for knockstream.
//!
//! Shared by the configuration types and the components so that the producer
//! and the consumer agree on sizes without a config file.

/// Number of slots in the raw audio ring.
///
/// Matches the I2S DMA descriptor count, so the ring holds exactly what the
/// driver can have in flight.
pub const RING_SLOTS: usize = 8;

/// Samples per raw audio frame (one DMA read).
pub const SLOT_SAMPLES: usize = 16;

/// Microphone sample rate in Hz.
pub const SAMPLE_RATE: u32 = 16000;

/// Reduced samples per transmitted batch.
pub const BATCH_SIZE: usize = 1000;

/// Bytes reserved per encoded record when sizing the transmit buffer.
pub const BYTES_PER_RECORD: usize = 20;

/// Headroom on top of the per-record estimate.
pub const SEND_HEADROOM_BYTES: usize = 4000;

/// Transmit buffer size for one encoded batch.
pub const SEND_BUFFER_BYTES: usize = BATCH_SIZE * BYTES_PER_RECORD + SEND_HEADROOM_BYTES;

/// Upper bound on inertial polls per second.
pub const INERTIAL_RATE_HZ: u32 = 200;

/// How long one audio read may block before the iteration is skipped.
pub const READ_TIMEOUT_MS: u64 = 100;

/// TCP port shared by the producer endpoint and the consumer listener.
pub const PORT: u16 = 8765;

/// Default producer endpoint.
pub const ENDPOINT: &str = "127.0.0.1:8765";

/// Default consumer listen address.
pub const LISTEN: &str = "0.0.0.0:8765";

/// Delay between reconnection attempts.
pub const RECONNECT_INTERVAL_MS: u64 = 5000;

/// Timeout for a single connection attempt.
pub const CONNECT_TIMEOUT_MS: u64 = 2000;

/// How long one frame write may block before the link is dropped.
pub const WRITE_TIMEOUT_MS: u64 = 500;

/// Longest accepted input line, newline included.
pub const MAX_LINE_BYTES: usize = 1024;

/// Sliding window length fed to the classifier.
pub const WINDOW_SIZE: usize = 100;

/// Peak-to-peak inertial swing (m/s²) at which the built-in model scores 0.5.
pub const KNOCK_PTP_THRESHOLD: f32 = 2.0;

/// Logistic slope of the built-in model around the threshold.
pub const KNOCK_PTP_SCALE: f32 = 0.5;

/// Label reported as a knock.
pub const KNOCK_LABEL: &str = "knock";

/// Label for everything else.
pub const NOISE_LABEL: &str = "noise";

/// Score at or above which a knock is reported.
pub const KNOCK_THRESHOLD: f32 = 0.8;

/// Standard gravity, used by the synthetic inertial source.
pub const GRAVITY: f32 = 9.806_65;

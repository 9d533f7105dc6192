use crate::batch::encoder::MIN_FRAME_BYTES;
use crate::defaults;
use crate::error::{KnockstreamError, Result};
use crate::ingest::reducer::{AudioReduction, InertialReduction};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub producer: ProducerConfig,
    pub transport: TransportConfig,
    pub consumer: ConsumerConfig,
    pub classifier: ClassifierConfig,
    pub detector: DetectorConfig,
}

/// Sensor ingestion and batching on the device side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProducerConfig {
    pub ring_slots: usize,
    pub slot_samples: usize,
    pub batch_size: usize,
    pub send_buffer_bytes: usize,
    pub read_timeout_ms: u64,
    pub audio_reduction: AudioReduction,
    pub inertial_reduction: InertialReduction,
    pub inertial_rate_hz: u32,
}

/// Link between producer and consumer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub endpoint: String,
    pub reconnect_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

/// Sliding-window consumer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsumerConfig {
    pub window_size: usize,
    pub listen: String,
    pub output: OutputFormat,
}

/// Built-in feature classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub ptp_threshold: f32,
    pub ptp_scale: f32,
}

/// Knock detection on top of predictions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    pub label: String,
    pub threshold: f32,
}

/// Consumer output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `PRED label=score ...` lines
    #[default]
    Pred,
    /// One JSON object per inference
    Json,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            ring_slots: defaults::RING_SLOTS,
            slot_samples: defaults::SLOT_SAMPLES,
            batch_size: defaults::BATCH_SIZE,
            send_buffer_bytes: defaults::SEND_BUFFER_BYTES,
            read_timeout_ms: defaults::READ_TIMEOUT_MS,
            audio_reduction: AudioReduction::default(),
            inertial_reduction: InertialReduction::default(),
            inertial_rate_hz: defaults::INERTIAL_RATE_HZ,
        }
    }
}

impl ProducerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::ENDPOINT.to_string(),
            reconnect_interval_ms: defaults::RECONNECT_INTERVAL_MS,
            connect_timeout_ms: defaults::CONNECT_TIMEOUT_MS,
            write_timeout_ms: defaults::WRITE_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::WINDOW_SIZE,
            listen: defaults::LISTEN.to_string(),
            output: OutputFormat::Pred,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ptp_threshold: defaults::KNOCK_PTP_THRESHOLD,
            ptp_scale: defaults::KNOCK_PTP_SCALE,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            label: defaults::KNOCK_LABEL.to_string(),
            threshold: defaults::KNOCK_THRESHOLD,
        }
    }
}

fn invalid(key: &str, message: &str) -> KnockstreamError {
    KnockstreamError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(KnockstreamError::ConfigFileNotFound {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML and invalid values are still errors.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(KnockstreamError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - KNOCKSTREAM_ENDPOINT → transport.endpoint
    /// - KNOCKSTREAM_LISTEN → consumer.listen
    /// - KNOCKSTREAM_WINDOW_SIZE → consumer.window_size (ignored unless a positive integer)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var("KNOCKSTREAM_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.transport.endpoint = endpoint;
        }

        if let Ok(listen) = std::env::var("KNOCKSTREAM_LISTEN")
            && !listen.is_empty()
        {
            self.consumer.listen = listen;
        }

        if let Ok(size) = std::env::var("KNOCKSTREAM_WINDOW_SIZE")
            && let Ok(size) = size.trim().parse::<usize>()
            && size > 0
        {
            self.consumer.window_size = size;
        }

        self
    }

    /// Check values that would make a component unusable.
    pub fn validate(&self) -> Result<()> {
        let p = &self.producer;
        if p.ring_slots == 0 {
            return Err(invalid("producer.ring_slots", "must be at least 1"));
        }
        if p.slot_samples == 0 {
            return Err(invalid("producer.slot_samples", "must be at least 1"));
        }
        if p.batch_size == 0 {
            return Err(invalid("producer.batch_size", "must be at least 1"));
        }
        if p.send_buffer_bytes < MIN_FRAME_BYTES {
            return Err(invalid(
                "producer.send_buffer_bytes",
                &format!("must hold at least one record ({} bytes)", MIN_FRAME_BYTES),
            ));
        }
        if p.inertial_rate_hz == 0 {
            return Err(invalid("producer.inertial_rate_hz", "must be positive"));
        }
        if self.transport.connect_timeout_ms == 0 {
            return Err(invalid("transport.connect_timeout_ms", "must be positive"));
        }
        if self.transport.write_timeout_ms == 0 {
            return Err(invalid("transport.write_timeout_ms", "must be positive"));
        }
        if self.consumer.window_size == 0 {
            return Err(invalid("consumer.window_size", "must be at least 1"));
        }
        if !(self.classifier.ptp_scale > 0.0) {
            return Err(invalid("classifier.ptp_scale", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.detector.threshold) {
            return Err(invalid("detector.threshold", "must be within [0, 1]"));
        }
        if self.detector.label.is_empty() {
            return Err(invalid("detector.label", "must not be empty"));
        }
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/knockstream/config.toml on Linux, or `None` when the
    /// platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("knockstream").join("config.toml"))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| KnockstreamError::ConfigParse {
            message: e.to_string(),
        })
    }
}

//! WAV file replay on the microphone channel.

use crate::defaults;
use crate::error::{KnockstreamError, Result};
use crate::sensor::bus::{InertialReading, SensorBus};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Sensor bus that replays a recording as I2S frames.
///
/// Samples are down-mixed to mono and left-justified into 32-bit slots, the
/// layout an I2S microphone delivers. The accelerometer reports rest.
pub struct WavSensorBus {
    samples: Vec<i16>,
    position: usize,
    looping: bool,
}

impl WavSensorBus {
    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| KnockstreamError::SensorRead {
                message: format!("Failed to parse WAV file: {}", e),
            })?;

        let spec = wav_reader.spec();
        if spec.sample_rate != defaults::SAMPLE_RATE {
            log::warn!(
                "WAV sample rate is {} Hz, replaying as if it were {} Hz",
                spec.sample_rate,
                defaults::SAMPLE_RATE
            );
        }

        let raw_samples: Vec<i16> = wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| KnockstreamError::SensorRead {
                message: format!("Failed to read WAV samples: {}", e),
            })?;

        let channels = spec.channels.max(1) as usize;
        let samples = if channels > 1 {
            raw_samples
                .chunks_exact(channels)
                .map(|frame| {
                    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                    (sum / channels as i32) as i16
                })
                .collect()
        } else {
            raw_samples
        };

        Ok(Self {
            samples,
            position: 0,
            looping: true,
        })
    }

    /// Open a WAV file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| KnockstreamError::SensorNotFound {
            sensor: format!("{}: {}", path.display(), e),
        })?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)))
    }

    /// Restart from the beginning at end of file instead of returning empty reads.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SensorBus for WavSensorBus {
    fn init(&mut self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(KnockstreamError::SensorNotFound {
                sensor: "WAV recording has no samples".to_string(),
            });
        }
        self.position = 0;
        Ok(())
    }

    fn read_audio_frame(&mut self, buf: &mut [i32], _timeout: Duration) -> Result<usize> {
        if self.position >= self.samples.len() {
            if !self.looping {
                return Ok(0);
            }
            self.position = 0;
        }

        let end = (self.position + buf.len()).min(self.samples.len());
        let chunk = &self.samples[self.position..end];
        for (slot, &sample) in buf.iter_mut().zip(chunk) {
            *slot = (sample as i32) << 16;
        }
        self.position = end;
        Ok(chunk.len())
    }

    fn poll_inertial(&mut self) -> Result<InertialReading> {
        Ok(InertialReading::new(0.0, 0.0, defaults::GRAVITY))
    }
}

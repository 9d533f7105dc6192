//! Reduction of raw sensor data to one scalar per channel.

use crate::ingest::ring::AudioRing;
use crate::sensor::bus::InertialReading;
use serde::{Deserialize, Serialize};

/// How the microphone channel is reduced to a level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioReduction {
    /// Mean of |high byte| over the whole ring, in raw 8-bit units.
    /// Smooths more, lags by up to one ring length.
    AverageMagnitude,
    /// Root-mean-square of the latest frame as 16-bit PCM.
    #[default]
    Rms,
}

/// How the accelerometer is reduced to a scalar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InertialReduction {
    /// Euclidean norm of the three axes; independent of orientation.
    #[default]
    Magnitude,
    /// Arithmetic mean of the three axes.
    MeanOfAxes,
}

/// One instant of the reduced stream.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReducedSample {
    pub mic_level: u32,
    pub imu_magnitude: f32,
}

impl ReducedSample {
    pub fn new(mic_level: u32, imu_magnitude: f32) -> Self {
        Self {
            mic_level,
            imu_magnitude,
        }
    }
}

/// Mean absolute value of the top byte of each 32-bit sample.
pub fn average_magnitude(samples: &[i32]) -> u32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: u64 = samples
        .iter()
        .map(|&sample| (sample >> 24).unsigned_abs() as u64)
        .sum();
    (sum / samples.len() as u64) as u32
}

/// RMS of 32-bit I2S samples taken as 16-bit PCM.
///
/// Accumulates in i64 so a full-scale frame of any practical length cannot
/// overflow.
pub fn frame_rms(samples: &[i32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: i64 = samples
        .iter()
        .map(|&sample| {
            let pcm = (sample >> 16) as i64;
            pcm * pcm
        })
        .sum();
    (sum_squares as f64 / samples.len() as f64).sqrt()
}

impl AudioReduction {
    /// Level for the current ring state.
    pub fn level(&self, ring: &AudioRing) -> u32 {
        match self {
            AudioReduction::AverageMagnitude => average_magnitude(ring.as_slice()),
            AudioReduction::Rms => frame_rms(ring.latest_frame()).round() as u32,
        }
    }
}

impl InertialReduction {
    pub fn reduce(&self, reading: &InertialReading) -> f32 {
        match self {
            InertialReduction::Magnitude => reading.magnitude(),
            InertialReduction::MeanOfAxes => reading.mean(),
        }
    }
}

/// Applies the selected reduction to each channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureReducer {
    audio: AudioReduction,
    inertial: InertialReduction,
}

impl FeatureReducer {
    pub fn new(audio: AudioReduction, inertial: InertialReduction) -> Self {
        Self { audio, inertial }
    }

    /// Pure function of the ring contents and the inertial reading.
    pub fn reduce(&self, ring: &AudioRing, reading: &InertialReading) -> ReducedSample {
        ReducedSample {
            mic_level: self.audio.level(ring),
            imu_magnitude: self.inertial.reduce(reading),
        }
    }

    pub fn audio(&self) -> AudioReduction {
        self.audio
    }

    pub fn inertial(&self) -> InertialReduction {
        self.inertial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(values: &[i16]) -> Vec<i32> {
        values.iter().map(|&v| (v as i32) << 16).collect()
    }

    #[test]
    fn test_rms_silence_is_zero() {
        assert_eq!(frame_rms(&pcm(&[0; 16])), 0.0);
        assert_eq!(frame_rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_constant_signal() {
        let rms = frame_rms(&pcm(&[1000; 16]));
        assert!((rms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_rms_sign_does_not_matter() {
        let rms = frame_rms(&pcm(&[-1000, 1000, -1000, 1000]));
        assert!((rms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_rms_full_scale_does_not_overflow() {
        let rms = frame_rms(&vec![i32::MIN; 4096]);
        assert!((rms - 32768.0).abs() < 1e-6);
    }

    #[test]
    fn test_rms_non_negative_and_zero_only_for_silence() {
        // Deterministic sweep over mixed frames
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..200 {
            let frame: Vec<i32> = (0..16)
                .map(|_| {
                    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    seed as i32
                })
                .collect();
            let rms = frame_rms(&frame);
            let all_zero = frame.iter().all(|&s| s >> 16 == 0);
            assert!(rms >= 0.0);
            assert_eq!(rms == 0.0, all_zero, "frame {:?}", frame);
        }

        let one_nonzero = pcm(&[0, 0, 0, 1]);
        assert!(frame_rms(&one_nonzero) > 0.0);
    }

    #[test]
    fn test_average_magnitude_uses_high_byte() {
        // 0x7F00_0000 >> 24 = 127, i32::MIN >> 24 = -128
        let samples = [0x7F00_0000, i32::MIN, 0, 0x00FF_FFFF];
        assert_eq!(average_magnitude(&samples), (127 + 128) / 4);
    }

    #[test]
    fn test_average_magnitude_spans_whole_ring() {
        let mut ring = AudioRing::new(4, 2).unwrap();
        ring.ingest(&[0x4000_0000, 0x4000_0000]); // high byte 64
        let level = AudioReduction::AverageMagnitude.level(&ring);
        // Two loud samples averaged over eight
        assert_eq!(level, 16);
    }

    #[test]
    fn test_rms_level_uses_latest_frame_only() {
        let mut ring = AudioRing::new(4, 4).unwrap();
        ring.ingest(&pcm(&[3000; 4]));
        ring.ingest(&pcm(&[400, -400, 400, -400]));
        assert_eq!(AudioReduction::Rms.level(&ring), 400);
    }

    #[test]
    fn test_rms_level_ignores_padding_of_short_frame() {
        let mut ring = AudioRing::new(1, 16).unwrap();
        ring.ingest(&pcm(&[500, 500]));
        assert_eq!(AudioReduction::Rms.level(&ring), 500);
    }

    #[test]
    fn test_feature_reducer_defaults() {
        let reducer = FeatureReducer::default();
        assert_eq!(reducer.audio(), AudioReduction::Rms);
        assert_eq!(reducer.inertial(), InertialReduction::Magnitude);
    }

    #[test]
    fn test_feature_reducer_pairs_channels() {
        let mut ring = AudioRing::new(2, 4).unwrap();
        ring.ingest(&pcm(&[1423; 4]));
        let reading = InertialReading::new(0.0, 0.6, 0.6);

        let sample = FeatureReducer::default().reduce(&ring, &reading);
        assert_eq!(sample.mic_level, 1423);
        assert!((sample.imu_magnitude - 0.848_528).abs() < 1e-5);
    }

    #[test]
    fn test_mean_of_axes_variant() {
        let ring = AudioRing::new(1, 1).unwrap();
        let reducer = FeatureReducer::new(
            AudioReduction::AverageMagnitude,
            InertialReduction::MeanOfAxes,
        );
        let sample = reducer.reduce(&ring, &InertialReading::new(3.0, 3.0, 3.0));
        assert_eq!(sample, ReducedSample::new(0, 3.0));
    }
}

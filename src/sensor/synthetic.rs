//! Deterministic sensor source for demos and soak runs without hardware.

use crate::defaults;
use crate::error::Result;
use crate::sensor::bus::{InertialReading, SensorBus};
use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

/// Generates a sine tone on the microphone channel and a resting
/// accelerometer with periodic knock impulses on the inertial channel.
#[derive(Debug, Clone)]
pub struct SyntheticSensorBus {
    sample_rate: u32,
    tone_hz: f32,
    amplitude: i16,
    phase: f32,
    knock_every: u64,
    knock_length: u64,
    knock_peak: f32,
    polls: u64,
    realtime: bool,
}

impl SyntheticSensorBus {
    pub fn new() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            tone_hz: 440.0,
            amplitude: 2000,
            phase: 0.0,
            knock_every: 600,
            knock_length: 8,
            knock_peak: 6.0,
            polls: 0,
            realtime: false,
        }
    }

    /// Tone frequency and peak amplitude of the microphone channel.
    pub fn with_tone(mut self, tone_hz: f32, amplitude: i16) -> Self {
        self.tone_hz = tone_hz;
        self.amplitude = amplitude;
        self
    }

    /// Emit a knock every `every` polls, decaying over `length` polls.
    pub fn with_knocks(mut self, every: u64, length: u64, peak: f32) -> Self {
        self.knock_every = every.max(1);
        self.knock_length = length.min(self.knock_every);
        self.knock_peak = peak;
        self
    }

    /// Sleep for the duration of each frame so reads pace like a DMA driver.
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    fn knock_offset(&self) -> f32 {
        let position = self.polls % self.knock_every;
        if self.polls < self.knock_every || position >= self.knock_length {
            return 0.0;
        }
        let decay = 1.0 - position as f32 / self.knock_length as f32;
        // Alternate sign so the impulse rings instead of drifting
        let sign = if position % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.knock_peak * decay
    }
}

impl Default for SyntheticSensorBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBus for SyntheticSensorBus {
    fn init(&mut self) -> Result<()> {
        self.phase = 0.0;
        self.polls = 0;
        Ok(())
    }

    fn read_audio_frame(&mut self, buf: &mut [i32], _timeout: Duration) -> Result<usize> {
        let step = TAU * self.tone_hz / self.sample_rate as f32;
        for slot in buf.iter_mut() {
            let sample = (self.phase.sin() * self.amplitude as f32) as i16;
            // 16-bit value left-justified in a 32-bit I2S slot
            *slot = (sample as i32) << 16;
            self.phase = (self.phase + step) % TAU;
        }
        if self.realtime {
            let micros = buf.len() as u64 * 1_000_000 / self.sample_rate as u64;
            thread::sleep(Duration::from_micros(micros));
        }
        Ok(buf.len())
    }

    fn poll_inertial(&mut self) -> Result<InertialReading> {
        let offset = self.knock_offset();
        self.polls += 1;
        Ok(InertialReading::new(0.0, 0.0, defaults::GRAVITY + offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_fill_whole_buffer() {
        let mut bus = SyntheticSensorBus::new();
        let mut buf = [0i32; 16];
        assert_eq!(
            bus.read_audio_frame(&mut buf, Duration::from_millis(1)).unwrap(),
            16
        );
        assert!(buf.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_samples_are_left_justified() {
        let mut bus = SyntheticSensorBus::new();
        let mut buf = [0i32; 64];
        bus.read_audio_frame(&mut buf, Duration::from_millis(1)).unwrap();
        assert!(buf.iter().all(|&s| s & 0xFFFF == 0));
        assert!(buf.iter().all(|&s| (s >> 16).abs() <= 2000));
    }

    #[test]
    fn test_resting_magnitude_is_gravity() {
        let mut bus = SyntheticSensorBus::new().with_knocks(100, 5, 6.0);
        let reading = bus.poll_inertial().unwrap();
        assert!((reading.magnitude() - defaults::GRAVITY).abs() < 1e-4);
    }

    #[test]
    fn test_knock_appears_periodically() {
        let mut bus = SyntheticSensorBus::new().with_knocks(10, 3, 6.0);
        let zs: Vec<f32> = (0..30)
            .map(|_| bus.poll_inertial().unwrap().z - defaults::GRAVITY)
            .collect();

        // First period is quiet
        assert!(zs[..10].iter().all(|&z| z == 0.0));
        assert!((zs[10] - 6.0).abs() < 1e-4);
        assert!(zs[11] < 0.0);
        assert_eq!(zs[13], 0.0);
        assert!((zs[20] - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_knock_swings_magnitude_both_ways() {
        let mut bus = SyntheticSensorBus::new().with_knocks(10, 4, 6.0);
        let magnitudes: Vec<f32> = (0..14)
            .map(|_| bus.poll_inertial().unwrap().magnitude())
            .collect();
        let max = magnitudes.iter().cloned().fold(f32::MIN, f32::max);
        let min = magnitudes.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max - min > defaults::KNOCK_PTP_THRESHOLD * 2.0);
    }
}

use crate::error::{KnockstreamError, Result};
use std::collections::VecDeque;
use std::time::Duration;

/// One accelerometer reading in m/s².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InertialReading {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl InertialReading {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm of the three axes.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Arithmetic mean of the three axes (orientation dependent).
    pub fn mean(&self) -> f32 {
        (self.x + self.y + self.z) / 3.0
    }
}

/// Trait for the sensor bus shared by the microphone and the inertial sensor.
///
/// This trait allows swapping implementations (real hardware vs mock).
pub trait SensorBus: Send {
    /// Probe and configure the sensors.
    ///
    /// Failure here is fatal: streaming must not start with a missing sensor.
    fn init(&mut self) -> Result<()>;

    /// Read one raw audio frame of 32-bit I2S samples into `buf`.
    ///
    /// Blocks for at most `timeout`. Returns the number of samples written,
    /// which may be less than `buf.len()` and is `0` when nothing arrived.
    fn read_audio_frame(&mut self, buf: &mut [i32], timeout: Duration) -> Result<usize>;

    /// Poll the accelerometer once.
    fn poll_inertial(&mut self) -> Result<InertialReading>;
}

impl<T: SensorBus + ?Sized> SensorBus for Box<T> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn read_audio_frame(&mut self, buf: &mut [i32], timeout: Duration) -> Result<usize> {
        (**self).read_audio_frame(buf, timeout)
    }

    fn poll_inertial(&mut self) -> Result<InertialReading> {
        (**self).poll_inertial()
    }
}

/// Mock sensor bus for testing
///
/// Scripted frames are returned once each, in order. When the script is
/// exhausted the repeating frame is used, or an empty read if none is set.
#[derive(Debug, Clone)]
pub struct MockSensorBus {
    frames: VecDeque<Vec<i32>>,
    repeating_frame: Option<Vec<i32>>,
    readings: VecDeque<InertialReading>,
    resting_reading: InertialReading,
    should_fail_init: bool,
    should_fail_read: bool,
    initialized: bool,
    audio_reads: usize,
    inertial_polls: usize,
}

impl MockSensorBus {
    /// Create a mock bus with no audio and a resting accelerometer
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            repeating_frame: None,
            readings: VecDeque::new(),
            resting_reading: InertialReading::new(0.0, 0.0, crate::defaults::GRAVITY),
            should_fail_init: false,
            should_fail_read: false,
            initialized: false,
            audio_reads: 0,
            inertial_polls: 0,
        }
    }

    /// Queue frames returned by successive reads
    pub fn with_frames(mut self, frames: Vec<Vec<i32>>) -> Self {
        self.frames = frames.into();
        self
    }

    /// Frame returned once the queued frames run out
    pub fn with_repeating_frame(mut self, frame: Vec<i32>) -> Self {
        self.repeating_frame = Some(frame);
        self
    }

    /// Queue inertial readings returned by successive polls
    pub fn with_readings(mut self, readings: Vec<InertialReading>) -> Self {
        self.readings = readings.into();
        self
    }

    /// Reading returned once the queued readings run out
    pub fn with_resting_reading(mut self, reading: InertialReading) -> Self {
        self.resting_reading = reading;
        self
    }

    /// Configure the mock to report a missing sensor on init
    pub fn with_init_failure(mut self) -> Self {
        self.should_fail_init = true;
        self
    }

    /// Configure the mock to fail every audio read
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn audio_reads(&self) -> usize {
        self.audio_reads
    }

    pub fn inertial_polls(&self) -> usize {
        self.inertial_polls
    }
}

impl Default for MockSensorBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBus for MockSensorBus {
    fn init(&mut self) -> Result<()> {
        if self.should_fail_init {
            return Err(KnockstreamError::SensorNotFound {
                sensor: "mock inertial sensor".to_string(),
            });
        }
        self.initialized = true;
        Ok(())
    }

    fn read_audio_frame(&mut self, buf: &mut [i32], _timeout: Duration) -> Result<usize> {
        self.audio_reads += 1;
        if self.should_fail_read {
            return Err(KnockstreamError::SensorRead {
                message: "mock read failure".to_string(),
            });
        }
        let frame = match self.frames.pop_front() {
            Some(frame) => frame,
            None => match &self.repeating_frame {
                Some(frame) => frame.clone(),
                None => return Ok(0),
            },
        };
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        Ok(n)
    }

    fn poll_inertial(&mut self) -> Result<InertialReading> {
        self.inertial_polls += 1;
        Ok(self.readings.pop_front().unwrap_or(self.resting_reading))
    }
}

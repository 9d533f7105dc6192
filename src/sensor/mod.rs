//! Sensor collaborators: the microphone DMA reader and the inertial sensor.

pub mod bus;
pub mod synthetic;
pub mod wav;

pub use bus::{InertialReading, MockSensorBus, SensorBus};
pub use synthetic::SyntheticSensorBus;
pub use wav::WavSensorBus;

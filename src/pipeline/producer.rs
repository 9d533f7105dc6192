//! Device-side streaming loop.

use crate::batch::{BatchAccumulator, BatchState, FrameEncoder};
use crate::config::ProducerConfig;
use crate::error::{KnockstreamError, Result};
use crate::ingest::{AudioRing, Clock, FeatureReducer, IngestOutcome, RateLimiter, SystemClock};
use crate::pipeline::error::{ErrorReporter, LogReporter, StationError};
use crate::sensor::{InertialReading, SensorBus};
use crate::transport::{Transport, TransportEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Result of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The sensor returned no audio; nothing changed.
    Skipped,
    /// A sample was added to a batch that is not yet full.
    Appended,
    /// The batch filled and was sent as one frame.
    Sent { records: usize, truncated: bool },
    /// The batch filled but could not be delivered and was discarded.
    Dropped,
}

/// Counters for a producer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub iterations: u64,
    pub skipped: u64,
    pub samples: u64,
    pub batches_sent: u64,
    pub batches_dropped: u64,
    pub records_sent: u64,
    pub truncated_frames: u64,
}

/// Single-threaded cooperative loop:
/// read → ingest → reduce → append → flush when full → `transport.tick()`.
///
/// A full batch is always flushed on the iteration that filled it. If the
/// transport is down at that moment the batch is dropped and accumulation
/// starts over, so the loop never stalls waiting for a link.
pub struct Producer<B: SensorBus, T: Transport, C: Clock = SystemClock> {
    bus: B,
    transport: T,
    ring: AudioRing,
    frame: Vec<i32>,
    reducer: FeatureReducer,
    limiter: RateLimiter<C>,
    held_reading: InertialReading,
    batch: BatchAccumulator,
    encoder: FrameEncoder,
    read_timeout: Duration,
    reporter: Arc<dyn ErrorReporter>,
    stats: ProducerStats,
    batch_started: Instant,
}

impl<B: SensorBus, T: Transport> Producer<B, T, SystemClock> {
    /// Initialize the sensors and build the loop.
    ///
    /// Fails if the sensors cannot be initialized; no producer exists
    /// without working hardware.
    pub fn new(bus: B, transport: T, config: &ProducerConfig) -> Result<Self> {
        Self::with_clock(bus, transport, config, SystemClock)
    }
}

impl<B: SensorBus, T: Transport, C: Clock> Producer<B, T, C> {
    pub fn with_clock(
        mut bus: B,
        mut transport: T,
        config: &ProducerConfig,
        clock: C,
    ) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(KnockstreamError::ConfigInvalidValue {
                key: "producer.batch_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        let ring = AudioRing::new(config.ring_slots, config.slot_samples)?;

        if let Err(e) = bus.init() {
            log::error!("Sensor initialization failed: {}", e);
            return Err(e);
        }
        let held_reading = bus.poll_inertial()?;
        log::info!(
            "Sensors ready: {}x{} sample ring, batches of {}",
            config.ring_slots,
            config.slot_samples,
            config.batch_size
        );

        transport.on_event(Box::new(log_transport_event));

        Ok(Self {
            bus,
            transport,
            frame: vec![0; config.slot_samples],
            ring,
            reducer: FeatureReducer::new(config.audio_reduction, config.inertial_reduction),
            limiter: RateLimiter::with_clock(config.inertial_rate_hz, clock),
            held_reading,
            batch: BatchAccumulator::new(config.batch_size),
            encoder: FrameEncoder::new(config.send_buffer_bytes),
            read_timeout: config.read_timeout(),
            reporter: Arc::new(LogReporter),
            stats: ProducerStats::default(),
            batch_started: Instant::now(),
        })
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Start connecting the transport to `endpoint`.
    pub fn connect(&mut self, endpoint: &str) -> Result<()> {
        self.transport.connect(endpoint)
    }

    /// Run exactly one iteration.
    pub fn step(&mut self) -> StepOutcome {
        self.stats.iterations += 1;
        let outcome = self.iterate();
        self.transport.tick();
        outcome
    }

    /// Loop until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> ProducerStats {
        log::info!("Streaming started");
        while running.load(Ordering::SeqCst) {
            self.step();
        }
        log::info!(
            "Streaming stopped: {} batches sent, {} dropped, {} truncated",
            self.stats.batches_sent,
            self.stats.batches_dropped,
            self.stats.truncated_frames
        );
        self.stats
    }

    fn iterate(&mut self) -> StepOutcome {
        let n = match self.bus.read_audio_frame(&mut self.frame, self.read_timeout) {
            Ok(n) => n.min(self.frame.len()),
            Err(e) => {
                self.reporter
                    .report("sensor", &StationError::Recoverable(e.to_string()));
                self.stats.skipped += 1;
                return StepOutcome::Skipped;
            }
        };
        if let IngestOutcome::Skipped = self.ring.ingest(&self.frame[..n]) {
            log::trace!("Empty audio read, skipping iteration");
            self.stats.skipped += 1;
            return StepOutcome::Skipped;
        }

        if self.limiter.try_acquire() {
            match self.bus.poll_inertial() {
                Ok(reading) => self.held_reading = reading,
                Err(e) => self
                    .reporter
                    .report("inertial", &StationError::Recoverable(e.to_string())),
            }
        }

        let sample = self.reducer.reduce(&self.ring, &self.held_reading);
        match self.batch.append(sample) {
            Ok(BatchState::Full) => {
                self.stats.samples += 1;
                self.flush()
            }
            Ok(_) => {
                self.stats.samples += 1;
                StepOutcome::Appended
            }
            Err(e) => {
                // Full batches are flushed on the iteration that fills them,
                // so this only happens if that invariant is broken.
                self.reporter
                    .report("batch", &StationError::Recoverable(e.to_string()));
                self.drop_batch();
                StepOutcome::Dropped
            }
        }
    }

    fn flush(&mut self) -> StepOutcome {
        if !self.transport.is_connected() {
            log::debug!(
                "Transport down, dropping batch of {} samples",
                self.batch.len()
            );
            self.drop_batch();
            return StepOutcome::Dropped;
        }

        let encoder = &mut self.encoder;
        let transport = &mut self.transport;
        let flushed = self.batch.flush(|samples| {
            let frame = encoder.encode(samples);
            let sent = transport.send(frame.as_bytes());
            (samples.len(), frame.records(), frame.truncated(), sent)
        });
        let elapsed = self.batch_started.elapsed();
        self.batch_started = Instant::now();

        match flushed {
            Some((batch_len, records, truncated, Ok(()))) => {
                self.stats.batches_sent += 1;
                self.stats.records_sent += records as u64;
                if truncated {
                    self.stats.truncated_frames += 1;
                }
                let secs = elapsed.as_secs_f64();
                let rate = if secs > 0.0 {
                    batch_len as f64 / secs
                } else {
                    0.0
                };
                log::info!(
                    "sent batch of {} samples in {:.3} s ({:.1} samples/s)",
                    batch_len,
                    secs,
                    rate
                );
                StepOutcome::Sent { records, truncated }
            }
            Some((_, _, _, Err(e))) => {
                self.reporter
                    .report("transport", &StationError::Recoverable(e.to_string()));
                self.stats.batches_dropped += 1;
                StepOutcome::Dropped
            }
            None => StepOutcome::Appended,
        }
    }

    fn drop_batch(&mut self) {
        self.batch.flush(|_| ());
        self.stats.batches_dropped += 1;
        self.batch_started = Instant::now();
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn ring(&self) -> &AudioRing {
        &self.ring
    }

    pub fn batch(&self) -> &BatchAccumulator {
        &self.batch
    }

    /// Inertial reading used for the most recent sample.
    pub fn held_reading(&self) -> InertialReading {
        self.held_reading
    }
}

fn log_transport_event(event: &TransportEvent) {
    match event {
        TransportEvent::Connected => log::info!("Connected to consumer"),
        TransportEvent::Disconnected => {
            log::warn!("Lost connection to consumer, batches are dropped until it returns")
        }
        TransportEvent::Error(message) => log::warn!("Transport error: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::rate_limit::tests::MockClock;
    use crate::sensor::MockSensorBus;
    use crate::transport::MockTransport;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingReporter {
        errors: Mutex<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, station: &str, error: &StationError) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{}: {}", station, error));
        }
    }

    fn config(batch_size: usize) -> ProducerConfig {
        ProducerConfig {
            batch_size,
            ..ProducerConfig::default()
        }
    }

    /// Frame whose RMS level is exactly `level`.
    fn frame(level: i32) -> Vec<i32> {
        vec![level << 16; 16]
    }

    fn producer(
        bus: MockSensorBus,
        transport: MockTransport,
        batch_size: usize,
    ) -> Producer<MockSensorBus, MockTransport, MockClock> {
        Producer::with_clock(bus, transport, &config(batch_size), MockClock::new()).unwrap()
    }

    #[test]
    fn test_init_failure_prevents_construction() {
        let bus = MockSensorBus::new().with_init_failure();
        let result = Producer::new(bus, MockTransport::new(), &config(3));
        assert!(matches!(
            result,
            Err(KnockstreamError::SensorNotFound { .. })
        ));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let result = Producer::new(MockSensorBus::new(), MockTransport::new(), &config(0));
        assert!(matches!(
            result,
            Err(KnockstreamError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_new_initializes_bus() {
        let producer = Producer::new(MockSensorBus::new(), MockTransport::new(), &config(3)).unwrap();
        assert!(producer.bus().is_initialized());
    }

    #[test]
    fn test_empty_read_skips_without_mutation() {
        let transport = MockTransport::new().with_connected(true);
        let ticks = transport.ticks();
        let mut producer = producer(MockSensorBus::new(), transport, 3);

        assert_eq!(producer.step(), StepOutcome::Skipped);
        assert_eq!(producer.ring().writes(), 0);
        assert!(producer.batch().is_empty());
        assert_eq!(producer.stats().skipped, 1);
        assert_eq!(ticks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_read_error_is_recoverable() {
        let reporter = Arc::new(RecordingReporter::default());
        let bus = MockSensorBus::new().with_read_failure();
        let mut producer =
            producer(bus, MockTransport::new(), 3).with_reporter(reporter.clone());

        assert_eq!(producer.step(), StepOutcome::Skipped);
        assert_eq!(producer.step(), StepOutcome::Skipped);
        assert_eq!(reporter.errors.lock().unwrap().len(), 2);
        assert!(reporter.errors.lock().unwrap()[0].starts_with("sensor: Recoverable"));
    }

    #[test]
    fn test_full_batch_is_sent_as_one_frame() {
        let bus = MockSensorBus::new().with_frames(vec![frame(100), frame(200), frame(300)]);
        let transport = MockTransport::new().with_connected(true);
        let sent = transport.sent();
        let mut producer = producer(bus, transport, 3);

        assert_eq!(producer.step(), StepOutcome::Appended);
        assert_eq!(producer.step(), StepOutcome::Appended);
        assert_eq!(
            producer.step(),
            StepOutcome::Sent {
                records: 3,
                truncated: false
            }
        );

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            String::from_utf8(sent[0].clone()).unwrap(),
            "100,9.807\n200,9.807\n300,9.807\n"
        );
        assert!(producer.batch().is_empty());
        assert_eq!(producer.stats().batches_sent, 1);
        assert_eq!(producer.stats().records_sent, 3);
    }

    #[test]
    fn test_full_batch_while_disconnected_is_dropped_and_reset() {
        let bus = MockSensorBus::new().with_repeating_frame(frame(50));
        let transport = MockTransport::new();
        let sent = transport.sent();
        let flag = transport.connection_flag();
        let mut producer = producer(bus, transport, 2);

        assert_eq!(producer.step(), StepOutcome::Appended);
        assert_eq!(producer.step(), StepOutcome::Dropped);
        assert!(producer.batch().is_empty());

        // Accumulation continues and the next batch goes out once linked.
        flag.set(true);
        assert_eq!(producer.step(), StepOutcome::Appended);
        assert!(matches!(producer.step(), StepOutcome::Sent { records: 2, .. }));
        assert_eq!(sent.lock().unwrap().len(), 1);
        assert_eq!(producer.stats().batches_dropped, 1);
    }

    #[test]
    fn test_send_failure_drops_batch() {
        let reporter = Arc::new(RecordingReporter::default());
        let bus = MockSensorBus::new().with_repeating_frame(frame(50));
        let transport = MockTransport::new().with_connected(true).with_send_failure();
        let mut producer = producer(bus, transport, 1).with_reporter(reporter.clone());

        assert_eq!(producer.step(), StepOutcome::Dropped);
        assert!(producer.batch().is_empty());
        assert!(reporter.errors.lock().unwrap()[0].starts_with("transport:"));
        assert_eq!(producer.step(), StepOutcome::Dropped);
    }

    #[test]
    fn test_small_send_buffer_truncates_at_record_boundary() {
        let bus = MockSensorBus::new().with_repeating_frame(frame(1000));
        let transport = MockTransport::new().with_connected(true);
        let sent = transport.sent();
        let config = ProducerConfig {
            batch_size: 4,
            send_buffer_bytes: 24,
            ..ProducerConfig::default()
        };
        let mut producer =
            Producer::with_clock(bus, transport, &config, MockClock::new()).unwrap();

        for _ in 0..3 {
            producer.step();
        }
        assert_eq!(
            producer.step(),
            StepOutcome::Sent {
                records: 2,
                truncated: true
            }
        );
        let sent = sent.lock().unwrap();
        assert_eq!(
            String::from_utf8(sent[0].clone()).unwrap(),
            "1000,9.807\n1000,9.807\n"
        );
        assert_eq!(producer.stats().truncated_frames, 1);
    }

    #[test]
    fn test_inertial_reading_is_held_between_polls() {
        let clock = MockClock::new();
        let bus = MockSensorBus::new()
            .with_repeating_frame(frame(10))
            .with_readings(vec![
                InertialReading::new(0.0, 0.0, 9.0),
                InertialReading::new(3.0, 4.0, 0.0),
                InertialReading::new(0.0, 0.0, 2.0),
            ]);
        let mut producer = Producer::with_clock(
            bus,
            MockTransport::new(),
            &config(100),
            clock.clone(),
        )
        .unwrap();
        // The constructor consumed the first reading.
        assert_eq!(producer.held_reading().magnitude(), 9.0);

        producer.step();
        assert_eq!(producer.held_reading().magnitude(), 5.0);

        // Inside the 5 ms window: no poll, value held.
        clock.advance(Duration::from_millis(1));
        producer.step();
        assert_eq!(producer.held_reading().magnitude(), 5.0);
        assert_eq!(producer.bus().inertial_polls(), 2);

        clock.advance(Duration::from_millis(5));
        producer.step();
        assert_eq!(producer.held_reading().magnitude(), 2.0);
        assert_eq!(producer.bus().inertial_polls(), 3);
    }

    #[test]
    fn test_run_stops_when_flag_cleared() {
        let bus = MockSensorBus::new().with_repeating_frame(frame(10));
        let mut producer = producer(bus, MockTransport::new(), 10);
        let running = AtomicBool::new(false);
        let stats = producer.run(&running);
        assert_eq!(stats.iterations, 0);
    }

    #[test]
    fn test_connect_delegates_to_transport() {
        let mut producer = producer(MockSensorBus::new(), MockTransport::new(), 10);
        producer.connect("192.168.1.10:8765").unwrap();
        assert!(producer.transport().is_connected());
        assert_eq!(producer.transport().endpoint(), Some("192.168.1.10:8765"));
    }
}

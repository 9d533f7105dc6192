//! Polling rate cap for the inertial sensor.

use std::time::{Duration, Instant};

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Admits at most one event per `min_interval`.
///
/// The first call is always admitted. Every admitted call moves the
/// reference timestamp, so the cap holds for the life of the limiter.
pub struct RateLimiter<C: Clock = SystemClock> {
    min_interval: Duration,
    last: Option<Instant>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Limiter for `rate_hz` events per second on the system clock.
    pub fn per_second(rate_hz: u32) -> Self {
        Self::with_clock(rate_hz, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(rate_hz: u32, clock: C) -> Self {
        let min_interval = if rate_hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / rate_hz
        };
        Self {
            min_interval,
            last: None,
            clock,
        }
    }

    /// Returns true and records the time if an event is allowed now.
    pub fn try_acquire(&mut self) -> bool {
        let now = self.clock.now();
        match self.last {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

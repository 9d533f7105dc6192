//! Link from the producer to the consumer.
//!
//! The connection flag is the only state shared between the transport's
//! event side and the producer loop. Everything else flows through
//! `tick()`, which the loop calls once per iteration.

pub mod mock;
pub mod tcp;

pub use mock::MockTransport;
pub use tcp::TcpTransport;

use crate::error::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Link state notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Error(String),
}

/// Callback for transport events, run on the thread that calls `tick()`.
pub type EventHandler = Box<dyn FnMut(&TransportEvent) + Send>;

/// Shared connected/disconnected flag.
///
/// Losing or gaining one frame around a state change is acceptable, so a
/// single atomic with acquire/release ordering is all the synchronization
/// needed.
#[derive(Debug, Clone, Default)]
pub struct ConnectionFlag(Arc<AtomicBool>);

impl ConnectionFlag {
    pub fn new(connected: bool) -> Self {
        Self(Arc::new(AtomicBool::new(connected)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Store `connected`, returning the previous value.
    pub fn set(&self, connected: bool) -> bool {
        self.0.swap(connected, Ordering::AcqRel)
    }
}

/// Trait for frame transports.
///
/// This trait allows swapping implementations (TCP link vs mock).
pub trait Transport: Send {
    /// Start connecting to `endpoint`. Completion is reported through the
    /// event handler; the call itself does not wait for the link.
    fn connect(&mut self, endpoint: &str) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Send one frame as one message.
    fn send(&mut self, payload: &[u8]) -> Result<()>;

    /// Register the event handler, replacing any previous one.
    fn on_event(&mut self, handler: EventHandler);

    /// Drive pending connection work and event dispatch.
    fn tick(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        (**self).connect(endpoint)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        (**self).send(payload)
    }

    fn on_event(&mut self, handler: EventHandler) {
        (**self).on_event(handler)
    }

    fn tick(&mut self) {
        (**self).tick()
    }
}

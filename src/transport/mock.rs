use crate::error::{KnockstreamError, Result};
use crate::transport::{ConnectionFlag, EventHandler, Transport, TransportEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock transport for testing
///
/// Records every payload it is asked to send. The connection flag and the
/// payload log are shared handles, so tests can flip the link state and
/// inspect output after the transport has moved into a producer.
pub struct MockTransport {
    flag: ConnectionFlag,
    connect_succeeds: bool,
    fail_sends: bool,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    ticks: Arc<AtomicUsize>,
    endpoint: Option<String>,
    handler: Option<EventHandler>,
}

impl MockTransport {
    /// Disconnected transport whose `connect` succeeds immediately.
    pub fn new() -> Self {
        Self {
            flag: ConnectionFlag::new(false),
            connect_succeeds: true,
            fail_sends: false,
            sent: Arc::new(Mutex::new(Vec::new())),
            ticks: Arc::new(AtomicUsize::new(0)),
            endpoint: None,
            handler: None,
        }
    }

    /// Start in the given link state
    pub fn with_connected(self, connected: bool) -> Self {
        self.flag.set(connected);
        self
    }

    /// Make `connect` report an error event instead of connecting
    pub fn with_connect_failure(mut self) -> Self {
        self.connect_succeeds = false;
        self
    }

    /// Make every `send` fail
    pub fn with_send_failure(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn connection_flag(&self) -> ConnectionFlag {
        self.flag.clone()
    }

    /// Handle to the sent payloads
    pub fn sent(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.sent)
    }

    /// Handle to the tick counter
    pub fn ticks(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.ticks)
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn emit(&mut self, event: TransportEvent) {
        if let Some(handler) = self.handler.as_mut() {
            handler(&event);
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        self.endpoint = Some(endpoint.to_string());
        if self.connect_succeeds {
            self.flag.set(true);
            self.emit(TransportEvent::Connected);
        } else {
            self.emit(TransportEvent::Error(format!(
                "mock connect to {} refused",
                endpoint
            )));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.flag.get()
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        if self.fail_sends {
            return Err(KnockstreamError::TransportSend {
                message: "mock send failure".to_string(),
            });
        }
        if !self.flag.get() {
            return Err(KnockstreamError::TransportSend {
                message: "not connected".to_string(),
            });
        }
        self.sent
            .lock()
            .map_err(|_| KnockstreamError::Other("mock transport lock poisoned".to_string()))?
            .push(payload.to_vec());
        Ok(())
    }

    fn on_event(&mut self, handler: EventHandler) {
        self.handler = Some(handler);
    }

    fn tick(&mut self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_emits_connected() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        let mut transport = MockTransport::new();
        transport.on_event(Box::new(move |event| seen.lock().unwrap().push(event.clone())));

        transport.connect("10.0.0.1:8765").unwrap();

        assert!(transport.is_connected());
        assert_eq!(transport.endpoint(), Some("10.0.0.1:8765"));
        assert_eq!(*events.lock().unwrap(), vec![TransportEvent::Connected]);
    }

    #[test]
    fn test_connect_failure_reports_error() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        let mut transport = MockTransport::new().with_connect_failure();
        transport.on_event(Box::new(move |event| seen.lock().unwrap().push(event.clone())));

        transport.connect("host:1").unwrap();

        assert!(!transport.is_connected());
        assert!(matches!(events.lock().unwrap()[0], TransportEvent::Error(_)));
    }

    #[test]
    fn test_send_records_payloads_when_connected() {
        let mut transport = MockTransport::new().with_connected(true);
        let sent = transport.sent();
        transport.send(b"1,0.500\n").unwrap();
        assert_eq!(sent.lock().unwrap().as_slice(), &[b"1,0.500\n".to_vec()]);
    }

    #[test]
    fn test_send_while_disconnected_fails() {
        let mut transport = MockTransport::new();
        assert!(transport.send(b"x").is_err());
        assert!(transport.sent().lock().unwrap().is_empty());
    }

    #[test]
    fn test_flag_handle_controls_link_state() {
        let transport = MockTransport::new();
        let flag = transport.connection_flag();
        flag.set(true);
        assert!(transport.is_connected());
    }
}

//! TCP link with background connects and periodic reconnection.

use crate::config::TransportConfig;
use crate::defaults;
use crate::error::{KnockstreamError, Result};
use crate::transport::{ConnectionFlag, EventHandler, Transport, TransportEvent};
use crossbeam_channel::{Receiver, TryRecvError, bounded};
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

type ConnectResult = io::Result<TcpStream>;

/// Sends each frame as one write on a TCP stream.
///
/// Connecting happens on a short-lived background thread so the producer
/// loop never blocks on the network. The result comes back over a channel
/// and is picked up by `tick()`, which is also where lost links are retried
/// every `reconnect_interval`. Writes are bounded by `write_timeout`; a peer
/// that stops reading costs the link, not the producer loop.
pub struct TcpTransport {
    flag: ConnectionFlag,
    endpoint: Option<String>,
    stream: Option<TcpStream>,
    pending: Option<Receiver<ConnectResult>>,
    last_attempt: Option<Instant>,
    reconnect_interval: Duration,
    connect_timeout: Duration,
    write_timeout: Duration,
    handler: Option<EventHandler>,
}

impl TcpTransport {
    pub fn new(reconnect_interval: Duration, connect_timeout: Duration) -> Self {
        Self {
            flag: ConnectionFlag::new(false),
            endpoint: None,
            stream: None,
            pending: None,
            last_attempt: None,
            reconnect_interval,
            connect_timeout,
            write_timeout: Duration::from_millis(defaults::WRITE_TIMEOUT_MS),
            handler: None,
        }
    }

    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.reconnect_interval(), config.connect_timeout())
            .with_write_timeout(config.write_timeout())
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn connection_flag(&self) -> ConnectionFlag {
        self.flag.clone()
    }

    fn emit(&mut self, event: TransportEvent) {
        match &event {
            TransportEvent::Connected => log::debug!("Transport connected"),
            TransportEvent::Disconnected => log::debug!("Transport disconnected"),
            TransportEvent::Error(message) => log::debug!("Transport error: {}", message),
        }
        if let Some(handler) = self.handler.as_mut() {
            handler(&event);
        }
    }

    fn start_attempt(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        let timeout = self.connect_timeout;
        let (tx, rx) = bounded(1);
        self.last_attempt = Some(Instant::now());
        self.pending = Some(rx);

        std::thread::spawn(move || {
            tx.send(open_stream(&endpoint, timeout)).ok();
        });
    }

    fn poll_pending(&mut self) {
        let Some(rx) = self.pending.as_ref() else {
            return;
        };
        match rx.try_recv() {
            Ok(Ok(stream)) => {
                self.pending = None;
                if let Err(e) = stream.set_nodelay(true) {
                    log::debug!("Failed to set TCP_NODELAY: {}", e);
                }
                if let Err(e) = stream.set_write_timeout(Some(self.write_timeout)) {
                    self.emit(TransportEvent::Error(format!(
                        "failed to set write timeout: {}",
                        e
                    )));
                    return;
                }
                self.stream = Some(stream);
                self.flag.set(true);
                self.emit(TransportEvent::Connected);
            }
            Ok(Err(e)) => {
                self.pending = None;
                self.emit(TransportEvent::Error(e.to_string()));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
            }
        }
    }

    fn drop_link(&mut self) {
        self.stream = None;
        if self.flag.set(false) {
            self.emit(TransportEvent::Disconnected);
        }
    }
}

fn open_stream(endpoint: &str, timeout: Duration) -> ConnectResult {
    let mut last_error = None;
    for addr in endpoint.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no addresses for {}", endpoint),
        )
    }))
}

impl Transport for TcpTransport {
    fn connect(&mut self, endpoint: &str) -> Result<()> {
        if endpoint.trim().is_empty() {
            return Err(KnockstreamError::TransportConnect {
                message: "empty endpoint".to_string(),
            });
        }
        self.drop_link();
        self.endpoint = Some(endpoint.to_string());
        self.start_attempt();
        log::info!("Connecting to {}", endpoint);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.flag.get()
    }

    fn send(&mut self, payload: &[u8]) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(KnockstreamError::TransportSend {
                message: "not connected".to_string(),
            });
        };
        let result = stream.write_all(payload).and_then(|()| stream.flush());
        if let Err(e) = result {
            // A timed-out write may have sent part of the frame, so the link
            // cannot be reused.
            let message = match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                    format!("peer stopped reading for {:?}", self.write_timeout)
                }
                _ => e.to_string(),
            };
            self.drop_link();
            return Err(KnockstreamError::TransportSend { message });
        }
        Ok(())
    }

    fn on_event(&mut self, handler: EventHandler) {
        self.handler = Some(handler);
    }

    fn tick(&mut self) {
        self.poll_pending();

        if self.stream.is_some() || self.pending.is_some() {
            return;
        }
        let due = self
            .last_attempt
            .is_none_or(|last| last.elapsed() >= self.reconnect_interval);
        if due && self.endpoint.is_some() {
            log::debug!("Reconnecting");
            self.start_attempt();
        }
    }
}

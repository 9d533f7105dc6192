//! TCP receiver for the producer's line protocol.

use crate::consumer::classifier::Classifier;
use crate::consumer::sink::PredictionSink;
use crate::consumer::stream::StreamConsumer;
use crate::defaults;
use crate::error::{KnockstreamError, Result};
use std::future::Future;
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::TcpListener;

/// Accepts producer connections and feeds their lines into one consumer.
///
/// Clients are served one at a time. The stream window carries over
/// between connections, so a reconnecting producer continues the same
/// stream.
pub struct LineServer {
    listener: TcpListener,
}

impl LineServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener =
            TcpListener::bind(addr)
                .await
                .map_err(|e| KnockstreamError::TransportConnect {
                    message: format!("Failed to bind to {}: {}", addr, e),
                })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` completes.
    pub async fn run<C, F>(
        &self,
        consumer: &mut StreamConsumer<C>,
        sink: &mut dyn PredictionSink,
        shutdown: F,
    ) -> Result<()>
    where
        C: Classifier,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        log::info!("Listening on {}", self.local_addr()?);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        log::warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            log::info!("Producer connected from {}", peer);
            tokio::select! {
                result = serve_connection(stream, consumer, sink) => match result {
                    Ok(lines) => log::info!("Producer {} disconnected after {} lines", peer, lines),
                    Err(e @ KnockstreamError::Io(_)) => {
                        log::warn!("Connection from {} failed: {}", peer, e);
                    }
                    Err(e) => return Err(e),
                },
                _ = &mut shutdown => break,
            }
        }

        sink.finish()?;
        log::info!("Server stopped");
        Ok(())
    }
}

/// Feed every line from one connection into `consumer`. Returns the number
/// of lines read.
///
/// Only newline-terminated records are parsed: a fragment left at EOF by a
/// producer that went away mid-write is counted as malformed, as is any
/// line longer than `defaults::MAX_LINE_BYTES`.
pub async fn serve_connection<R, C>(
    stream: R,
    consumer: &mut StreamConsumer<C>,
    sink: &mut dyn PredictionSink,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    C: Classifier,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut lines = 0u64;
    let mut overlong = false;
    loop {
        buf.clear();
        let n = (&mut reader)
            .take(defaults::MAX_LINE_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(lines);
        }
        let terminated = buf.ends_with(b"\n");
        if overlong {
            overlong = !terminated;
            continue;
        }
        lines += 1;
        if !terminated {
            if n == defaults::MAX_LINE_BYTES {
                overlong = true;
                consumer.reject_line("line too long");
            } else {
                consumer.reject_line("unterminated record at end of connection");
            }
            continue;
        }
        let line = String::from_utf8_lossy(&buf);
        consumer.process_line(&line, sink)?;
    }
}

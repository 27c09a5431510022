///! Transport abstraction over the line-oriented TCP cluster feed.
///!
///! The state machine talks to a trait so tests can script connects,
///! reads and failures without real sockets.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::endpoints::Endpoint;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect did not complete within the timeout.
    #[error("connect to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },
    /// DNS resolution failures and refused connections surface here.
    #[error("connect to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not connected")]
    NotConnected,
}

/// Outcome of one bounded read poll.
#[derive(Debug)]
pub enum ReadOutcome {
    /// Raw bytes arrived, decoded lossily to text (may hold partial lines).
    Data(String),
    /// Nothing arrived within the wait window; the connection is still up.
    Idle,
    /// The peer closed the connection (empty read).
    Closed,
}

#[async_trait]
pub trait ClusterTransport: Send {
    async fn connect(
        &mut self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<(), TransportError>;

    /// Poll for data, waiting at most `wait`. Bounded so the caller's loop
    /// can interleave keepalive, budget and stop checks.
    async fn read_chunk(&mut self, wait: Duration) -> Result<ReadOutcome, TransportError>;

    /// Send one line, CRLF-terminated.
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError>;

    fn disconnect(&mut self);
}

/// The real TCP transport.
pub struct TcpTransport {
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterTransport for TcpTransport {
    async fn connect(
        &mut self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        self.disconnect();
        let addr = (endpoint.host.as_str(), endpoint.port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                endpoint: endpoint.to_string(),
                timeout,
            })?
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn read_chunk(&mut self, wait: Duration) -> Result<ReadOutcome, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut buf = [0u8; 4096];
        match tokio::time::timeout(wait, stream.read(&mut buf)).await {
            Err(_elapsed) => Ok(ReadOutcome::Idle),
            Ok(Ok(0)) => Ok(ReadOutcome::Closed),
            Ok(Ok(n)) => Ok(ReadOutcome::Data(
                String::from_utf8_lossy(&buf[..n]).into_owned(),
            )),
            Ok(Err(e)) => Err(TransportError::Io(e)),
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(format!("{line}\r\n").as_bytes()).await?;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.stream = None;
    }
}

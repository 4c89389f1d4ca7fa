use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::error::{LossyrpcError, Result};
use crate::transport::faults::FaultConfig;

/// Maximum frame size (16 MiB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Timeout for establishing a connection (5 seconds)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a [`UnreliableTransport::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame was written to the socket
    Delivered,
    /// The frame was discarded by simulated packet loss
    Dropped,
}

/// Result of a [`UnreliableTransport::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// One complete frame
    Frame(Vec<u8>),
    /// The peer closed the connection before a frame started
    Closed,
    /// No frame arrived within the configured timeout
    TimedOut,
}

/// One TCP connection with simulated packet loss, delay and read timeouts.
///
/// The transport carries no retransmission, reassembly or reconnection
/// logic: a dropped frame is simply reported as [`SendOutcome::Dropped`] and
/// resilience is left to the caller.
///
/// # Wire Protocol
///
/// Frames are sent with a 4-byte length prefix (big-endian u32) followed
/// by the payload:
///
/// ```text
/// [4-byte length] [JSON data]
/// ```
pub struct UnreliableTransport {
    stream: Option<TcpStream>,
    faults: FaultConfig,
}

impl UnreliableTransport {
    /// Wraps an already connected stream.
    pub fn new(stream: TcpStream, faults: FaultConfig) -> Self {
        Self {
            stream: Some(stream),
            faults,
        }
    }

    /// Connects to a remote endpoint.
    ///
    /// This method resolves the address (which may resolve to multiple addresses)
    /// and attempts to connect to each until one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the address cannot be resolved or every
    /// connection attempt fails.
    pub async fn connect(addr: &str, faults: FaultConfig) -> Result<Self> {
        let socket_addrs = addr
            .to_socket_addrs()
            .map_err(|e| LossyrpcError::Transport(format!("Invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(socket_addr)).await {
                Ok(Ok(stream)) => {
                    let _ = stream.set_nodelay(true);
                    return Ok(Self::new(stream, faults));
                }
                Ok(Err(e)) => last_err = Some(e.to_string()),
                Err(_) => last_err = Some("connect timed out".to_string()),
            }
        }

        Err(LossyrpcError::Transport(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err.unwrap_or_else(|| "no addresses resolved".to_string())
        )))
    }

    pub fn faults(&self) -> &FaultConfig {
        &self.faults
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.as_ref().and_then(|s| s.peer_addr().ok())
    }

    /// Sends one frame, subject to simulated loss and delay.
    ///
    /// An empty payload is trivially delivered without touching the socket.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the transport has no stream or the write fails.
    /// A simulated drop is not an error.
    pub async fn send(&mut self, payload: &[u8]) -> Result<SendOutcome> {
        if payload.is_empty() {
            return Ok(SendOutcome::Delivered);
        }

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| LossyrpcError::Transport("send failed: nil socket".to_string()))?;

        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(LossyrpcError::Protocol(format!(
                "Message too large: {} bytes (max {} bytes)",
                payload.len(),
                MAX_MESSAGE_SIZE
            )));
        }

        if self.faults.lossy && rand::random::<f64>() < self.faults.loss_rate {
            tracing::debug!("Simulated packet loss, sleeping {:?}", self.faults.timeout);
            tokio::time::sleep(self.faults.timeout).await;
            return Ok(SendOutcome::Dropped);
        }

        if self.faults.delayed {
            tokio::time::sleep(self.faults.delay).await;
        }

        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(payload);

        stream
            .write_all(&frame)
            .await
            .map_err(|e| Self::map_io_error(e, "writing frame"))?;
        stream
            .flush()
            .await
            .map_err(|e| Self::map_io_error(e, "flushing stream"))?;

        Ok(SendOutcome::Delivered)
    }

    /// Receives one frame, waiting at most the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the transport has no stream or the read fails,
    /// and `Protocol` if the announced frame exceeds [`MAX_MESSAGE_SIZE`].
    pub async fn receive(&mut self) -> Result<Received> {
        let timeout = self.faults.timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| LossyrpcError::Transport("receive failed: nil socket".to_string()))?;

        match tokio::time::timeout(timeout, Self::read_frame(stream)).await {
            Ok(result) => result,
            Err(_) => Ok(Received::TimedOut),
        }
    }

    async fn read_frame(stream: &mut TcpStream) -> Result<Received> {
        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(Received::Closed),
            Err(e) => return Err(Self::map_io_error(e, "reading length prefix")),
        }

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_SIZE {
            return Err(LossyrpcError::Protocol(format!(
                "Message too large: {} bytes (max {} bytes)",
                len, MAX_MESSAGE_SIZE
            )));
        }

        let mut buf = vec![0u8; len];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| Self::map_io_error(e, "reading frame"))?;

        Ok(Received::Frame(buf))
    }

    /// Shuts the connection down. Later sends and receives fail with "nil socket".
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn map_io_error(err: std::io::Error, context: &str) -> LossyrpcError {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::UnexpectedEof => {
                LossyrpcError::Transport(format!("{}: Connection lost", context))
            }
            _ => LossyrpcError::Transport(format!("{}: {}", context, err)),
        }
    }
}

impl std::fmt::Debug for UnreliableTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnreliableTransport")
            .field("peer", &self.peer_addr())
            .field("faults", &self.faults)
            .finish()
    }
}

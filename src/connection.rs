//! TCP connection to a single cluster node.
//!
//! Dials, sends commands as arrays of bulk strings, and reads back parsed
//! frames. Every connect and round-trip is bounded by the timeout the
//! client was configured with; the dispatch loop itself carries no clock,
//! only a redirection budget.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ClusterError, Result};
use crate::frame::{self, Frame};

/// A buffered connection to one node.
#[derive(Debug)]
pub struct NodeConnection {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    io_timeout: std::time::Duration,
}

impl NodeConnection {
    /// Connects to `host:port`, failing after `io_timeout`.
    pub async fn connect(host: &str, port: u16, io_timeout: std::time::Duration) -> Result<Self> {
        let stream = timeout(io_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| ClusterError::Timeout)??;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
            write_buf: BytesMut::with_capacity(4096),
            io_timeout,
        })
    }

    /// Sends a command and reads one reply frame, bounded by the
    /// configured timeout. Error replies come back as `Frame::Error`,
    /// not as `Err`; only transport-level failures error out.
    pub async fn request(&mut self, args: &[Bytes]) -> Result<Frame> {
        timeout(self.io_timeout, self.round_trip(args))
            .await
            .map_err(|_| ClusterError::Timeout)?
    }

    /// Liveness probe: `PING`, expecting the fixed `PONG` token.
    pub async fn ping(&mut self) -> Result<bool> {
        let reply = self.request(&[Bytes::from_static(b"PING")]).await?;
        Ok(matches!(reply, Frame::Simple(ref s) if s == "PONG"))
    }

    /// Gracefully shuts the stream down. Callers treat failure as
    /// best-effort cleanup.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }

    async fn round_trip(&mut self, args: &[Bytes]) -> Result<Frame> {
        self.write_buf.clear();
        frame::encode_command(args, &mut self.write_buf);
        self.stream.write_all(&self.write_buf).await?;
        self.stream.flush().await?;
        self.read_frame().await
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if !self.read_buf.is_empty() {
                if let Some((frame, consumed)) = frame::parse(&self.read_buf)? {
                    let _ = self.read_buf.split_to(consumed);
                    return Ok(frame);
                }
            }
            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(ClusterError::Disconnected);
            }
        }
    }
}

//! Framed transport for bridge messages
//!
//! The bridge protocol is transport-agnostic: any bidirectional byte stream
//! carries it. Messages are bincode-encoded and wrapped in 4-byte
//! length-prefixed frames (`tokio_util::codec::LengthDelimitedCodec`).
//!
//! # Architecture
//!
//! ```text
//! Request / Response
//!     ↓ bincode
//! length-delimited frame
//!     ↓
//! tokio AsyncRead + AsyncWrite (TCP, in-memory duplex, ...)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use hdfs_bridge::protocol::transport::{framed, recv_message, send_message, FrameLimits};
//!
//! let mut transport = framed(tcp_stream, FrameLimits::client());
//! send_message(&mut transport, &request).await?;
//! let response: Option<Response> = recv_message(&mut transport).await?;
//! ```

use crate::error::RpcError;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// Largest frame either side ever sends (64 MiB)
///
/// Bounds `read` responses (see `MAX_READ_SIZE` in the service) as well as
/// large listings.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// Default limit on a request frame accepted by the server (8 MiB)
///
/// The decoder reserves the declared length as soon as it has seen a frame
/// header, so this is what one idle connection can make the server hold.
pub const DEFAULT_MAX_REQUEST_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Per-direction frame limits of one end of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Largest frame accepted from the peer
    pub inbound: usize,
    /// Largest frame sent to the peer
    pub outbound: usize,
}

impl FrameLimits {
    /// Server side: requests up to `max_request` bytes, responses up to
    /// [`MAX_FRAME_LENGTH`]
    #[must_use]
    pub const fn server(max_request: usize) -> Self {
        Self {
            inbound: max_request,
            outbound: MAX_FRAME_LENGTH,
        }
    }

    /// Client side; the server enforces its own, possibly smaller, request limit
    #[must_use]
    pub const fn client() -> Self {
        Self {
            inbound: MAX_FRAME_LENGTH,
            outbound: MAX_FRAME_LENGTH,
        }
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self::server(DEFAULT_MAX_REQUEST_FRAME_LENGTH)
    }
}

/// Generic transport for bridge messages
///
/// A transport is a bidirectional byte stream. This is a marker trait over
/// tokio's `AsyncRead + AsyncWrite`.
///
/// # Implementations
///
/// - `TcpStream` - For the network server and client
/// - `DuplexStream` - For in-process testing
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {
    /// Get transport name for debugging
    fn name(&self) -> &'static str {
        "unknown"
    }
}

impl Transport for TcpStream {
    fn name(&self) -> &'static str {
        "tcp"
    }
}

impl Transport for tokio::io::DuplexStream {
    fn name(&self) -> &'static str {
        "duplex"
    }
}

/// A transport split into a frame decoder and a frame encoder
///
/// Each direction has its own codec so inbound and outbound frames can be
/// bounded differently.
pub struct FramedTransport<T> {
    reader: FramedRead<ReadHalf<T>, LengthDelimitedCodec>,
    writer: FramedWrite<WriteHalf<T>, LengthDelimitedCodec>,
}

/// Wrap `transport` in the frame codec
#[must_use]
pub fn framed<T: Transport>(transport: T, limits: FrameLimits) -> FramedTransport<T> {
    let (read_half, write_half) = tokio::io::split(transport);
    FramedTransport {
        reader: FramedRead::new(read_half, codec(limits.inbound)),
        writer: FramedWrite::new(write_half, codec(limits.outbound)),
    }
}

fn codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// Encode `message` and send it as one frame
///
/// # Errors
///
/// Returns an error if encoding fails, the frame exceeds the outbound limit,
/// or the transport write fails.
pub async fn send_message<T, M>(transport: &mut FramedTransport<T>, message: &M) -> Result<(), RpcError>
where
    T: Transport,
    M: Serialize,
{
    let encoded = bincode::serialize(message)?;
    transport.writer.send(Bytes::from(encoded)).await?;
    Ok(())
}

/// Receive one frame and decode it
///
/// Returns `Ok(None)` when the peer closed the stream between frames.
///
/// # Errors
///
/// Returns an error if the transport read fails, a frame header announces more
/// than the inbound limit, the stream ends inside a frame, or the frame does
/// not decode as `M`.
pub async fn recv_message<T, M>(transport: &mut FramedTransport<T>) -> Result<Option<M>, RpcError>
where
    T: Transport,
    M: DeserializeOwned,
{
    match transport.reader.next().await {
        Some(frame) => Ok(Some(bincode::deserialize(&frame?)?)),
        None => Ok(None),
    }
}

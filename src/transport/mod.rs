//! Transport layer abstraction for botwire sessions.
//!
//! A transport produces one fresh bidirectional byte stream per connection
//! attempt. The session owns everything above the byte level: framing,
//! the key agreement and request correlation all run over whatever stream
//! the transport hands back.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             NetworkSession              │
//! │          (Transport-Agnostic)           │
//! └──────────────────┬──────────────────────┘
//!                    │ connect()
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │  TcpTransport   │ │ custom / tests  │
//! │ (tokio TcpStream)│ │ (duplex pipes)  │
//! └─────────────────┘ └─────────────────┘
//! ```

mod tcp;

pub use tcp::TcpTransport;

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Bidirectional byte stream a session runs over.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Owned, type-erased byte stream.
pub type BoxedStream = Box<dyn ByteStream>;

/// Transport trait for pluggable network backends.
///
/// `connect` is called once per login or reconnect attempt; every call must
/// yield a new, independent stream.
pub trait Transport: Send + Sync {
    /// Open a new connection to the server.
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<BoxedStream>> + Send + '_>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;

    /// Get the remote address as a string.
    fn remote_addr(&self) -> String;
}

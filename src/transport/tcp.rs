//! TCP transport implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;

use super::{BoxedStream, Transport};
use crate::config::NetworkConfig;
use crate::error::{BotError, Result};

/// Plain TCP transport with a connect timeout.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    /// Server address (host:port)
    remote_addr: String,
    /// Connect timeout
    connect_timeout: Duration,
}

impl TcpTransport {
    /// Create a new TCP transport.
    pub fn new(remote_addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            remote_addr: remote_addr.into(),
            connect_timeout,
        }
    }

    /// Create from network configuration.
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(config.server_addr.clone(), config.connect_timeout())
    }
}

impl Transport for TcpTransport {
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<BoxedStream>> + Send + '_>> {
        Box::pin(async move {
            tracing::debug!(addr = %self.remote_addr, "Opening TCP connection");

            let stream = tokio::time::timeout(
                self.connect_timeout,
                TcpStream::connect(self.remote_addr.as_str()),
            )
            .await
            .map_err(|_| {
                BotError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!(
                        "connect to {} timed out after {:?}",
                        self.remote_addr, self.connect_timeout
                    ),
                ))
            })??;

            stream.set_nodelay(true)?;
            Ok(Box::new(stream) as BoxedStream)
        })
    }

    fn name(&self) -> &'static str {
        "TCP"
    }

    fn remote_addr(&self) -> String {
        self.remote_addr.clone()
    }
}

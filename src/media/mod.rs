//! Media transfer boundary.
//!
//! Image bytes never travel over the session connection. The session asks
//! the server for an upload ticket or a download URL, and the bytes move
//! over HTTP through a [`MediaClient`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;

use crate::config::MediaConfig;
use crate::error::{BotError, Result};

/// Stream of downloaded chunks.
pub type MediaStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// HTTP side of image upload and download.
pub trait MediaClient: Send + Sync {
    /// Upload `data` to `destination` (absolute URL or a path on the media service).
    fn upload(
        &self,
        destination: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stream the resource at `url`.
    fn download(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<MediaStream>> + Send + '_>>;
}

/// [`MediaClient`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpMediaClient {
    client: Client,
    base_url: String,
}

impl HttpMediaClient {
    /// Create a client for the configured media service.
    pub fn new(config: &MediaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("botwire/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BotError::Media(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for `target`.
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("{}/{}", self.base_url, target.trim_start_matches('/'))
        }
    }
}

impl MediaClient for HttpMediaClient {
    fn upload(
        &self,
        destination: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let url = self.resolve(destination);
        Box::pin(async move {
            tracing::debug!(url = %url, size = data.len(), "Uploading media");
            self.client
                .put(&url)
                .body(data)
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
    }

    fn download(&self, url: &str) -> Pin<Box<dyn Future<Output = Result<MediaStream>> + Send + '_>> {
        let url = self.resolve(url);
        Box::pin(async move {
            tracing::debug!(url = %url, "Downloading media");
            let response = self.client.get(&url).send().await?.error_for_status()?;
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(BotError::from));
            Ok(Box::pin(stream) as MediaStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_resolve() {
        let client = HttpMediaClient::new(&MediaConfig {
            base_url: "http://media.local/".into(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(client.resolve("/img/1"), "http://media.local/img/1");
        assert_eq!(client.resolve("img/1"), "http://media.local/img/1");
        assert_eq!(client.resolve("https://cdn/x"), "https://cdn/x");
    }

    #[tokio::test]
    async fn test_download_streams_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello")
                .await
                .unwrap();
        });

        let client = HttpMediaClient::new(&MediaConfig {
            base_url: format!("http://{}", addr),
            timeout_secs: 5,
        })
        .unwrap();

        let mut stream = client.download("image/1").await.unwrap();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(body, b"hello");
    }
}

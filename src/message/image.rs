//! Images: server-side references and local upload sources.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::crypto::digest;

/// Image already stored on the server, referenced by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
    id: String,
}

impl Image {
    /// Wrap a server image id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Server image id, e.g. `{0123...}.png`.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Image file format, sniffed from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG
    Png,
    /// JPEG
    Jpeg,
    /// GIF
    Gif,
    /// Anything else
    Unknown,
}

impl ImageFormat {
    /// Detect the format from file contents.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0x89, b'P', b'N', b'G', ..] => Self::Png,
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [b'G', b'I', b'F', b'8', ..] => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Unknown => "bin",
        }
    }
}

/// Local image bytes waiting to be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalImage {
    data: Bytes,
    format: ImageFormat,
    digest: [u8; 32],
}

impl ExternalImage {
    /// Wrap raw file contents.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            format: ImageFormat::sniff(&data),
            digest: digest(&data),
            data,
        }
    }

    /// File contents.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sniffed format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// SHA-256 of the contents, used by the server to deduplicate uploads.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }
}

impl std::fmt::Debug for ExternalImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalImage")
            .field("format", &self.format)
            .field("len", &self.data.len())
            .finish()
    }
}

//! Frame encoding and decoding.
//!
//! # Wire Format
//!
//! ```text
//! [frame_len: u32 BE]   bytes following this field
//! [magic: 2]            b"BW"
//! [version: 1]          0x01
//! [flags: 1]            bit0 ENCRYPTED, bit1 COMPRESSED
//! [sequence: u32 BE]
//! body:
//!   ENCRYPTED: <nonce:12><ciphertext><tag:16>   AAD = the 8 header bytes
//!   plain:     <crc32: u32 LE><payload>
//! ```
//!
//! The payload is zlib-compressed before encryption when the `COMPRESSED`
//! flag is set. Plain frames only appear during the key agreement; every
//! later frame is encrypted with the connection's session key.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::compress;
use super::crypto::{FrameCipher, SessionKey};
use crate::error::{BotError, Result};

/// Frame magic bytes
pub const MAGIC: [u8; 2] = *b"BW";

/// Frame format version
pub const FRAME_VERSION: u8 = 1;

/// Size of the length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the fixed header after the length prefix
pub const HEADER_SIZE: usize = 8;

/// Size of the CRC32 carried by plain frames
pub const CHECKSUM_SIZE: usize = 4;

/// Largest frame accepted from the wire (16 MiB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Minimum payload size to attempt compression (bytes)
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 256;

/// Frame flag bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Body is AEAD encrypted
    pub const ENCRYPTED: u8 = 1 << 0;
    /// Payload is zlib compressed
    pub const COMPRESSED: u8 = 1 << 1;

    /// Create new empty flags
    pub fn new() -> Self {
        Self(0)
    }

    /// Create from raw bits
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Set a flag
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Check if flag is set
    pub fn has(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Check the encrypted flag
    pub fn is_encrypted(&self) -> bool {
        self.has(Self::ENCRYPTED)
    }

    /// Check the compressed flag
    pub fn is_compressed(&self) -> bool {
        self.has(Self::COMPRESSED)
    }
}

/// Reasons a frame could not be decoded.
///
/// None of these close the connection on their own; the session drops the
/// frame unless a handshake is in progress.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the fixed layout requires.
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// Length prefix disagrees with the bytes carried.
    #[error("length mismatch: prefix declares {declared} bytes, frame carries {actual}")]
    LengthMismatch {
        /// Length declared by the prefix.
        declared: usize,
        /// Length actually present.
        actual: usize,
    },

    /// Bad magic, unsupported version or checksum mismatch.
    #[error("corrupt frame: {0}")]
    Corrupt(String),

    /// Wrong key, missing key or tampered ciphertext.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Compressed payload could not be inflated.
    #[error("decompression failed: {0}")]
    Decompression(String),
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Sequence id from the header
    pub sequence: u32,
    /// Flags from the header
    pub flags: FrameFlags,
    /// Plain payload (decrypted and decompressed)
    pub payload: Vec<u8>,
}

/// Session-key-parameterized frame codec
#[derive(Debug, Clone)]
pub struct FrameCodec {
    compression_threshold: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_THRESHOLD)
    }
}

impl FrameCodec {
    /// Create a codec compressing payloads of at least `compression_threshold` bytes
    pub fn new(compression_threshold: usize) -> Self {
        Self {
            compression_threshold,
        }
    }

    /// Compression threshold in bytes
    pub fn compression_threshold(&self) -> usize {
        self.compression_threshold
    }

    /// Encode a payload into a complete length-prefixed frame.
    ///
    /// With `key = None` the frame is plain and CRC-protected.
    pub fn encode(
        &self,
        sequence: u32,
        payload: &[u8],
        key: Option<&SessionKey>,
    ) -> Result<Vec<u8>> {
        let mut flags = FrameFlags::new();

        let mut body_payload = None;
        if payload.len() >= self.compression_threshold {
            let packed = compress::compress(payload)?;
            if packed.len() < payload.len() {
                flags.set(FrameFlags::COMPRESSED);
                body_payload = Some(packed);
            }
        }
        let body_payload = body_payload.as_deref().unwrap_or(payload);

        if key.is_some() {
            flags.set(FrameFlags::ENCRYPTED);
        }
        let header = header_bytes(flags, sequence);

        let body = match key {
            Some(key) => FrameCipher::new(key)
                .seal(body_payload, &header)
                .map_err(|e| BotError::Crypto(e.into()))?,
            None => {
                let mut body = Vec::with_capacity(CHECKSUM_SIZE + body_payload.len());
                body.extend_from_slice(&crc32fast::hash(body_payload).to_le_bytes());
                body.extend_from_slice(body_payload);
                body
            },
        };

        let frame_len = HEADER_SIZE + body.len();
        if frame_len > MAX_FRAME_LEN {
            return Err(BotError::Protocol(format!(
                "frame of {} bytes exceeds limit of {}",
                frame_len, MAX_FRAME_LEN
            )));
        }

        let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + frame_len);
        buf.extend_from_slice(&(frame_len as u32).to_be_bytes());
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Decode a complete length-prefixed frame.
    ///
    /// With a `key`, only encrypted frames are accepted.
    pub fn decode(
        &self,
        bytes: &[u8],
        key: Option<&SessionKey>,
    ) -> std::result::Result<DecodedFrame, DecodeError> {
        let min_len = LENGTH_PREFIX_SIZE + HEADER_SIZE;
        if bytes.len() < min_len {
            return Err(DecodeError::Truncated {
                needed: min_len,
                available: bytes.len(),
            });
        }

        let (prefix, rest) = bytes.split_at(LENGTH_PREFIX_SIZE);
        let declared = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if declared != rest.len() {
            return Err(DecodeError::LengthMismatch {
                declared,
                actual: rest.len(),
            });
        }

        let (header, body) = rest.split_at(HEADER_SIZE);
        if header[0..2] != MAGIC {
            return Err(DecodeError::Corrupt(format!(
                "bad magic {:02x}{:02x}",
                header[0], header[1]
            )));
        }
        if header[2] != FRAME_VERSION {
            return Err(DecodeError::Corrupt(format!(
                "unsupported version {}",
                header[2]
            )));
        }
        let flags = FrameFlags::from_bits(header[3]);
        let sequence = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

        if key.is_some() && !flags.is_encrypted() {
            return Err(DecodeError::Decryption(
                "plaintext frame on an encrypted session".to_string(),
            ));
        }

        let carried = if flags.is_encrypted() {
            let key = key.ok_or_else(|| {
                DecodeError::Decryption("encrypted frame but no session key".to_string())
            })?;
            FrameCipher::new(key)
                .open(body, header)
                .map_err(|e| DecodeError::Decryption(e.to_string()))?
        } else {
            if body.len() < CHECKSUM_SIZE {
                return Err(DecodeError::Truncated {
                    needed: min_len + CHECKSUM_SIZE,
                    available: bytes.len(),
                });
            }
            let (checksum, data) = body.split_at(CHECKSUM_SIZE);
            let expected = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);
            if crc32fast::hash(data) != expected {
                return Err(DecodeError::Corrupt("checksum mismatch".to_string()));
            }
            data.to_vec()
        };

        let payload = if flags.is_compressed() {
            compress::decompress(&carried).map_err(|e| DecodeError::Decompression(e.to_string()))?
        } else {
            carried
        };

        Ok(DecodedFrame {
            sequence,
            flags,
            payload,
        })
    }
}

fn header_bytes(flags: FrameFlags, sequence: u32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[0..2].copy_from_slice(&MAGIC);
    header[2] = FRAME_VERSION;
    header[3] = flags.bits();
    header[4..8].copy_from_slice(&sequence.to_be_bytes());
    header
}

/// Encode with the default codec.
pub fn encode_frame(sequence: u32, payload: &[u8], key: Option<&SessionKey>) -> Result<Vec<u8>> {
    FrameCodec::default().encode(sequence, payload, key)
}

/// Decode with the default codec, returning `(sequence, payload)`.
pub fn decode_frame(
    bytes: &[u8],
    key: Option<&SessionKey>,
) -> std::result::Result<(u32, Vec<u8>), DecodeError> {
    FrameCodec::default()
        .decode(bytes, key)
        .map(|frame| (frame.sequence, frame.payload))
}

/// Read one length-prefixed frame from a byte stream.
///
/// Returns `Ok(None)` on a clean EOF before the length prefix.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {},
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame length {} exceeds limit of {}", len, MAX_FRAME_LEN),
        ));
    }

    let mut frame = vec![0u8; LENGTH_PREFIX_SIZE + len];
    frame[..LENGTH_PREFIX_SIZE].copy_from_slice(&prefix);
    reader.read_exact(&mut frame[LENGTH_PREFIX_SIZE..]).await?;
    Ok(Some(frame))
}

/// Write one encoded frame and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(frame).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::from_bytes([9u8; 32])
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let frame = encode_frame(7, b"{\"type\":\"heartbeat\"}", Some(&key())).unwrap();
        let (seq, payload) = decode_frame(&frame, Some(&key())).unwrap();
        assert_eq!(seq, 7);
        assert_eq!(payload, b"{\"type\":\"heartbeat\"}");
    }

    #[test]
    fn test_plain_frame_layout() {
        let frame = encode_frame(1, b"hi", None).unwrap();
        assert_eq!(&frame[0..4], &((HEADER_SIZE + CHECKSUM_SIZE + 2) as u32).to_be_bytes());
        assert_eq!(&frame[4..6], b"BW");
        assert_eq!(frame[6], FRAME_VERSION);
        assert_eq!(frame[7], 0);
        assert_eq!(&frame[8..12], &1u32.to_be_bytes());
        assert_eq!(&frame[16..], b"hi");
    }

    #[test]
    fn test_compression_applied_by_threshold() {
        let codec = FrameCodec::new(64);
        let big = b"member ".repeat(64);

        let frame = codec.encode(3, &big, Some(&key())).unwrap();
        let decoded = codec.decode(&frame, Some(&key())).unwrap();
        assert!(decoded.flags.is_compressed());
        assert!(decoded.flags.is_encrypted());
        assert_eq!(decoded.payload, big);

        let small = codec.encode(4, b"tiny", Some(&key())).unwrap();
        let decoded = codec.decode(&small, Some(&key())).unwrap();
        assert!(!decoded.flags.is_compressed());
    }

    #[test]
    fn test_truncated() {
        let err = decode_frame(&[0, 0, 0], None).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));
    }

    #[test]
    fn test_length_mismatch() {
        let mut frame = encode_frame(1, b"payload", None).unwrap();
        frame.pop();
        let err = decode_frame(&frame, None).unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { .. }));
    }

    #[test]
    fn test_wrong_key_is_decryption_error() {
        let frame = encode_frame(1, b"secret", Some(&key())).unwrap();
        let other = SessionKey::from_bytes([1u8; 32]);
        let err = decode_frame(&frame, Some(&other)).unwrap_err();
        assert!(matches!(err, DecodeError::Decryption(_)));

        let err = decode_frame(&frame, None).unwrap_err();
        assert!(matches!(err, DecodeError::Decryption(_)));
    }

    #[test]
    fn test_plaintext_rejected_once_keyed() {
        let frame = encode_frame(3, b"{\"type\":\"push\"}", None).unwrap();
        let err = decode_frame(&frame, Some(&key())).unwrap_err();
        assert!(matches!(err, DecodeError::Decryption(_)));

        assert!(decode_frame(&frame, None).is_ok());
    }

    #[test]
    fn test_tampered_header_fails_authentication() {
        let mut frame = encode_frame(1, b"secret", Some(&key())).unwrap();
        frame[11] ^= 0x01; // sequence byte is associated data
        let err = decode_frame(&frame, Some(&key())).unwrap_err();
        assert!(matches!(err, DecodeError::Decryption(_)));
    }

    #[test]
    fn test_plain_checksum_mismatch() {
        let mut frame = encode_frame(1, b"hello", None).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        let err = decode_frame(&frame, None).unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }

    #[test]
    fn test_bad_compressed_payload() {
        // Hand-build a plain frame claiming compression over non-zlib bytes.
        let data = b"not zlib at all";
        let header = header_bytes(FrameFlags::from_bits(FrameFlags::COMPRESSED), 5);
        let mut frame = Vec::new();
        frame.extend_from_slice(&((HEADER_SIZE + CHECKSUM_SIZE + data.len()) as u32).to_be_bytes());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
        frame.extend_from_slice(data);

        let err = decode_frame(&frame, None).unwrap_err();
        assert!(matches!(err, DecodeError::Decompression(_)));
    }

    #[tokio::test]
    async fn test_stream_read_write() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let first = encode_frame(1, b"one", Some(&key())).unwrap();
        let second = encode_frame(2, b"two", Some(&key())).unwrap();

        write_frame(&mut client, &first).await.unwrap();
        write_frame(&mut client, &second).await.unwrap();
        drop(client);

        assert_eq!(read_frame(&mut server).await.unwrap().unwrap(), first);
        assert_eq!(read_frame(&mut server).await.unwrap().unwrap(), second);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }
}

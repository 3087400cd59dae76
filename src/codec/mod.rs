//! Packet codec for botwire connections.
//!
//! Turns request/response/push bodies into length-prefixed, checksummed or
//! encrypted frames and back. One codec instance is shared by a session; the
//! session key is passed per call because it changes on every reconnect.
//!
//! # Layers
//!
//! | Layer       | Crate              | Applied when                          |
//! |-------------|--------------------|---------------------------------------|
//! | Compression | `flate2` (zlib)    | payload >= threshold and it shrinks   |
//! | Encryption  | `chacha20poly1305` | a session key is established          |
//! | Checksum    | `crc32fast`        | plaintext handshake frames only       |
//!
//! # Usage
//!
//! ```rust,ignore
//! use botwire::codec::{FrameCodec, decode_frame};
//!
//! let codec = FrameCodec::new(256);
//! let frame = codec.encode(seq, &body, Some(&session_key))?;
//! let (seq, body) = decode_frame(&frame, Some(&session_key))?;
//! ```

mod compress;
pub mod crypto;
mod frame;

pub use compress::{compress, decompress, MAX_DECOMPRESSED_LEN};
pub use frame::{
    decode_frame, encode_frame, read_frame, write_frame, DecodeError, DecodedFrame, FrameCodec,
    FrameFlags, CHECKSUM_SIZE, DEFAULT_COMPRESSION_THRESHOLD, FRAME_VERSION, HEADER_SIZE,
    LENGTH_PREFIX_SIZE, MAGIC, MAX_FRAME_LEN,
};

//! Session cryptography for botwire frames.
//!
//! - **X25519 key agreement**: client and server exchange ephemeral public
//!   keys in the plaintext `Hello`/`ServerHello` frames.
//! - **HKDF-SHA256 derivation**: the shared secret is expanded into a 32-byte
//!   [`SessionKey`] bound to the bot's uin.
//! - **ChaCha20-Poly1305 AEAD**: every frame after the key agreement is
//!   encrypted and authenticated with the session key; the frame header is
//!   the associated data.
//! - **SHA-256 digest**: credentials never travel in clear, only their digest.
//!
//! ```text
//! Client: (sk_c, pk_c) = X25519::generate()
//! Server: (sk_s, pk_s) = X25519::generate()
//!
//! shared      = X25519(sk_c, pk_s) = X25519(sk_s, pk_c)
//! session_key = HKDF(shared, "botwire/session/v1/<uin>")
//! ```
//!
//! Session keys live exactly as long as one connection: every reconnect or
//! re-login performs a fresh agreement.

mod aead;
mod exchange;
mod key;

pub use aead::{AeadError, FrameCipher};
pub use exchange::{EphemeralKeys, KeyExchangeError, PublicKey};
pub use key::{KeyMaterial, SessionKey};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Nonce size for ChaCha20-Poly1305 (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size for ChaCha20-Poly1305 (128 bits)
pub const AEAD_TAG_SIZE: usize = 16;

/// Session key size (256 bits)
pub const KEY_SIZE: usize = 32;

/// HKDF info prefix for session keys
pub const SESSION_KEY_CONTEXT: &str = "botwire/session/v1";

/// Unified error type for cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// AEAD encryption/decryption error.
    #[error("AEAD: {0}")]
    Aead(#[source] AeadError),

    /// Key exchange error (X25519).
    #[error("Key exchange: {0}")]
    Exchange(#[source] KeyExchangeError),

    /// HKDF expansion failed.
    #[error("Key derivation failed: {0}")]
    Derivation(String),
}

impl From<AeadError> for CryptoError {
    fn from(err: AeadError) -> Self {
        CryptoError::Aead(err)
    }
}

impl From<KeyExchangeError> for CryptoError {
    fn from(err: KeyExchangeError) -> Self {
        CryptoError::Exchange(err)
    }
}

/// One-way SHA-256 digest.
pub fn digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

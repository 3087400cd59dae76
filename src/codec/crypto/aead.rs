//! Frame sealing with ChaCha20-Poly1305.
//!
//! A sealed body is `nonce(12) || ciphertext || tag(16)`. The frame header is
//! passed as associated data, so a header edited in transit (sequence id,
//! flags) fails to open even though it travels in clear.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use super::key::SessionKey;
use super::{AEAD_TAG_SIZE, NONCE_SIZE};

/// Errors from sealing or opening a frame body
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AeadError {
    /// The cipher refused to encrypt (body too large for one nonce)
    #[error("sealing failed")]
    Seal,

    /// Wrong key, edited header or tampered body
    #[error("authentication failed")]
    Open,

    /// Body shorter than nonce plus tag
    #[error("sealed body of {len} bytes is shorter than nonce and tag")]
    Truncated {
        /// Bytes present.
        len: usize,
    },
}

/// Cipher sealing and opening frame bodies under one session key.
pub struct FrameCipher {
    cipher: ChaCha20Poly1305,
}

impl FrameCipher {
    /// Bind a cipher to `key`.
    pub fn new(key: &SessionKey) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(&(*key.as_bytes()).into()),
        }
    }

    /// Seal `body` under a fresh random nonce, authenticating `header`.
    pub fn seal(&self, body: &[u8], header: &[u8]) -> Result<Vec<u8>, AeadError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        self.seal_with_nonce(&nonce, body, header)
    }

    pub(crate) fn seal_with_nonce(
        &self,
        nonce: &[u8; NONCE_SIZE],
        body: &[u8],
        header: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: header,
                },
            )
            .map_err(|_| AeadError::Seal)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
        out.extend_from_slice(nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Open a sealed body produced by [`FrameCipher::seal`] with the same header.
    pub fn open(&self, sealed: &[u8], header: &[u8]) -> Result<Vec<u8>, AeadError> {
        if sealed.len() < NONCE_SIZE + AEAD_TAG_SIZE {
            return Err(AeadError::Truncated { len: sealed.len() });
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| AeadError::Open)
    }
}

impl std::fmt::Debug for FrameCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FrameCipher([REDACTED])")
    }
}

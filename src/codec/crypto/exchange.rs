//! X25519 key agreement for the login handshake.
//!
//! Each side generates [`EphemeralKeys`] per connection, sends the public
//! half in its hello frame and consumes the secret in [`EphemeralKeys::agree`].
//! A secret can therefore never be reused across reconnects.

use rand::rngs::OsRng;
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public};

use super::key::KeyMaterial;

/// Errors from key agreement
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyExchangeError {
    /// Public key of the wrong length
    #[error("public key must be 32 bytes, got {len}")]
    InvalidLength {
        /// Bytes received.
        len: usize,
    },

    /// Peer sent a low-order point; the shared secret would be predictable
    #[error("peer public key is not contributory")]
    NonContributory,
}

/// X25519 public key as carried in `Hello`/`ServerHello`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Bytes for a wire field
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyExchangeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| KeyExchangeError::InvalidLength { len: bytes.len() })
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// One connection's key-agreement secret and its public half.
pub struct EphemeralKeys {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeys {
    /// Fresh keys from the OS random source
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey(X25519Public::from(&secret).to_bytes());
        Self { secret, public }
    }

    /// Public half to send to the peer
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Consume the secret and compute the shared secret with `peer`.
    pub fn agree(self, peer: &PublicKey) -> Result<KeyMaterial, KeyExchangeError> {
        let shared = self.secret.diffie_hellman(&X25519Public::from(peer.0));
        if !shared.was_contributory() {
            return Err(KeyExchangeError::NonContributory);
        }
        Ok(KeyMaterial::new(shared.as_bytes().to_vec()))
    }
}

impl std::fmt::Debug for EphemeralKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeys")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement_matches_on_both_sides() {
        let client = EphemeralKeys::generate();
        let server = EphemeralKeys::generate();
        let (client_pk, server_pk) = (client.public_key(), server.public_key());

        let a = client.agree(&server_pk).unwrap();
        let b = server.agree(&client_pk).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_fresh_keys_differ() {
        assert_ne!(
            EphemeralKeys::generate().public_key(),
            EphemeralKeys::generate().public_key()
        );
    }

    #[test]
    fn test_rejects_low_order_peer() {
        let zero = PublicKey::try_from(&[0u8; 32][..]).unwrap();
        assert_eq!(
            EphemeralKeys::generate().agree(&zero).unwrap_err(),
            KeyExchangeError::NonContributory
        );
    }

    #[test]
    fn test_public_key_length() {
        assert_eq!(
            PublicKey::try_from(&[1u8; 16][..]),
            Err(KeyExchangeError::InvalidLength { len: 16 })
        );
    }
}

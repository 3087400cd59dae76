//! Key material and session key derivation.
//!
//! Uses HKDF (HMAC-based Key Derivation Function) to expand the X25519
//! shared secret into the per-connection session key.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{CryptoError, KEY_SIZE, SESSION_KEY_CONTEXT};

/// Key material (secret bytes), zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Create new key material from bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the key length
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the key is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Derive a new key using HKDF
    pub fn derive(&self, info: &[u8], output_len: usize) -> Result<KeyMaterial, CryptoError> {
        let hk = Hkdf::<Sha256>::new(None, &self.bytes);
        let mut okm = vec![0u8; output_len];

        hk.expand(info, &mut okm)
            .map_err(|e| CryptoError::Derivation(format!("HKDF expand failed: {}", e)))?;

        Ok(KeyMaterial::new(okm))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED, {} bytes])", self.bytes.len())
    }
}

/// Symmetric key protecting one connection's traffic.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Derive the session key for `uin` from an X25519 shared secret.
    pub fn derive(shared_secret: &KeyMaterial, uin: u64) -> Result<Self, CryptoError> {
        let info = format!("{}/{}", SESSION_KEY_CONTEXT, uin);
        let okm = shared_secret.derive(info.as_bytes(), KEY_SIZE)?;
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(okm.as_bytes());
        Ok(Self(bytes))
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_bound_to_uin() {
        let shared = KeyMaterial::new(vec![7u8; 32]);
        let a = SessionKey::derive(&shared, 10001).unwrap();
        let b = SessionKey::derive(&shared, 10001).unwrap();
        let c = SessionKey::derive(&shared, 10002).unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_debug_redacts() {
        let key = SessionKey::from_bytes([0x42; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "SessionKey([REDACTED])");

        let material = KeyMaterial::new(vec![1, 2, 3]);
        assert!(format!("{:?}", material).contains("3 bytes"));
    }

    #[test]
    fn test_derive_separates_info() {
        let ikm = KeyMaterial::new(vec![0x0b; 22]);
        let one = ikm.derive(b"one", 32).unwrap();
        let two = ikm.derive(b"two", 32).unwrap();
        assert_ne!(one.as_bytes(), two.as_bytes());
        assert_eq!(one.len(), 32);
    }
}

//! A single vault key generation
//!
//! Sealed payloads are laid out as `nonce(12) || ciphertext || tag(16)`, with a
//! fresh random nonce per call so equal plaintexts never seal alike.

use std::fmt;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};

use super::random_bytes;

pub const SECRET_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
/// Bytes a sealed payload carries on top of its plaintext
pub const SEAL_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("random source unavailable: {0}")]
    Entropy(getrandom::Error),
    #[error("a vault key is 32 bytes, got {0}")]
    Length(usize),
    #[error("authentication failed")]
    Authentication,
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Secret([u8; SECRET_SIZE]);

impl Secret {
    pub fn generate() -> Result<Self, SecretError> {
        random_bytes().map(Self).map_err(SecretError::Entropy)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SecretError> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| SecretError::Length(bytes.len()))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_SIZE] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, SecretError> {
        let nonce: [u8; NONCE_SIZE] = random_bytes().map_err(SecretError::Entropy)?;
        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| SecretError::Malformed("plaintext too large".to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Fails with [`SecretError::Authentication`] when this key did not seal the payload
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, SecretError> {
        if sealed.len() < SEAL_OVERHEAD {
            return Err(SecretError::Malformed(format!(
                "{} bytes is shorter than nonce and tag",
                sealed.len()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::Authentication)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seal_and_open() {
        let secret = Secret::generate().unwrap();
        let sealed = secret.seal(b"quarterly numbers").unwrap();
        assert_eq!(sealed.len(), 17 + SEAL_OVERHEAD);
        assert_eq!(secret.open(&sealed).unwrap(), b"quarterly numbers");
    }

    #[test]
    fn test_nonce_is_fresh() {
        let secret = Secret::generate().unwrap();
        assert_ne!(secret.seal(b"same").unwrap(), secret.seal(b"same").unwrap());
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(Secret::from_slice(&[7u8; SECRET_SIZE]).is_ok());
        assert!(matches!(
            Secret::from_slice(&[7u8; 16]),
            Err(SecretError::Length(16))
        ));
    }

    #[test]
    fn test_wrong_key_is_authentication_error() {
        let sealed = Secret::generate().unwrap().seal(b"Docs").unwrap();
        assert!(matches!(
            Secret::generate().unwrap().open(&sealed),
            Err(SecretError::Authentication)
        ));
    }

    #[test]
    fn test_short_input_is_malformed() {
        let secret = Secret::generate().unwrap();
        assert!(matches!(
            secret.open(&[0u8; 10]),
            Err(SecretError::Malformed(_))
        ));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let secret = Secret::generate().unwrap();
        let mut sealed = secret.seal(b"untouched").unwrap();
        sealed[NONCE_SIZE] ^= 0x01;
        assert!(matches!(
            secret.open(&sealed),
            Err(SecretError::Authentication)
        ));
    }

    #[test]
    fn test_empty_plaintext() {
        let secret = Secret::generate().unwrap();
        let sealed = secret.seal(b"").unwrap();
        assert_eq!(sealed.len(), SEAL_OVERHEAD);
        assert!(secret.open(&sealed).unwrap().is_empty());
    }

    #[test]
    fn test_debug_hides_key() {
        let secret = Secret::from_slice(&[0xab; SECRET_SIZE]).unwrap();
        assert!(!format!("{:?}", secret).contains("ab"));
    }
}

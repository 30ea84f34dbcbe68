use super::secret::{Secret, SecretError};
use super::secret_share::SecretShare;
use super::{CryptoError, PublicKey};

/// The vault-scoped key material
///
/// Holds every key generation of a vault, oldest first. Writes always use the
/// newest generation; reads try generations newest-first so payloads sealed
/// before a rotation stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    secrets: Vec<Secret>,
}

impl KeySet {
    pub fn new(secrets: Vec<Secret>) -> Self {
        Self { secrets }
    }

    /// A fresh key set with a single random generation
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::new(vec![Secret::generate()?]))
    }

    pub fn secrets(&self) -> &[Secret] {
        &self.secrets
    }

    pub fn current(&self) -> Option<&Secret> {
        self.secrets.last()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Seal bytes with the newest key generation
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let secret = self.current().ok_or(CryptoError::IncorrectKey)?;
        Ok(secret.seal(plaintext)?)
    }

    /// Open bytes sealed by any generation of this key set
    ///
    /// # Errors
    ///
    /// [`CryptoError::IncorrectKey`] when no generation authenticates the payload,
    /// [`CryptoError::Malformed`] when the payload is structurally broken.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        for secret in self.secrets.iter().rev() {
            match secret.open(ciphertext) {
                Ok(plaintext) => return Ok(plaintext),
                Err(SecretError::Authentication) => continue,
                Err(SecretError::Malformed(reason)) => return Err(CryptoError::Malformed(reason)),
                Err(err) => return Err(err.into()),
            }
        }
        Err(CryptoError::IncorrectKey)
    }

    /// Seal a UTF-8 string, returning the hex encoded ciphertext
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String, CryptoError> {
        Ok(hex::encode(self.encrypt(plaintext.as_bytes())?))
    }

    /// Open a hex encoded ciphertext produced by [`KeySet::encrypt_string`]
    pub fn decrypt_string(&self, value: &str) -> Result<String, CryptoError> {
        let ciphertext =
            hex::decode(value).map_err(|e| CryptoError::Malformed(format!("hex: {}", e)))?;
        let plaintext = self.decrypt(&ciphertext)?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::Malformed(format!("utf-8: {}", e)))
    }

    /// Wrap every generation for a recipient, oldest first
    pub fn wrap_for(&self, recipient: &PublicKey) -> Result<Vec<SecretShare>, CryptoError> {
        self.secrets
            .iter()
            .map(|secret| SecretShare::new(secret, recipient).map_err(CryptoError::from))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;

    #[test]
    fn test_string_roundtrip() {
        let keys = KeySet::generate().unwrap();
        let sealed = keys.encrypt_string("readme.md").unwrap();
        assert_ne!(sealed, "readme.md");
        assert_eq!(keys.decrypt_string(&sealed).unwrap(), "readme.md");
    }

    #[test]
    fn test_wrong_key_set() {
        let keys = KeySet::generate().unwrap();
        let other = KeySet::generate().unwrap();
        let sealed = keys.encrypt_string("Docs").unwrap();

        assert!(matches!(
            other.decrypt_string(&sealed),
            Err(CryptoError::IncorrectKey)
        ));
    }

    #[test]
    fn test_empty_key_set_is_incorrect_key() {
        let keys = KeySet::default();
        assert!(matches!(keys.encrypt(b"x"), Err(CryptoError::IncorrectKey)));
    }

    #[test]
    fn test_non_hex_is_malformed() {
        let keys = KeySet::generate().unwrap();
        assert!(matches!(
            keys.decrypt_string("not hex at all"),
            Err(CryptoError::Malformed(_))
        ));
    }

    #[test]
    fn test_older_generation_still_decrypts() {
        let first = Secret::generate().unwrap();
        let sealed = KeySet::new(vec![first.clone()])
            .encrypt_string("before rotation")
            .unwrap();

        let rotated = KeySet::new(vec![first, Secret::generate().unwrap()]);
        assert_eq!(rotated.decrypt_string(&sealed).unwrap(), "before rotation");
    }

    #[test]
    fn test_wrap_for_member() {
        let keys = KeySet::generate().unwrap();
        let member = SecretKey::generate().unwrap();

        let shares = keys.wrap_for(&member.public()).unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(&shares[0].recover(&member).unwrap(), keys.current().unwrap());
    }
}

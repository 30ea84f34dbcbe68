//! Member identities
//!
//! One Ed25519 keypair per member. The public half names the member on the
//! ledger (its address), receives wrapped vault keys once converted to
//! X25519, and identifies the author of a memo reaction.

use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::SigningKey;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as AgreementKey, StaticSecret};

use super::{decode_fixed, random_bytes};

pub const PRIVATE_KEY_SIZE: usize = 32;
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Digest bytes an address keeps
pub const ADDRESS_SIZE: usize = 20;

const PEM_TAG: &str = "PRIVATE KEY";

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected a {expected} byte key, got {got}")]
    Length { expected: usize, got: usize },
    #[error("invalid pem: {0}")]
    Pem(String),
    #[error("key is not a point on the curve")]
    Point,
    #[error("random source unavailable: {0}")]
    Entropy(getrandom::Error),
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], KeyError> {
    bytes.try_into().map_err(|_| KeyError::Length {
        expected: N,
        got: bytes.len(),
    })
}

/// Public half of a member identity, hex on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        fixed(bytes).map(Self)
    }

    pub fn from_hex(value: &str) -> Result<Self, KeyError> {
        Ok(Self(decode_fixed(value)?))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Hex of the first [`ADDRESS_SIZE`] bytes of the key's blake3 digest
    pub fn address(&self) -> String {
        let digest = blake3::hash(&self.0);
        hex::encode(&digest.as_bytes()[..ADDRESS_SIZE])
    }

    /// The Montgomery form used for key agreement
    pub(crate) fn agreement_key(&self) -> Result<AgreementKey, KeyError> {
        let point = CompressedEdwardsY(self.0)
            .decompress()
            .ok_or(KeyError::Point)?;
        Ok(AgreementKey::from(point.to_montgomery().to_bytes()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_hex(value)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// Private half of a member identity
///
/// Debug output only ever shows the public half.
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl SecretKey {
    pub fn generate() -> Result<Self, KeyError> {
        let seed = random_bytes::<PRIVATE_KEY_SIZE>().map_err(KeyError::Entropy)?;
        Ok(Self(SigningKey::from_bytes(&seed)))
    }

    pub fn from_hex(value: &str) -> Result<Self, KeyError> {
        let seed = decode_fixed::<PRIVATE_KEY_SIZE>(value)?;
        Ok(Self(SigningKey::from_bytes(&seed)))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PEM_TAG, self.0.to_bytes().to_vec()))
    }

    pub fn from_pem(source: &str) -> Result<Self, KeyError> {
        let parsed = pem::parse(source).map_err(|e| KeyError::Pem(e.to_string()))?;
        if parsed.tag() != PEM_TAG {
            return Err(KeyError::Pem(format!("unexpected tag {}", parsed.tag())));
        }
        let seed = fixed::<PRIVATE_KEY_SIZE>(parsed.contents())?;
        Ok(Self(SigningKey::from_bytes(&seed)))
    }

    /// The clamped scalar as an X25519 secret, matching [`PublicKey::agreement_key`]
    pub(crate) fn agreement_secret(&self) -> StaticSecret {
        StaticSecret::from(self.0.to_scalar_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(public: {})", self.public())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let key = SecretKey::generate().unwrap();
        let restored = SecretKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(restored.public(), key.public());

        let public = key.public();
        assert_eq!(PublicKey::from_hex(&public.to_hex()).unwrap(), public);
        assert_eq!(
            PublicKey::from_hex(&format!("0x{}", public.to_hex())).unwrap(),
            public
        );
    }

    #[test]
    fn test_pem_roundtrip() {
        let key = SecretKey::generate().unwrap();
        let pem = key.to_pem();
        assert!(pem.contains("BEGIN PRIVATE KEY"));
        assert_eq!(SecretKey::from_pem(&pem).unwrap().public(), key.public());

        let wrong_tag = pem::encode(&pem::Pem::new("PUBLIC KEY", vec![0u8; 32]));
        assert!(matches!(
            SecretKey::from_pem(&wrong_tag),
            Err(KeyError::Pem(_))
        ));
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            PublicKey::from_bytes(&[1u8; 31]),
            Err(KeyError::Length {
                expected: 32,
                got: 31
            })
        ));
        assert!(matches!(
            PublicKey::from_hex("abcd"),
            Err(KeyError::Hex(_))
        ));
    }

    #[test]
    fn test_address_is_stable() {
        let public = SecretKey::generate().unwrap().public();
        let address = public.address();
        assert_eq!(address.len(), ADDRESS_SIZE * 2);
        assert_eq!(address, public.address());
    }

    #[test]
    fn test_public_key_json() {
        let public = SecretKey::generate().unwrap().public();
        let json = serde_json::to_string(&public).unwrap();
        assert_eq!(json, format!("\"{}\"", public.to_hex()));
        assert_eq!(serde_json::from_str::<PublicKey>(&json).unwrap(), public);
    }

    #[test]
    fn test_agreement_is_symmetric() {
        let a = SecretKey::generate().unwrap();
        let b = SecretKey::generate().unwrap();

        let ab = a
            .agreement_secret()
            .diffie_hellman(&b.public().agreement_key().unwrap());
        let ba = b
            .agreement_secret()
            .diffie_hellman(&a.public().agreement_key().unwrap());
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }
}

//! Vault keys wrapped for a single member
//!
//! A share is `ephemeral public key(32) || AES-KW(kek, vault key)(40)`. The key
//! encryption key is the X25519 agreement between a throwaway identity and the
//! member, so only the member's secret key reproduces it.

use std::fmt;
use std::str::FromStr;

use aes_kw::KekAes256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::decode_fixed;
use super::keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::{Secret, SecretError, SECRET_SIZE};

const KEY_WRAP_OVERHEAD: usize = 8;
pub const SECRET_SHARE_SIZE: usize = PUBLIC_KEY_SIZE + SECRET_SIZE + KEY_WRAP_OVERHEAD;

#[derive(Debug, thiserror::Error)]
pub enum SecretShareError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("key wrap failed")]
    Wrap,
    #[error("share was wrapped for another member")]
    WrongRecipient,
}

fn key_encryption_key(ours: &SecretKey, theirs: &PublicKey) -> Result<KekAes256, KeyError> {
    let agreed = ours
        .agreement_secret()
        .diffie_hellman(&theirs.agreement_key()?);
    Ok(KekAes256::from(*agreed.as_bytes()))
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecretShare([u8; SECRET_SHARE_SIZE]);

impl SecretShare {
    /// Wrap `secret` so that only `recipient` can recover it
    pub fn new(secret: &Secret, recipient: &PublicKey) -> Result<Self, SecretShareError> {
        let ephemeral = SecretKey::generate()?;
        let wrapped = key_encryption_key(&ephemeral, recipient)?
            .wrap_vec(secret.as_bytes())
            .map_err(|_| SecretShareError::Wrap)?;

        let mut share = [0u8; SECRET_SHARE_SIZE];
        let (head, tail) = share.split_at_mut(PUBLIC_KEY_SIZE);
        if tail.len() != wrapped.len() {
            return Err(SecretShareError::Wrap);
        }
        head.copy_from_slice(ephemeral.public().as_bytes());
        tail.copy_from_slice(&wrapped);
        Ok(Self(share))
    }

    pub fn recover(&self, recipient: &SecretKey) -> Result<Secret, SecretShareError> {
        let (head, wrapped) = self.0.split_at(PUBLIC_KEY_SIZE);
        let ephemeral = PublicKey::from_bytes(head)?;
        let unwrapped = key_encryption_key(recipient, &ephemeral)?
            .unwrap_vec(wrapped)
            .map_err(|_| SecretShareError::WrongRecipient)?;
        Ok(Secret::from_slice(&unwrapped)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for SecretShare {
    type Err = SecretShareError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = decode_fixed(value).map_err(KeyError::from)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SecretShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SecretShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretShare({}..)", hex::encode(&self.0[..8]))
    }
}

impl Serialize for SecretShare {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SecretShare {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_recipient_recovers_secret() {
        let secret = Secret::generate().unwrap();
        let member = SecretKey::generate().unwrap();

        let share = SecretShare::new(&secret, &member.public()).unwrap();
        assert_eq!(share.recover(&member).unwrap(), secret);
    }

    #[test]
    fn test_other_member_cannot_recover() {
        let secret = Secret::generate().unwrap();
        let member = SecretKey::generate().unwrap();
        let outsider = SecretKey::generate().unwrap();

        let share = SecretShare::new(&secret, &member.public()).unwrap();
        assert!(matches!(
            share.recover(&outsider),
            Err(SecretShareError::WrongRecipient)
        ));
    }

    #[test]
    fn test_shares_for_one_member_differ() {
        let secret = Secret::generate().unwrap();
        let member = SecretKey::generate().unwrap().public();
        assert_ne!(
            SecretShare::new(&secret, &member).unwrap(),
            SecretShare::new(&secret, &member).unwrap()
        );
    }

    #[test]
    fn test_share_inside_json_state() {
        let member = SecretKey::generate().unwrap();
        let share = SecretShare::new(&Secret::generate().unwrap(), &member.public()).unwrap();

        let json = serde_json::json!({ "keys": [share] });
        assert_eq!(json["keys"][0], share.to_hex());
        let parsed: Vec<SecretShare> = serde_json::from_value(json["keys"].clone()).unwrap();
        assert_eq!(parsed, vec![share]);
    }

    #[test]
    fn test_rejects_bad_length() {
        assert!("abcd".parse::<SecretShare>().is_err());
        assert!(hex::encode([0u8; SECRET_SHARE_SIZE])
            .parse::<SecretShare>()
            .is_ok());
    }
}

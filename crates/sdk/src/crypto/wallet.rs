use std::fmt;

use super::key_set::KeySet;
use super::secret_share::{SecretShare, SecretShareError};
use super::{CryptoError, PublicKey, SecretKey};

/// The active identity the SDK acts as
///
/// Supplies the address written into transaction tags and version owners, and
/// unwraps the vault keys a membership carries for it.
pub trait Wallet: Send + Sync + fmt::Debug {
    /// Ledger address of the identity
    fn address(&self) -> String;

    /// Key vault secrets are wrapped to
    fn public_key(&self) -> PublicKey;

    /// Key that identifies signed records such as reactions
    fn public_signing_key(&self) -> PublicKey;

    /// Recover a vault key set from the shares wrapped for this identity
    fn unwrap_keys(&self, shares: &[SecretShare]) -> Result<KeySet, CryptoError>;
}

/// [`Wallet`] backed by a single Ed25519 [`SecretKey`]
///
/// The same keypair signs and receives wrapped keys.
#[derive(Debug, Clone)]
pub struct KeyWallet {
    secret_key: SecretKey,
}

impl KeyWallet {
    pub fn new(secret_key: SecretKey) -> Self {
        Self { secret_key }
    }

    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::new(SecretKey::generate()?))
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }
}

impl Wallet for KeyWallet {
    fn address(&self) -> String {
        self.secret_key.public().address()
    }

    fn public_key(&self) -> PublicKey {
        self.secret_key.public()
    }

    fn public_signing_key(&self) -> PublicKey {
        self.secret_key.public()
    }

    fn unwrap_keys(&self, shares: &[SecretShare]) -> Result<KeySet, CryptoError> {
        let secrets = shares
            .iter()
            .map(|share| share.recover(&self.secret_key))
            .collect::<Result<Vec<_>, SecretShareError>>()
            .map_err(|err| match err {
                SecretShareError::WrongRecipient => CryptoError::IncorrectKey,
                other => CryptoError::Share(other),
            })?;
        Ok(KeySet::new(secrets))
    }
}

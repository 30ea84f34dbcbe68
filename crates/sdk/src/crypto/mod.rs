//! Cryptographic primitives for vault payloads
//!
//! - **Identity**: Ed25519 keypairs ([`SecretKey`]/[`PublicKey`]) behind the [`Wallet`] trait
//! - **Payload encryption**: ChaCha20-Poly1305 vault keys ([`Secret`]) grouped into a [`KeySet`]
//! - **Key sharing**: ECDH + AES-KW wrapping of vault keys per member ([`SecretShare`])
//!
//! # Vault keys
//!
//! A private vault has a key set that is generated once by the owner and wrapped
//! for every member that gains access. Members recover the set from the shares
//! stored on their membership and use it to seal and open every confidential
//! string field and file body in the vault. Public vaults carry no keys.

mod key_set;
mod keys;
mod secret;
mod secret_share;
mod wallet;

pub use key_set::KeySet;
pub use keys::{KeyError, PublicKey, SecretKey, ADDRESS_SIZE};
pub use secret::{Secret, SecretError, SEAL_OVERHEAD, SECRET_SIZE};
pub use secret_share::{SecretShare, SecretShareError, SECRET_SHARE_SIZE};
pub use wallet::{KeyWallet, Wallet};

/// Errors surfaced by the crypto layer to the services
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// None of the loaded keys could open the payload
    #[error("incorrect encryption key")]
    IncorrectKey,
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("share error: {0}")]
    Share(#[from] SecretShareError),
    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

/// Exactly `N` bytes of hex, an optional `0x` prefix allowed
pub(crate) fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], hex::FromHexError> {
    let mut out = [0u8; N];
    hex::decode_to_slice(value.strip_prefix("0x").unwrap_or(value), &mut out)?;
    Ok(out)
}

pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], getrandom::Error> {
    let mut out = [0u8; N];
    getrandom::getrandom(&mut out)?;
    Ok(out)
}

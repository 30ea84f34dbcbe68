//! Services that turn vault operations into ledger transactions
//!
//! Every mutating call follows the same path: load the vault context
//! (record and unwrapped keys), build or patch the object's state, seal its
//! confidential strings, upload the state blob, post a transaction that points
//! at it, and hand back the object the ledger reports, opened for the caller.
//!
//! The node services share one generic engine, [`NodeService`], parameterized
//! by a [`NodeModel`] per kind.

mod base;
mod folder;
mod membership;
mod memo;
mod node;
mod note;
mod stack;
pub mod tags;
mod vault;

use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::ledger::LedgerError;
use crate::storage::StorageError;
use crate::types::TransitionError;

pub use base::{ServiceContext, VaultContext};
pub use folder::{Folder, FolderService};
pub use membership::{MembershipInvited, MembershipService};
pub use memo::{Memo, MemoService};
pub use node::{NodeModel, NodeOp, NodePatch, NodeService};
pub use note::{Note, NoteService, NoteType, NOTE_CONTENT_TYPES};
pub use stack::{FileLike, Stack, StackCreateOptions, StackService, TransferOptions};
pub use tags::ActionRef;
pub use vault::{VaultCreateOptions, VaultCreated, VaultService};

pub(crate) use base::group_ref_for;
pub(crate) use node::PreparedCreate;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The thing searched for does not exist, carries the search key
    #[error("not found: {0}")]
    NotFound(String),
    /// The loaded key set cannot open the payload
    #[error("incorrect encryption key")]
    IncorrectEncryptionKey,
    /// A precondition failed
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("ledger error: {0}")]
    Ledger(LedgerError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("crypto error: {0}")]
    Crypto(CryptoError),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("{0}")]
    Default(#[from] anyhow::Error),
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(key) => ServiceError::NotFound(key),
            LedgerError::BadRequest(reason) => ServiceError::BadRequest(reason),
            other => ServiceError::Ledger(other),
        }
    }
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::IncorrectKey => ServiceError::IncorrectEncryptionKey,
            other => ServiceError::Crypto(other),
        }
    }
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        ServiceError::BadRequest(err.to_string())
    }
}

/// Outcome of a create
#[derive(Debug, Clone)]
pub struct NodeCreated<T> {
    pub node_id: Uuid,
    pub transaction_id: String,
    pub object: T,
}

/// Outcome of an update on an existing object
#[derive(Debug, Clone)]
pub struct Updated<T> {
    pub transaction_id: String,
    pub object: T,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            ServiceError::from(LedgerError::NotFound("node 1".into())),
            ServiceError::NotFound(key) if key == "node 1"
        ));
        assert!(matches!(
            ServiceError::from(LedgerError::Rejected("busy".into())),
            ServiceError::Ledger(_)
        ));
        assert!(matches!(
            ServiceError::from(CryptoError::IncorrectKey),
            ServiceError::IncorrectEncryptionKey
        ));
        assert!(matches!(
            ServiceError::from(CryptoError::Malformed("hex".into())),
            ServiceError::Crypto(_)
        ));
    }
}

//! The contract ledger a vault is anchored in
//!
//! Every mutation of a vault is an ordered, immutable [`Transaction`] in the
//! vault's log. The current view of any object is a pure fold over that log
//! (see [`contract`]); gateways only ever hand out folded records.
//!
//! [`LedgerGateway`] is the seam the services talk to. [`memory::MemoryLedger`]
//! is a complete in-process backend used by the test harness.

pub mod contract;
pub mod memory;
mod transaction;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{PublicKey, SecretShare};
use crate::types::{MembershipStatus, NodeKind, NodeStatus, Role, VaultStatus};

pub use contract::{ContractError, ContractState};
pub use transaction::{tag_names, ContractFunction, ContractInput, Tag, Tags, Transaction};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),
    /// The contract refused the transaction
    #[error("bad request: {0}")]
    BadRequest(String),
    /// The gateway refused the transaction for reasons outside the contract
    #[error("transaction rejected: {0}")]
    Rejected(String),
    #[error("ledger provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

impl From<ContractError> for LedgerError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::NotFound(what) => LedgerError::NotFound(what),
            other => LedgerError::BadRequest(other.to_string()),
        }
    }
}

/// Folded view of a vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultRecord {
    pub id: Uuid,
    pub owner: String,
    pub public: bool,
    pub status: VaultStatus,
    pub size: u64,
    /// State pointer history, last is current
    pub data: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Folded view of a membership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    pub id: Uuid,
    pub vault_id: Uuid,
    /// Address that created the membership
    pub owner: String,
    pub address: Option<String>,
    /// Set on server-side invites of users without an account
    pub email: Option<String>,
    pub status: MembershipStatus,
    pub role: Role,
    pub data: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Folded view of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: Uuid,
    pub vault_id: Uuid,
    pub kind: NodeKind,
    pub owner: String,
    pub parent_id: Option<Uuid>,
    pub status: NodeStatus,
    pub data: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NodeRecord {
    /// Current state pointer
    pub fn current_data(&self) -> Option<&str> {
        self.data.last().map(String::as_str)
    }
}

/// The object a transaction touched, as folded right after it was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object")]
pub enum LedgerObject {
    Vault(VaultRecord),
    Membership(MembershipRecord),
    Node(NodeRecord),
}

impl LedgerObject {
    pub fn id(&self) -> Uuid {
        match self {
            LedgerObject::Vault(vault) => vault.id,
            LedgerObject::Membership(membership) => membership.id,
            LedgerObject::Node(node) => node.id,
        }
    }

    pub fn into_vault(self) -> Result<VaultRecord, LedgerError> {
        match self {
            LedgerObject::Vault(vault) => Ok(vault),
            other => Err(unexpected("vault", &other)),
        }
    }

    pub fn into_membership(self) -> Result<MembershipRecord, LedgerError> {
        match self {
            LedgerObject::Membership(membership) => Ok(membership),
            other => Err(unexpected("membership", &other)),
        }
    }

    pub fn into_node(self) -> Result<NodeRecord, LedgerError> {
        match self {
            LedgerObject::Node(node) => Ok(node),
            other => Err(unexpected("node", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &LedgerObject) -> LedgerError {
    LedgerError::Provider(anyhow::anyhow!(
        "expected a {} object, gateway returned {}",
        expected,
        got.id()
    ))
}

/// Result of posting a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub id: String,
    pub object: LedgerObject,
}

/// Key material a member needs to work in a vault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipKeys {
    pub public: bool,
    /// Vault key generations wrapped for the member, oldest first
    pub keys: Vec<SecretShare>,
}

/// What the backend publishes about a registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPublicData {
    pub address: String,
    pub public_key: PublicKey,
    pub public_signing_key: PublicKey,
}

#[async_trait]
pub trait LedgerGateway: Send + Sync + std::fmt::Debug {
    /// Append a transaction to the vault's log
    ///
    /// Returns the transaction id and the touched object as folded after the append.
    /// A transaction the contract refuses fails with [`LedgerError::BadRequest`]
    /// and leaves the log unchanged.
    async fn post_contract_transaction(
        &self,
        vault_id: Uuid,
        input: ContractInput,
        tags: Tags,
    ) -> Result<TransactionReceipt, LedgerError>;

    async fn get_vault(&self, id: Uuid) -> Result<VaultRecord, LedgerError>;

    async fn get_membership(&self, id: Uuid) -> Result<MembershipRecord, LedgerError>;

    async fn get_node(&self, id: Uuid, kind: NodeKind) -> Result<NodeRecord, LedgerError>;

    /// Wrapped vault keys of the accepted membership `address` holds in the vault
    async fn get_membership_keys(
        &self,
        vault_id: Uuid,
        address: &str,
    ) -> Result<MembershipKeys, LedgerError>;

    /// Every membership of the vault, server-side pending invites included
    async fn get_members(&self, vault_id: Uuid) -> Result<Vec<MembershipRecord>, LedgerError>;

    async fn list_nodes(
        &self,
        vault_id: Uuid,
        kind: NodeKind,
    ) -> Result<Vec<NodeRecord>, LedgerError>;

    /// The vault's log in ledger order
    async fn get_transactions(&self, vault_id: Uuid) -> Result<Vec<Transaction>, LedgerError>;

    async fn exists_user(&self, email: &str) -> Result<bool, LedgerError>;

    async fn get_user_public_data(&self, email: &str) -> Result<UserPublicData, LedgerError>;

    /// Register a pending invite for a user without an account
    ///
    /// Issues no transaction; the key wrapping happens once the user signs up and accepts.
    async fn invite_new_user(
        &self,
        vault_id: Uuid,
        email: &str,
        role: Role,
        message: Option<String>,
    ) -> Result<Uuid, LedgerError>;
}

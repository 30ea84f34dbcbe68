/**
 * Batch operations across many objects of a vault.
 *  Bounded concurrency, per-item errors,
 *  cancellation and ordered stack creation.
 */
pub mod batch;
/**
 * The client facade: gateways, identity and
 *  configuration shared by every service.
 */
pub mod client;
/**
 * Client-wide settings, loadable from TOML.
 */
pub mod config;
/**
 * Cryptographic types and operations.
 *  - Public and Private key implementations
 *  - Vault key sets and per-member key sharing
 */
pub mod crypto;
/**
 * The contract ledger: transactions, the pure
 *  state fold and the gateway the services post to.
 */
pub mod ledger;
pub mod logging;
/**
 * Vault, membership and node services.
 *  Every mutation turns into one sealed,
 *  uploaded state and one ledger transaction.
 */
pub mod service;
/**
 * Bulk storage for state blobs and file bodies.
 */
pub mod storage;
/**
 * In-process network of users sharing an
 *  in-memory ledger and storage, for tests.
 */
pub mod testkit;
/**
 * The vault data model and its status machines.
 */
pub mod types;

pub mod prelude {
    pub use crate::batch::{
        BatchNodeItem, BatchOptions, BatchResponse, BatchService, MembershipInviteItem,
        MembershipRoleItem, StackCreateItem,
    };
    pub use crate::client::{Client, ClientBuilder};
    pub use crate::config::Config;
    pub use crate::crypto::{KeyWallet, PublicKey, SecretKey, Wallet};
    pub use crate::ledger::memory::MemoryLedger;
    pub use crate::ledger::{LedgerGateway, Transaction};
    pub use crate::service::{
        FileLike, NoteType, ServiceError, StackCreateOptions, TransferOptions, VaultCreateOptions,
    };
    pub use crate::storage::{MemoryStorage, StorageGateway};
    pub use crate::types::{NodeStatus, ObjectType, Reaction, Role};
}

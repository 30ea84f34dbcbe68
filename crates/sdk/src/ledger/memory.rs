use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::contract::ContractState;
use super::transaction::{tag_names, ContractFunction, ContractInput, Tags, Transaction};
use super::{
    LedgerError, LedgerGateway, MembershipKeys, MembershipRecord, NodeRecord, TransactionReceipt,
    UserPublicData, VaultRecord,
};
use crate::storage::{MemoryStorage, StorageGateway};
use crate::types::{now_millis, MembershipState, MembershipStatus, NodeKind, Role};

/// Decides whether a post should be refused before it reaches the contract
pub type FailureHook = Arc<dyn Fn(&ContractInput, &Tags) -> bool + Send + Sync>;

/// In-process managed backend
///
/// Keeps one ordered log per vault and the state folded from it, a registry of
/// users and the server-side invites of users without an account. Membership
/// keys are read from the membership state blobs in the shared storage.
#[derive(Clone)]
pub struct MemoryLedger {
    inner: Arc<RwLock<MemoryLedgerInner>>,
    storage: MemoryStorage,
}

#[derive(Default)]
struct MemoryLedgerInner {
    vaults: HashMap<Uuid, VaultLog>,
    users: HashMap<String, UserPublicData>,
    pending_invites: HashMap<Uuid, Vec<MembershipRecord>>,
    fail_when: Option<FailureHook>,
}

#[derive(Debug, Default)]
struct VaultLog {
    transactions: Vec<Transaction>,
    state: ContractState,
}

impl fmt::Debug for MemoryLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vaults = self.inner.read().map(|inner| inner.vaults.len()).unwrap_or(0);
        f.debug_struct("MemoryLedger").field("vaults", &vaults).finish()
    }
}

fn lock_error(e: impl fmt::Display) -> LedgerError {
    LedgerError::Provider(anyhow::anyhow!("failed to acquire ledger lock: {}", e))
}

impl MemoryLedger {
    pub fn new(storage: MemoryStorage) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryLedgerInner::default())),
            storage,
        }
    }

    pub fn register_user(&self, email: impl Into<String>, data: UserPublicData) {
        if let Ok(mut inner) = self.inner.write() {
            inner.users.insert(email.into(), data);
        }
    }

    /// Refuse every post the hook matches with [`LedgerError::Rejected`]
    pub fn fail_when<F>(&self, hook: F)
    where
        F: Fn(&ContractInput, &Tags) -> bool + Send + Sync + 'static,
    {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_when = Some(Arc::new(hook));
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.fail_when = None;
        }
    }

    /// Re-fold the vault's whole log and check it matches the live state
    pub fn verify(&self, vault_id: Uuid) -> Result<ContractState, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        let log = inner
            .vaults
            .get(&vault_id)
            .ok_or_else(|| LedgerError::NotFound(format!("vault {}", vault_id)))?;
        let folded = ContractState::fold(&log.transactions)?;
        if folded != log.state {
            return Err(LedgerError::Provider(anyhow::anyhow!(
                "state of vault {} diverged from its log",
                vault_id
            )));
        }
        Ok(folded)
    }

    fn find<T>(&self, pick: impl Fn(&VaultLog) -> Option<T>) -> Result<Option<T>, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        Ok(inner.vaults.values().find_map(pick))
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn post_contract_transaction(
        &self,
        vault_id: Uuid,
        input: ContractInput,
        tags: Tags,
    ) -> Result<TransactionReceipt, LedgerError> {
        let mut guard = self.inner.write().map_err(lock_error)?;
        let inner = &mut *guard;

        if let Some(hook) = &inner.fail_when {
            if hook(&input, &tags) {
                return Err(LedgerError::Rejected(format!(
                    "{} refused by the backend",
                    input.function
                )));
            }
        }

        // a confirm settles one of the invites kept for users without an account
        let confirmed = if input.function == ContractFunction::MembershipConfirm {
            let invite_id = tags
                .get(tag_names::OBJECT_ID)
                .and_then(|value| value.parse::<Uuid>().ok())
                .filter(|id| {
                    inner
                        .pending_invites
                        .get(&vault_id)
                        .map_or(false, |pending| pending.iter().any(|invite| invite.id == *id))
                })
                .ok_or_else(|| {
                    LedgerError::NotFound(format!("pending invite in vault {}", vault_id))
                })?;
            Some(invite_id)
        } else {
            None
        };

        let is_init = input.function == ContractFunction::VaultInit;
        if !is_init && !inner.vaults.contains_key(&vault_id) {
            return Err(LedgerError::NotFound(format!("vault {}", vault_id)));
        }
        let log = inner.vaults.entry(vault_id).or_default();

        let tx = Transaction {
            id: Uuid::new_v4().to_string(),
            vault_id,
            input,
            tags,
            sequence: log.transactions.len() as u64,
            timestamp: now_millis(),
        };
        let object = match log.state.apply(&tx) {
            Ok(object) => object,
            Err(err) => {
                if is_init && log.transactions.is_empty() {
                    inner.vaults.remove(&vault_id);
                }
                tracing::debug!("contract refused {}: {}", tx.input.function, err);
                return Err(err.into());
            }
        };
        let id = tx.id.clone();
        log.transactions.push(tx);

        if let Some(invite_id) = confirmed {
            if let Some(pending) = inner.pending_invites.get_mut(&vault_id) {
                pending.retain(|invite| invite.id != invite_id);
            }
            tracing::debug!("pending invite {} confirmed in vault {}", invite_id, vault_id);
        }

        Ok(TransactionReceipt { id, object })
    }

    async fn get_vault(&self, id: Uuid) -> Result<VaultRecord, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        inner
            .vaults
            .get(&id)
            .and_then(|log| log.state.vault.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("vault {}", id)))
    }

    async fn get_membership(&self, id: Uuid) -> Result<MembershipRecord, LedgerError> {
        if let Some(membership) = self.find(|log| log.state.memberships.get(&id).cloned())? {
            return Ok(membership);
        }
        let inner = self.inner.read().map_err(lock_error)?;
        inner
            .pending_invites
            .values()
            .flatten()
            .find(|invite| invite.id == id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("membership {}", id)))
    }

    async fn get_node(&self, id: Uuid, kind: NodeKind) -> Result<NodeRecord, LedgerError> {
        self.find(|log| log.state.nodes.get(&id).cloned())?
            .filter(|node| node.kind == kind)
            .ok_or_else(|| LedgerError::NotFound(format!("{} {}", kind, id)))
    }

    async fn get_membership_keys(
        &self,
        vault_id: Uuid,
        address: &str,
    ) -> Result<MembershipKeys, LedgerError> {
        let vault = self.get_vault(vault_id).await?;
        if vault.public {
            return Ok(MembershipKeys {
                public: true,
                keys: Vec::new(),
            });
        }

        let state_id = {
            let inner = self.inner.read().map_err(lock_error)?;
            inner
                .vaults
                .get(&vault_id)
                .and_then(|log| {
                    log.state.memberships.values().find(|m| {
                        m.address.as_deref() == Some(address)
                            && m.status == MembershipStatus::Accepted
                    })
                })
                .and_then(|m| m.data.last().cloned())
                .ok_or_else(|| {
                    LedgerError::NotFound(format!("keys of {} in vault {}", address, vault_id))
                })?
        };

        let value = self
            .storage
            .get_node_state(&state_id)
            .await
            .map_err(|e| LedgerError::Provider(e.into()))?;
        let state: MembershipState =
            serde_json::from_value(value).map_err(|e| LedgerError::Provider(e.into()))?;
        Ok(MembershipKeys {
            public: false,
            keys: state.keys,
        })
    }

    async fn get_members(&self, vault_id: Uuid) -> Result<Vec<MembershipRecord>, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        let log = inner
            .vaults
            .get(&vault_id)
            .ok_or_else(|| LedgerError::NotFound(format!("vault {}", vault_id)))?;
        let mut members: Vec<_> = log.state.memberships.values().cloned().collect();
        if let Some(pending) = inner.pending_invites.get(&vault_id) {
            members.extend(pending.iter().cloned());
        }
        members.sort_by_key(|m| m.created_at);
        Ok(members)
    }

    async fn list_nodes(
        &self,
        vault_id: Uuid,
        kind: NodeKind,
    ) -> Result<Vec<NodeRecord>, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        let log = inner
            .vaults
            .get(&vault_id)
            .ok_or_else(|| LedgerError::NotFound(format!("vault {}", vault_id)))?;
        let mut nodes: Vec<_> = log
            .state
            .nodes
            .values()
            .filter(|node| node.kind == kind)
            .cloned()
            .collect();
        nodes.sort_by_key(|node| node.created_at);
        Ok(nodes)
    }

    async fn get_transactions(&self, vault_id: Uuid) -> Result<Vec<Transaction>, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        inner
            .vaults
            .get(&vault_id)
            .map(|log| log.transactions.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("vault {}", vault_id)))
    }

    async fn exists_user(&self, email: &str) -> Result<bool, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        Ok(inner.users.contains_key(email))
    }

    async fn get_user_public_data(&self, email: &str) -> Result<UserPublicData, LedgerError> {
        let inner = self.inner.read().map_err(lock_error)?;
        inner
            .users
            .get(email)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("user {}", email)))
    }

    async fn invite_new_user(
        &self,
        vault_id: Uuid,
        email: &str,
        role: Role,
        message: Option<String>,
    ) -> Result<Uuid, LedgerError> {
        let mut inner = self.inner.write().map_err(lock_error)?;
        let owner = inner
            .vaults
            .get(&vault_id)
            .and_then(|log| log.state.vault.as_ref())
            .map(|vault| vault.owner.clone())
            .ok_or_else(|| LedgerError::NotFound(format!("vault {}", vault_id)))?;

        let pending = inner.pending_invites.entry(vault_id).or_default();
        if pending.iter().any(|invite| invite.email.as_deref() == Some(email)) {
            return Err(LedgerError::BadRequest(format!(
                "{} already has a pending invite",
                email
            )));
        }

        let now = now_millis();
        let id = Uuid::new_v4();
        pending.push(MembershipRecord {
            id,
            vault_id,
            owner,
            address: None,
            email: Some(email.to_string()),
            status: MembershipStatus::Pending,
            role,
            data: Vec::new(),
            created_at: now,
            updated_at: now,
        });
        tracing::info!(
            "pending invite {} for {} in vault {} ({} message)",
            id,
            email,
            vault_id,
            if message.is_some() { "with" } else { "no" }
        );
        Ok(id)
    }
}

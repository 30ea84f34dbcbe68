use std::sync::Arc;

use uuid::Uuid;

use super::base::{fetch_state, upload_state, ServiceContext, VaultContext};
use super::tags::ActionRef;
use super::{ServiceError, Updated};
use crate::client::ClientInner;
use crate::crypto::KeySet;
use crate::ledger::{ContractFunction, ContractInput, Transaction, VaultRecord};
use crate::types::{MembershipState, ObjectType, Role, Vault, VaultAction, VaultState};

#[derive(Debug, Clone, Default)]
pub struct VaultCreateOptions {
    /// Public vaults store everything in plaintext and carry no keys
    pub public: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VaultCreated {
    pub vault_id: Uuid,
    /// The creator's owner membership
    pub membership_id: Uuid,
    pub transaction_id: String,
    pub object: Vault,
}

fn merge(record: VaultRecord, state: VaultState) -> Vault {
    Vault {
        id: record.id,
        owner: record.owner,
        public: record.public,
        status: record.status,
        name: state.name,
        description: state.description,
        size: record.size,
        data: record.data,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn seal(ctx: &ServiceContext, state: &VaultState) -> Result<VaultState, ServiceError> {
    Ok(VaultState {
        name: ctx.process_write_string(&state.name)?,
        description: ctx.process_write_option(state.description.as_deref())?,
    })
}

fn open(ctx: &ServiceContext, state: &VaultState) -> Result<VaultState, ServiceError> {
    Ok(VaultState {
        name: ctx.process_read_string(&state.name)?,
        description: ctx.process_read_option(state.description.as_deref())?,
    })
}

#[derive(Debug, Clone)]
pub struct VaultService {
    client: Arc<ClientInner>,
}

impl VaultService {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self { client }
    }

    /// Create a vault and the creator's owner membership
    ///
    /// Private vaults get a fresh key set, wrapped for the creator and stored
    /// on the owner membership.
    pub async fn create(
        &self,
        name: impl Into<String>,
        options: VaultCreateOptions,
    ) -> Result<VaultCreated, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::BadRequest("vault name cannot be empty".to_string()));
        }
        let vault_id = Uuid::new_v4();
        let keys = if options.public {
            KeySet::default()
        } else {
            KeySet::generate()?
        };
        let keys = Arc::new(keys);
        let address = self.client.wallet.address();

        let mut ctx = ServiceContext::new(vault_id, options.public, keys.clone(), ObjectType::Vault);
        ctx.set_object(vault_id, None);
        ctx.set_action(ContractFunction::VaultInit, ActionRef::VaultCreate);
        let state = VaultState {
            name,
            description: options.description,
        };
        let state_id = upload_state(&self.client, &seal(&ctx, &state)?).await?;
        let receipt = self
            .client
            .ledger
            .post_contract_transaction(
                vault_id,
                ContractInput::new(ContractFunction::VaultInit).with_data(state_id),
                ctx.transaction_tags(&self.client.config, &address)?,
            )
            .await?;
        let record = receipt.object.into_vault()?;

        let membership_id = Uuid::new_v4();
        let mut member_ctx =
            ServiceContext::new(vault_id, options.public, keys.clone(), ObjectType::Membership);
        member_ctx.set_object(membership_id, None);
        member_ctx.set_action(ContractFunction::MembershipAdd, ActionRef::MembershipOwner);
        let public_key = self.client.wallet.public_key();
        let membership = MembershipState {
            keys: keys.wrap_for(&public_key)?,
            public_key: Some(public_key),
            public_signing_key: Some(self.client.wallet.public_signing_key()),
            member_details: Default::default(),
        };
        let membership_state = upload_state(&self.client, &membership).await?;
        self.client
            .ledger
            .post_contract_transaction(
                vault_id,
                ContractInput::new(ContractFunction::MembershipAdd)
                    .with_data(membership_state)
                    .with_role(Role::Owner)
                    .with_address(address.clone()),
                member_ctx.transaction_tags(&self.client.config, &address)?,
            )
            .await?;

        tracing::info!(
            "created {} vault {} (tx {})",
            if options.public { "public" } else { "private" },
            vault_id,
            receipt.id
        );
        Ok(VaultCreated {
            vault_id,
            membership_id,
            transaction_id: receipt.id,
            object: merge(record, state),
        })
    }

    async fn load(&self, vault: &VaultContext) -> Result<(ServiceContext, VaultState), ServiceError> {
        let ctx = ServiceContext::for_vault(vault, ObjectType::Vault);
        let state_id = vault
            .vault
            .data
            .last()
            .ok_or_else(|| ServiceError::NotFound(format!("state of vault {}", vault.id())))?;
        let sealed: VaultState = fetch_state(&self.client, state_id).await?;
        let state = open(&ctx, &sealed)?;
        Ok((ctx, state))
    }

    async fn transition(
        &self,
        id: Uuid,
        action: VaultAction,
        action_ref: ActionRef,
        patch: Option<Box<dyn FnOnce(&mut VaultState) + Send>>,
    ) -> Result<Updated<Vault>, ServiceError> {
        let vault = VaultContext::load(&self.client, id).await?;
        vault.vault.status.transition(action)?;
        let (mut ctx, mut state) = self.load(&vault).await?;

        let function = match action {
            VaultAction::Update => ContractFunction::VaultUpdate,
            VaultAction::Archive => ContractFunction::VaultArchive,
            VaultAction::Restore => ContractFunction::VaultRestore,
            VaultAction::Delete => ContractFunction::VaultDelete,
        };
        ctx.set_object(id, vault.vault.data.last().cloned());
        ctx.set_action(function, action_ref);

        let mut input = ContractInput::new(function);
        if let Some(patch) = patch {
            patch(&mut state);
            input = input.with_data(upload_state(&self.client, &seal(&ctx, &state)?).await?);
        }
        let receipt = self
            .client
            .ledger
            .post_contract_transaction(
                id,
                input,
                ctx.transaction_tags(&self.client.config, &self.client.wallet.address())?,
            )
            .await?;
        tracing::debug!("{} on vault {} (tx {})", action_ref, id, receipt.id);

        Ok(Updated {
            transaction_id: receipt.id,
            object: merge(receipt.object.into_vault()?, state),
        })
    }

    pub async fn rename(
        &self,
        id: Uuid,
        name: impl Into<String>,
    ) -> Result<Updated<Vault>, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::BadRequest("vault name cannot be empty".to_string()));
        }
        let patch = Box::new(move |state: &mut VaultState| state.name = name);
        self.transition(id, VaultAction::Update, ActionRef::VaultRename, Some(patch))
            .await
    }

    /// Make the vault read-only, until restored
    pub async fn archive(&self, id: Uuid) -> Result<Updated<Vault>, ServiceError> {
        self.transition(id, VaultAction::Archive, ActionRef::VaultArchive, None)
            .await
    }

    pub async fn restore(&self, id: Uuid) -> Result<Updated<Vault>, ServiceError> {
        self.transition(id, VaultAction::Restore, ActionRef::VaultRestore, None)
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Updated<Vault>, ServiceError> {
        self.transition(id, VaultAction::Delete, ActionRef::VaultDelete, None)
            .await
    }

    pub async fn get(&self, id: Uuid) -> Result<Vault, ServiceError> {
        let vault = VaultContext::load(&self.client, id).await?;
        let (_, state) = self.load(&vault).await?;
        Ok(merge(vault.vault, state))
    }

    /// Every transaction of the vault, in ledger order
    pub async fn history(&self, id: Uuid) -> Result<Vec<Transaction>, ServiceError> {
        Ok(self.client.ledger.get_transactions(id).await?)
    }
}

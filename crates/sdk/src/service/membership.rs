use std::sync::Arc;

use uuid::Uuid;

use super::base::{fetch_state, upload_state, ServiceContext, VaultContext};
use super::tags::ActionRef;
use super::{ServiceError, Updated};
use crate::client::ClientInner;
use crate::crypto::KeySet;
use crate::ledger::{
    tag_names, ContractFunction, ContractInput, MembershipRecord, Tags, Transaction,
    TransactionReceipt, UserPublicData,
};
use crate::types::{MemberDetails, Membership, MembershipAction, MembershipState, ObjectType, Role};

/// Outcome of an invite
///
/// Invites of users without an account are kept by the backend until they
/// sign up, no transaction is posted for them.
#[derive(Debug, Clone)]
pub struct MembershipInvited {
    pub membership_id: Uuid,
    pub transaction_id: Option<String>,
    pub email: String,
}

fn merge(record: MembershipRecord, details: MemberDetails) -> Membership {
    Membership {
        id: record.id,
        vault_id: record.vault_id,
        owner: record.owner,
        address: record.address,
        email: record.email,
        status: record.status,
        role: record.role,
        member_details: details,
        data: record.data,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// A live membership other than `skip` held by `email` or `address`
fn find_member<'a>(
    members: &'a [MembershipRecord],
    skip: Option<Uuid>,
    email: &str,
    address: Option<&str>,
) -> Option<&'a MembershipRecord> {
    members.iter().find(|m| {
        Some(m.id) != skip
            && m.status.is_active_or_pending()
            && (m.email.as_deref() == Some(email)
                || (address.is_some() && m.address.as_deref() == address))
    })
}

fn already_invited(email: &str, existing: &MembershipRecord) -> ServiceError {
    ServiceError::BadRequest(format!(
        "{} already holds membership {} ({:?})",
        email, existing.id, existing.status
    ))
}

fn function_for(action: MembershipAction) -> ContractFunction {
    match action {
        MembershipAction::Confirm => ContractFunction::MembershipConfirm,
        MembershipAction::Accept => ContractFunction::MembershipAccept,
        MembershipAction::Reject => ContractFunction::MembershipReject,
        MembershipAction::Revoke => ContractFunction::MembershipRevoke,
        MembershipAction::Restore => ContractFunction::MembershipRestore,
        MembershipAction::ChangeRole => ContractFunction::MembershipChangeRole,
        MembershipAction::Update => ContractFunction::MembershipUpdate,
    }
}

#[derive(Debug, Clone)]
pub struct MembershipService {
    client: Arc<ClientInner>,
}

impl MembershipService {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self { client }
    }

    /// Vault record without keys, enough to tag a transaction that carries no sealed data
    async fn keyless_vault(&self, vault_id: Uuid) -> Result<VaultContext, ServiceError> {
        let vault = self.client.ledger.get_vault(vault_id).await?;
        Ok(VaultContext::new(vault, KeySet::default()))
    }

    pub async fn invite(
        &self,
        vault_id: Uuid,
        email: &str,
        role: Role,
        message: Option<String>,
    ) -> Result<MembershipInvited, ServiceError> {
        let vault = VaultContext::load(&self.client, vault_id).await?;
        let members = self.client.ledger.get_members(vault_id).await?;
        self.invite_one(&vault, &members, email, role, message, None)
            .await
    }

    /// Invite one identity, checking it against the vault's current members
    ///
    /// Registered users get the vault keys wrapped for their public key and a
    /// `membership:invite` transaction. Anyone else is handed to the backend
    /// as a pending invite, which the owner completes with [`Self::confirm`]
    /// once they sign up.
    pub(crate) async fn invite_one(
        &self,
        vault: &VaultContext,
        members: &[MembershipRecord],
        email: &str,
        role: Role,
        message: Option<String>,
        group_ref: Option<Uuid>,
    ) -> Result<MembershipInvited, ServiceError> {
        if let Some(existing) = find_member(members, None, email, None) {
            return Err(already_invited(email, existing));
        }

        if !self.client.ledger.exists_user(email).await? {
            let membership_id = self
                .client
                .ledger
                .invite_new_user(vault.id(), email, role, message)
                .await?;
            tracing::info!("invited unregistered {} to vault {}", email, vault.id());
            return Ok(MembershipInvited {
                membership_id,
                transaction_id: None,
                email: email.to_string(),
            });
        }

        let user = self.client.ledger.get_user_public_data(email).await?;
        if let Some(existing) = find_member(members, None, email, Some(&user.address)) {
            return Err(already_invited(email, existing));
        }

        let membership_id = Uuid::new_v4();
        let receipt = self
            .post_wrapped_keys(
                vault,
                membership_id,
                &user,
                role,
                (ContractFunction::MembershipInvite, ActionRef::MembershipInvite),
                group_ref,
            )
            .await?;
        tracing::info!(
            "invited {} to vault {} as {} (tx {})",
            user.address,
            vault.id(),
            role,
            receipt.id
        );

        Ok(MembershipInvited {
            membership_id,
            transaction_id: Some(receipt.id),
            email: email.to_string(),
        })
    }

    /// Wrap the vault keys for `user`, upload them and post `function` for the membership
    async fn post_wrapped_keys(
        &self,
        vault: &VaultContext,
        membership_id: Uuid,
        user: &UserPublicData,
        role: Role,
        (function, action_ref): (ContractFunction, ActionRef),
        group_ref: Option<Uuid>,
    ) -> Result<TransactionReceipt, ServiceError> {
        let mut ctx = ServiceContext::for_vault(vault, ObjectType::Membership);
        ctx.set_object(membership_id, None);
        ctx.set_action(function, action_ref);
        ctx.set_group_ref(group_ref);
        ctx.add_tags(Tags::new().with(tag_names::MEMBER_ADDRESS, user.address.clone()));

        let state = MembershipState {
            keys: vault.keys.wrap_for(&user.public_key)?,
            public_key: Some(user.public_key),
            public_signing_key: Some(user.public_signing_key),
            member_details: MemberDetails::default(),
        };
        let state_id = upload_state(&self.client, &state).await?;
        let input = ContractInput::new(function)
            .with_data(state_id)
            .with_role(role)
            .with_address(user.address.clone());
        let tags = ctx.transaction_tags(&self.client.config, &self.client.wallet.address())?;
        Ok(self
            .client
            .ledger
            .post_contract_transaction(vault.id(), input, tags)
            .await?)
    }

    /// Complete the invite of a user who signed up after being invited
    ///
    /// Wraps the vault keys for the new account and turns the backend's pending
    /// invite into an accepted membership. Only the vault owner can confirm.
    pub async fn confirm(&self, id: Uuid) -> Result<Updated<MembershipRecord>, ServiceError> {
        let record = self.client.ledger.get_membership(id).await?;
        let email = match (&record.email, &record.address) {
            (Some(email), None) => email.clone(),
            _ => {
                return Err(ServiceError::BadRequest(format!(
                    "membership {} is not a pending invite",
                    id
                )))
            }
        };
        record.status.transition(MembershipAction::Confirm)?;

        let vault = VaultContext::load(&self.client, record.vault_id).await?;
        if !self.client.ledger.exists_user(&email).await? {
            return Err(ServiceError::BadRequest(format!(
                "{} has not signed up yet",
                email
            )));
        }
        let user = self.client.ledger.get_user_public_data(&email).await?;
        let members = self.client.ledger.get_members(record.vault_id).await?;
        if let Some(existing) = find_member(&members, Some(id), &email, Some(&user.address)) {
            return Err(already_invited(&email, existing));
        }

        let receipt = self
            .post_wrapped_keys(
                &vault,
                id,
                &user,
                record.role,
                (ContractFunction::MembershipConfirm, ActionRef::MembershipConfirm),
                None,
            )
            .await?;
        tracing::info!(
            "confirmed {} in vault {} (tx {})",
            user.address,
            record.vault_id,
            receipt.id
        );
        Ok(Updated {
            transaction_id: receipt.id,
            object: receipt.object.into_membership()?,
        })
    }

    async fn transition(
        &self,
        vault: Option<&VaultContext>,
        id: Uuid,
        action: MembershipAction,
        action_ref: ActionRef,
        input: ContractInput,
        group_ref: Option<Uuid>,
    ) -> Result<Updated<MembershipRecord>, ServiceError> {
        let record = self.client.ledger.get_membership(id).await?;
        if record.address.is_none() {
            return Err(ServiceError::BadRequest(format!(
                "membership {} is waiting for the owner to confirm it",
                id
            )));
        }
        record.status.transition(action)?;
        let vault = match vault {
            Some(vault) if vault.id() == record.vault_id => vault.clone(),
            Some(vault) => {
                return Err(ServiceError::BadRequest(format!(
                    "membership {} is not in vault {}",
                    id,
                    vault.id()
                )))
            }
            None => self.keyless_vault(record.vault_id).await?,
        };

        let mut ctx = ServiceContext::for_vault(&vault, ObjectType::Membership);
        ctx.set_object(id, record.data.last().cloned());
        ctx.set_action(function_for(action), action_ref);
        ctx.set_group_ref(group_ref);
        let tags = ctx.transaction_tags(&self.client.config, &self.client.wallet.address())?;

        let receipt = self
            .client
            .ledger
            .post_contract_transaction(record.vault_id, input, tags)
            .await?;
        tracing::debug!("{} on membership {} (tx {})", action_ref, id, receipt.id);
        Ok(Updated {
            transaction_id: receipt.id,
            object: receipt.object.into_membership()?,
        })
    }

    async fn simple(
        &self,
        id: Uuid,
        action: MembershipAction,
        action_ref: ActionRef,
    ) -> Result<Updated<MembershipRecord>, ServiceError> {
        let input = ContractInput::new(function_for(action));
        self.transition(None, id, action, action_ref, input, None)
            .await
    }

    /// Accept an invite addressed to this client
    pub async fn accept(&self, id: Uuid) -> Result<Updated<MembershipRecord>, ServiceError> {
        self.simple(id, MembershipAction::Accept, ActionRef::MembershipAccept)
            .await
    }

    pub async fn reject(&self, id: Uuid) -> Result<Updated<MembershipRecord>, ServiceError> {
        self.simple(id, MembershipAction::Reject, ActionRef::MembershipReject)
            .await
    }

    /// Revoke a member's access, the vault keys are not rotated
    pub async fn revoke(&self, id: Uuid) -> Result<Updated<MembershipRecord>, ServiceError> {
        self.simple(id, MembershipAction::Revoke, ActionRef::MembershipRevoke)
            .await
    }

    pub async fn restore(&self, id: Uuid) -> Result<Updated<MembershipRecord>, ServiceError> {
        self.simple(id, MembershipAction::Restore, ActionRef::MembershipRestore)
            .await
    }

    pub async fn change_role(
        &self,
        id: Uuid,
        role: Role,
    ) -> Result<Updated<MembershipRecord>, ServiceError> {
        self.change_role_in(None, id, role, None).await
    }

    pub(crate) async fn change_role_in(
        &self,
        vault: Option<&VaultContext>,
        id: Uuid,
        role: Role,
        group_ref: Option<Uuid>,
    ) -> Result<Updated<MembershipRecord>, ServiceError> {
        let input = ContractInput::new(ContractFunction::MembershipChangeRole).with_role(role);
        self.transition(
            vault,
            id,
            MembershipAction::ChangeRole,
            ActionRef::MembershipChangeRole,
            input,
            group_ref,
        )
        .await
    }

    /// Set the member's display name, sealed with the vault keys
    pub async fn update_profile(
        &self,
        id: Uuid,
        name: impl Into<String>,
    ) -> Result<Updated<Membership>, ServiceError> {
        let name = name.into();
        let record = self.client.ledger.get_membership(id).await?;
        let vault = VaultContext::load(&self.client, record.vault_id).await?;
        let ctx = ServiceContext::for_vault(&vault, ObjectType::Membership);

        let mut state: MembershipState = match record.data.last() {
            Some(state_id) => fetch_state(&self.client, state_id).await?,
            None => MembershipState::default(),
        };
        state.member_details.name = Some(ctx.process_write_string(&name)?);
        let state_id = upload_state(&self.client, &state).await?;

        let input = ContractInput::new(ContractFunction::MembershipUpdate).with_data(state_id);
        let updated = self
            .transition(
                Some(&vault),
                id,
                MembershipAction::Update,
                ActionRef::MembershipProfileUpdate,
                input,
                None,
            )
            .await?;
        Ok(Updated {
            transaction_id: updated.transaction_id,
            object: merge(updated.object, MemberDetails { name: Some(name) }),
        })
    }

    async fn open(
        &self,
        ctx: Option<&ServiceContext>,
        record: MembershipRecord,
    ) -> Result<Membership, ServiceError> {
        let details = match (ctx, record.data.last()) {
            (Some(ctx), Some(state_id)) => {
                let state: MembershipState = fetch_state(&self.client, state_id).await?;
                MemberDetails {
                    name: ctx.process_read_option(state.member_details.name.as_deref())?,
                }
            }
            _ => MemberDetails::default(),
        };
        Ok(merge(record, details))
    }

    /// A membership with its profile opened when the caller holds the vault keys
    pub async fn get(&self, id: Uuid) -> Result<Membership, ServiceError> {
        let record = self.client.ledger.get_membership(id).await?;
        let ctx = match VaultContext::load(&self.client, record.vault_id).await {
            Ok(vault) => Some(ServiceContext::for_vault(&vault, ObjectType::Membership)),
            Err(ServiceError::NotFound(_)) => None,
            Err(err) => return Err(err),
        };
        self.open(ctx.as_ref(), record).await
    }

    /// Every membership of the vault, pending invites included
    pub async fn list(&self, vault_id: Uuid) -> Result<Vec<Membership>, ServiceError> {
        let vault = VaultContext::load(&self.client, vault_id).await?;
        let ctx = ServiceContext::for_vault(&vault, ObjectType::Membership);
        let records = self.client.ledger.get_members(vault_id).await?;

        let mut members = Vec::with_capacity(records.len());
        for record in records {
            members.push(self.open(Some(&ctx), record).await?);
        }
        Ok(members)
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<Transaction>, ServiceError> {
        let record = self.client.ledger.get_membership(id).await?;
        let transactions = self.client.ledger.get_transactions(record.vault_id).await?;
        Ok(transactions
            .into_iter()
            .filter(|tx| tx.object_id() == Some(id))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::MembershipStatus;

    #[test]
    fn test_actions_map_to_functions() {
        assert_eq!(
            function_for(MembershipAction::ChangeRole).as_str(),
            "membership:change-role"
        );
        assert_eq!(function_for(MembershipAction::Update).as_str(), "membership:update");
        assert_eq!(function_for(MembershipAction::Accept).as_str(), "membership:accept");
    }

    #[test]
    fn test_merge_keeps_record_fields() {
        let record = MembershipRecord {
            id: Uuid::new_v4(),
            vault_id: Uuid::new_v4(),
            owner: "owner".to_string(),
            address: None,
            email: Some("new@example.com".to_string()),
            status: MembershipStatus::Pending,
            role: Role::Viewer,
            data: Vec::new(),
            created_at: 1,
            updated_at: 2,
        };
        let membership = merge(record.clone(), MemberDetails::default());
        assert_eq!(membership.id, record.id);
        assert_eq!(membership.status, MembershipStatus::Pending);
        assert_eq!(membership.email, record.email);
        assert!(membership.member_details.name.is_none());
    }
}

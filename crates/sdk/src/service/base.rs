use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::tags::{build_tags, ActionRef, TagParams};
use super::ServiceError;
use crate::client::ClientInner;
use crate::config::Config;
use crate::crypto::KeySet;
use crate::ledger::{ContractFunction, Tags, VaultRecord};
use crate::types::ObjectType;

/// A vault and the keys to work in it, fetched once and shared read-only
///
/// Batch operations load this once and hand it to every item.
#[derive(Debug, Clone)]
pub struct VaultContext {
    pub vault: VaultRecord,
    pub keys: Arc<KeySet>,
}

impl VaultContext {
    pub fn new(vault: VaultRecord, keys: KeySet) -> Self {
        Self {
            vault,
            keys: Arc::new(keys),
        }
    }

    pub fn id(&self) -> Uuid {
        self.vault.id
    }

    pub fn is_public(&self) -> bool {
        self.vault.public
    }

    /// Fetch the vault and unwrap the caller's keys for it
    pub(crate) async fn load(client: &ClientInner, vault_id: Uuid) -> Result<Self, ServiceError> {
        let vault = client.ledger.get_vault(vault_id).await?;
        let keys = if vault.public {
            KeySet::default()
        } else {
            let address = client.wallet.address();
            let membership_keys = client
                .ledger
                .get_membership_keys(vault_id, &address)
                .await?;
            client.wallet.unwrap_keys(&membership_keys.keys)?
        };
        tracing::debug!(
            "loaded vault {} (public: {}, key generations: {})",
            vault_id,
            vault.public,
            keys.secrets().len()
        );
        Ok(Self::new(vault, keys))
    }
}

/// Per-operation working state
///
/// Every operation, and every item of a batch, gets its own context. Only the
/// key set is shared, and only for reading.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    vault_id: Uuid,
    is_public: bool,
    keys: Arc<KeySet>,
    object_type: ObjectType,
    object_id: Option<Uuid>,
    function: Option<ContractFunction>,
    action_ref: Option<ActionRef>,
    group_ref: Option<Uuid>,
    tags: Tags,
    previous_state: Option<String>,
}

impl ServiceContext {
    pub fn new(vault_id: Uuid, is_public: bool, keys: Arc<KeySet>, object_type: ObjectType) -> Self {
        Self {
            vault_id,
            is_public,
            keys,
            object_type,
            object_id: None,
            function: None,
            action_ref: None,
            group_ref: None,
            tags: Tags::new(),
            previous_state: None,
        }
    }

    pub fn for_vault(vault: &VaultContext, object_type: ObjectType) -> Self {
        Self::new(vault.id(), vault.is_public(), vault.keys.clone(), object_type)
    }

    pub fn vault_id(&self) -> Uuid {
        self.vault_id
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn object_id(&self) -> Option<Uuid> {
        self.object_id
    }

    pub fn previous_state(&self) -> Option<&str> {
        self.previous_state.as_deref()
    }

    pub fn set_object(&mut self, object_id: Uuid, previous_state: Option<String>) {
        self.object_id = Some(object_id);
        self.previous_state = previous_state;
    }

    pub fn set_action(&mut self, function: ContractFunction, action_ref: ActionRef) {
        self.function = Some(function);
        self.action_ref = Some(action_ref);
    }

    pub fn set_group_ref(&mut self, group_ref: Option<Uuid>) {
        self.group_ref = group_ref;
    }

    pub fn add_tags(&mut self, tags: Tags) {
        self.tags.extend(tags);
    }

    /// Seal a string for storage, a no-op in public vaults
    ///
    /// Empty strings stay empty so optional fields remain recognizable.
    pub fn process_write_string(&self, plain: &str) -> Result<String, ServiceError> {
        if self.is_public || plain.is_empty() {
            return Ok(plain.to_string());
        }
        Ok(self.keys.encrypt_string(plain)?)
    }

    /// Open a sealed string, a no-op in public vaults
    ///
    /// # Errors
    ///
    /// [`ServiceError::IncorrectEncryptionKey`] when the loaded keys cannot open the value.
    pub fn process_read_string(&self, value: &str) -> Result<String, ServiceError> {
        if self.is_public || value.is_empty() {
            return Ok(value.to_string());
        }
        Ok(self.keys.decrypt_string(value)?)
    }

    pub fn process_write_bytes(&self, plain: Bytes) -> Result<Bytes, ServiceError> {
        if self.is_public {
            return Ok(plain);
        }
        Ok(Bytes::from(self.keys.encrypt(&plain)?))
    }

    pub fn process_read_bytes(&self, value: Bytes) -> Result<Bytes, ServiceError> {
        if self.is_public {
            return Ok(value);
        }
        Ok(Bytes::from(self.keys.decrypt(&value)?))
    }

    pub fn process_write_option(&self, plain: Option<&str>) -> Result<Option<String>, ServiceError> {
        plain.map(|p| self.process_write_string(p)).transpose()
    }

    pub fn process_read_option(&self, value: Option<&str>) -> Result<Option<String>, ServiceError> {
        value.map(|v| self.process_read_string(v)).transpose()
    }

    /// Tags for the transaction this context is about to post
    pub fn transaction_tags(&self, config: &Config, signer: &str) -> Result<Tags, ServiceError> {
        let (function, action_ref) = match (self.function, self.action_ref) {
            (Some(function), Some(action_ref)) => (function, action_ref),
            _ => {
                return Err(ServiceError::Default(anyhow::anyhow!(
                    "no action set on the {} context",
                    self.object_type
                )))
            }
        };
        Ok(build_tags(TagParams {
            protocol_name: &config.protocol_name,
            protocol_version: &config.protocol_version,
            function,
            action_ref,
            vault_id: self.vault_id,
            object_id: self.object_id,
            object_type: self.object_type,
            signer,
            public: self.is_public,
            group_ref: self.group_ref,
            extra: &self.tags,
        }))
    }
}

/// Serialize and upload a state blob, returning its content id
pub(crate) async fn upload_state<T: Serialize>(
    client: &ClientInner,
    state: &T,
) -> Result<String, ServiceError> {
    let data = serde_json::to_vec(state)?;
    let id = client.storage.upload_state(Bytes::from(data)).await?;
    tracing::debug!("uploaded state {}", id);
    Ok(id)
}

/// Download and parse a state blob
pub(crate) async fn fetch_state<T: DeserializeOwned>(
    client: &ClientInner,
    state_id: &str,
) -> Result<T, ServiceError> {
    let value = client.storage.get_node_state(state_id).await?;
    Ok(serde_json::from_value(value)?)
}

/// Group reference for a logical operation spanning `items` transactions
pub(crate) fn group_ref_for(items: usize) -> Option<Uuid> {
    (items > 1).then(Uuid::new_v4)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ledger::tag_names;

    fn context(public: bool, keys: KeySet) -> ServiceContext {
        ServiceContext::new(Uuid::new_v4(), public, Arc::new(keys), ObjectType::Folder)
    }

    #[test]
    fn test_private_roundtrip() {
        let ctx = context(false, KeySet::generate().unwrap());
        let sealed = ctx.process_write_string("Docs").unwrap();
        assert_ne!(sealed, "Docs");
        assert_eq!(ctx.process_read_string(&sealed).unwrap(), "Docs");
    }

    #[test]
    fn test_wrong_keys_are_distinguished() {
        let writer = context(false, KeySet::generate().unwrap());
        let reader = context(false, KeySet::generate().unwrap());
        let sealed = writer.process_write_string("Docs").unwrap();

        assert!(matches!(
            reader.process_read_string(&sealed),
            Err(ServiceError::IncorrectEncryptionKey)
        ));
    }

    #[test]
    fn test_public_is_identity() {
        let ctx = context(true, KeySet::default());
        for value in ["Docs", "", "ünïcode ✓"] {
            assert_eq!(ctx.process_write_string(value).unwrap(), value);
            assert_eq!(ctx.process_read_string(value).unwrap(), value);
        }
        let bytes = Bytes::from_static(b"raw");
        assert_eq!(ctx.process_write_bytes(bytes.clone()).unwrap(), bytes);
    }

    #[test]
    fn test_tags_require_an_action() {
        let mut ctx = context(false, KeySet::generate().unwrap());
        assert!(ctx.transaction_tags(&Config::default(), "me").is_err());

        let object = Uuid::new_v4();
        ctx.set_object(object, None);
        ctx.set_action(ContractFunction::NodeCreate, ActionRef::FolderCreate);
        ctx.set_group_ref(Some(Uuid::new_v4()));
        let tags = ctx.transaction_tags(&Config::default(), "me").unwrap();

        assert_eq!(tags.get(tag_names::FUNCTION_NAME), Some("node:create"));
        assert_eq!(tags.get(tag_names::OBJECT_ID), Some(object.to_string().as_str()));
        assert_eq!(tags.get(tag_names::SIGNER_ADDRESS), Some("me"));
        assert!(tags.get(tag_names::GROUP_REF).is_some());
    }

    #[test]
    fn test_group_ref_only_for_many() {
        assert!(group_ref_for(0).is_none());
        assert!(group_ref_for(1).is_none());
        assert!(group_ref_for(2).is_some());
    }
}

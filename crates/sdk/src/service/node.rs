use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::base::{fetch_state, upload_state, ServiceContext, VaultContext};
use super::tags::ActionRef;
use super::{NodeCreated, ServiceError, Updated};
use crate::client::ClientInner;
use crate::crypto::KeySet;
use crate::ledger::{ContractFunction, ContractInput, NodeRecord, Tags, Transaction};
use crate::storage::StorageGateway;
use crate::types::{Node, NodeAction, NodeKind, NodeState, NodeStatus, ObjectType};

/// Lifecycle operations every node kind may support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOp {
    Create,
    Rename,
    Move,
    Revoke,
    Restore,
    Delete,
}

/// A change to a node's state
pub enum NodePatch<V> {
    Rename(String),
    /// Add a new version at the end of the history
    AppendVersion(V),
    /// Edit fields of the current version in place
    EditLatest(Box<dyn FnOnce(&mut V) -> Result<(), ServiceError> + Send>),
}

impl<V> fmt::Debug for NodePatch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePatch::Rename(name) => f.debug_tuple("Rename").field(name).finish(),
            NodePatch::AppendVersion(_) => f.write_str("AppendVersion"),
            NodePatch::EditLatest(_) => f.write_str("EditLatest"),
        }
    }
}

impl<V: Clone> NodePatch<V> {
    pub fn edit_latest<F>(edit: F) -> Self
    where
        F: FnOnce(&mut V) -> Result<(), ServiceError> + Send + 'static,
    {
        NodePatch::EditLatest(Box::new(edit))
    }

    /// Apply to a copy of `state`, the original is left as it was
    pub fn apply(self, state: &NodeState<V>) -> Result<NodeState<V>, ServiceError> {
        let mut next = state.clone();
        match self {
            NodePatch::Rename(name) => {
                if name.trim().is_empty() {
                    return Err(ServiceError::BadRequest("name cannot be empty".to_string()));
                }
                next.name = name;
            }
            NodePatch::AppendVersion(version) => next.versions.push(version),
            NodePatch::EditLatest(edit) => {
                let latest = next
                    .versions
                    .last_mut()
                    .ok_or_else(|| ServiceError::NotFound("latest version".to_string()))?;
                edit(latest)?;
            }
        }
        Ok(next)
    }

    pub(crate) fn unsupported(self, object_type: ObjectType) -> ServiceError {
        ServiceError::BadRequest(format!("{:?} is not supported on a {}", self, object_type))
    }
}

/// The capabilities that set one node kind apart from another
#[async_trait]
pub trait NodeModel: Send + Sync + Sized + 'static {
    const KIND: NodeKind;
    const OBJECT_TYPE: ObjectType;

    type Version: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;
    /// What callers get back
    type View: Send + 'static;

    fn action_ref(op: NodeOp) -> Option<ActionRef>;

    /// Rebuild a version with every confidential string passed through `f`
    fn map_strings(
        version: &Self::Version,
        f: &dyn Fn(&str) -> Result<String, ServiceError>,
    ) -> Result<Self::Version, ServiceError>;

    /// Next state from the current one, which must stay untouched
    fn apply_patch(
        state: &NodeState<Self::Version>,
        patch: NodePatch<Self::Version>,
    ) -> Result<NodeState<Self::Version>, ServiceError>;

    /// Seal `after`, an edit of `before` whose sealed form is `sealed`
    fn reseal(
        _sealed: &Self::Version,
        _before: &Self::Version,
        after: &Self::Version,
        f: &dyn Fn(&str) -> Result<String, ServiceError>,
    ) -> Result<Self::Version, ServiceError> {
        Self::map_strings(after, f)
    }

    fn validate_transition(status: NodeStatus, action: NodeAction) -> Result<NodeStatus, ServiceError> {
        Ok(status.transition(action)?)
    }

    /// Whether an opened node of the stored kind belongs to this model's listings
    fn includes(_state: &NodeState<Self::Version>) -> bool {
        true
    }

    /// Shape a node for the caller; `opened` tells whether its strings are plaintext
    async fn present(
        storage: &dyn StorageGateway,
        ctx: &ServiceContext,
        node: Node<Self::Version>,
        opened: bool,
    ) -> Result<Self::View, ServiceError>;
}

fn seal_state<M: NodeModel>(
    ctx: &ServiceContext,
    state: &NodeState<M::Version>,
) -> Result<NodeState<M::Version>, ServiceError> {
    let seal = |value: &str| ctx.process_write_string(value);
    Ok(NodeState {
        name: seal(&state.name)?,
        versions: state
            .versions
            .iter()
            .map(|version| M::map_strings(version, &seal))
            .collect::<Result<_, _>>()?,
        tags: state.tags.clone(),
    })
}

/// Plaintext equality through the serialized form
pub(crate) fn unchanged<T: Serialize>(a: &T, b: &T) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Seal the parts of `next` that differ from `current`, whose sealed form is
/// `sealed`; everything else is carried over as stored.
fn reseal_state<M: NodeModel>(
    ctx: &ServiceContext,
    sealed: &NodeState<M::Version>,
    current: &NodeState<M::Version>,
    next: &NodeState<M::Version>,
) -> Result<NodeState<M::Version>, ServiceError> {
    let seal = |value: &str| ctx.process_write_string(value);
    let name = if next.name == current.name {
        sealed.name.clone()
    } else {
        seal(&next.name)?
    };
    let mut versions = Vec::with_capacity(next.versions.len());
    for (index, version) in next.versions.iter().enumerate() {
        let resealed = match (sealed.versions.get(index), current.versions.get(index)) {
            (Some(kept), Some(before)) if unchanged(before, version) => kept.clone(),
            (Some(kept), Some(before)) => M::reseal(kept, before, version, &seal)?,
            _ => M::map_strings(version, &seal)?,
        };
        versions.push(resealed);
    }
    Ok(NodeState {
        name,
        versions,
        tags: next.tags.clone(),
    })
}

fn open_state<M: NodeModel>(
    ctx: &ServiceContext,
    state: &NodeState<M::Version>,
) -> Result<NodeState<M::Version>, ServiceError> {
    let open = |value: &str| ctx.process_read_string(value);
    Ok(NodeState {
        name: open(&state.name)?,
        versions: state
            .versions
            .iter()
            .map(|version| M::map_strings(version, &open))
            .collect::<Result<_, _>>()?,
        tags: state.tags.clone(),
    })
}

fn node_context<M: NodeModel>(vault: &VaultContext, record: &NodeRecord) -> ServiceContext {
    let mut ctx = ServiceContext::for_vault(vault, M::OBJECT_TYPE);
    ctx.set_object(record.id, record.current_data().map(str::to_string));
    ctx
}

fn merge<V>(record: NodeRecord, state: NodeState<V>) -> Node<V> {
    Node {
        id: record.id,
        vault_id: record.vault_id,
        kind: record.kind,
        owner: record.owner,
        parent_id: record.parent_id,
        status: record.status,
        name: state.name,
        versions: state.versions,
        tags: state.tags,
        data: record.data,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn function_for(action: NodeAction) -> ContractFunction {
    match action {
        NodeAction::Update => ContractFunction::NodeUpdate,
        NodeAction::Move => ContractFunction::NodeMove,
        NodeAction::Revoke => ContractFunction::NodeRevoke,
        NodeAction::Restore => ContractFunction::NodeRestore,
        NodeAction::Delete => ContractFunction::NodeDelete,
    }
}

/// A create whose state is uploaded and whose transaction is ready to post
pub(crate) struct PreparedCreate<V> {
    pub vault_id: Uuid,
    pub object_id: Uuid,
    pub input: ContractInput,
    pub tags: Tags,
    /// Plaintext state, handed back to the caller once posted
    pub state: NodeState<V>,
    pub ctx: ServiceContext,
}

/// One state transition of an existing node
pub(crate) struct Step<V> {
    pub action: NodeAction,
    pub action_ref: ActionRef,
    pub patch: Option<NodePatch<V>>,
    pub parent_id: Option<Uuid>,
    pub group_ref: Option<Uuid>,
    pub tags: Tags,
}

impl<V> Step<V> {
    pub fn new(action: NodeAction, action_ref: ActionRef) -> Self {
        Self {
            action,
            action_ref,
            patch: None,
            parent_id: None,
            group_ref: None,
            tags: Tags::new(),
        }
    }

    pub fn with_patch(mut self, patch: NodePatch<V>) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn with_parent(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_group_ref(mut self, group_ref: Option<Uuid>) -> Self {
        self.group_ref = group_ref;
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// Generic lifecycle engine shared by every node kind
pub struct NodeService<M: NodeModel> {
    client: Arc<ClientInner>,
    _model: PhantomData<M>,
}

impl<M: NodeModel> Clone for NodeService<M> {
    fn clone(&self) -> Self {
        Self::new(self.client.clone())
    }
}

impl<M: NodeModel> fmt::Debug for NodeService<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeService")
            .field("kind", &M::OBJECT_TYPE)
            .finish()
    }
}

impl<M: NodeModel> NodeService<M> {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self {
            client,
            _model: PhantomData,
        }
    }

    pub(crate) fn client(&self) -> &ClientInner {
        &self.client
    }

    pub(crate) async fn vault_context(&self, vault_id: Uuid) -> Result<VaultContext, ServiceError> {
        VaultContext::load(&self.client, vault_id).await
    }

    pub(crate) fn action(op: NodeOp) -> Result<ActionRef, ServiceError> {
        M::action_ref(op).ok_or_else(|| {
            ServiceError::BadRequest(format!("{:?} is not supported on a {}", op, M::OBJECT_TYPE))
        })
    }

    /// Seal and upload the initial state and build the create transaction
    pub(crate) async fn prepare_create(
        &self,
        vault: &VaultContext,
        state: NodeState<M::Version>,
        parent_id: Option<Uuid>,
        group_ref: Option<Uuid>,
        tags: Tags,
    ) -> Result<PreparedCreate<M::Version>, ServiceError> {
        let object_id = Uuid::new_v4();
        let mut ctx = ServiceContext::for_vault(vault, M::OBJECT_TYPE);
        ctx.set_object(object_id, None);
        ctx.set_action(ContractFunction::NodeCreate, Self::action(NodeOp::Create)?);
        ctx.set_group_ref(group_ref);
        ctx.add_tags(tags);

        let sealed = seal_state::<M>(&ctx, &state)?;
        let state_id = upload_state(&self.client, &sealed).await?;
        let input = ContractInput::new(ContractFunction::NodeCreate)
            .with_data(state_id)
            .with_parent_id(parent_id);
        let tags = ctx.transaction_tags(&self.client.config, &self.client.wallet.address())?;

        Ok(PreparedCreate {
            vault_id: vault.id(),
            object_id,
            input,
            tags,
            state,
            ctx,
        })
    }

    pub(crate) async fn post_create(
        &self,
        prepared: PreparedCreate<M::Version>,
    ) -> Result<NodeCreated<M::View>, ServiceError> {
        let receipt = self
            .client
            .ledger
            .post_contract_transaction(prepared.vault_id, prepared.input, prepared.tags)
            .await?;
        let record = receipt.object.into_node()?;
        tracing::info!(
            "created {} {} in vault {} (tx {})",
            M::OBJECT_TYPE,
            record.id,
            record.vault_id,
            receipt.id
        );

        let node = merge(record, prepared.state);
        let object = M::present(self.client.storage.as_ref(), &prepared.ctx, node, true).await?;
        Ok(NodeCreated {
            node_id: prepared.object_id,
            transaction_id: receipt.id,
            object,
        })
    }

    pub(crate) async fn create_node(
        &self,
        vault: &VaultContext,
        state: NodeState<M::Version>,
        parent_id: Option<Uuid>,
        tags: Tags,
    ) -> Result<NodeCreated<M::View>, ServiceError> {
        let prepared = self
            .prepare_create(vault, state, parent_id, None, tags)
            .await?;
        self.post_create(prepared).await
    }

    /// Ledger record and sealed current state
    pub(crate) async fn load(
        &self,
        id: Uuid,
    ) -> Result<(NodeRecord, NodeState<M::Version>), ServiceError> {
        let record = self.client.ledger.get_node(id, M::KIND).await?;
        let state_id = record
            .current_data()
            .ok_or_else(|| ServiceError::NotFound(format!("state of {}", id)))?;
        let state = fetch_state(&self.client, state_id).await?;
        Ok((record, state))
    }

    /// Run one transition against the node's current state
    ///
    /// `vault` is the shared context of a batch; single calls pass `None` and
    /// the context is loaded from the node's own vault.
    pub(crate) async fn update(
        &self,
        vault: Option<&VaultContext>,
        id: Uuid,
        step: Step<M::Version>,
    ) -> Result<Updated<M::View>, ServiceError> {
        let (record, sealed) = self.load(id).await?;
        let vault = match vault {
            Some(vault) if vault.id() == record.vault_id => vault.clone(),
            Some(vault) => {
                return Err(ServiceError::BadRequest(format!(
                    "{} {} is not in vault {}",
                    M::OBJECT_TYPE,
                    id,
                    vault.id()
                )))
            }
            None => self.vault_context(record.vault_id).await?,
        };
        M::validate_transition(record.status, step.action)?;

        let function = function_for(step.action);
        let mut ctx = ServiceContext::for_vault(&vault, M::OBJECT_TYPE);
        ctx.set_object(id, record.current_data().map(str::to_string));
        ctx.set_action(function, step.action_ref);
        ctx.set_group_ref(step.group_ref);
        ctx.add_tags(step.tags);

        let current = open_state::<M>(&ctx, &sealed)?;
        let mut input = ContractInput::new(function);
        if step.action == NodeAction::Move {
            input = input.with_parent_id(step.parent_id);
        }
        let next = match step.patch {
            Some(patch) => {
                let next = M::apply_patch(&current, patch)?;
                let resealed = reseal_state::<M>(&ctx, &sealed, &current, &next)?;
                let state_id = upload_state(&self.client, &resealed).await?;
                input = input.with_data(state_id);
                next
            }
            None => current,
        };

        let tags = ctx.transaction_tags(&self.client.config, &self.client.wallet.address())?;
        let receipt = self
            .client
            .ledger
            .post_contract_transaction(record.vault_id, input, tags)
            .await?;
        let record = receipt.object.into_node()?;
        tracing::debug!(
            "{} {} on {} {} (tx {})",
            step.action_ref,
            function,
            M::OBJECT_TYPE,
            id,
            receipt.id
        );

        let object = M::present(self.client.storage.as_ref(), &ctx, merge(record, next), true).await?;
        Ok(Updated {
            transaction_id: receipt.id,
            object,
        })
    }

    /// Lifecycle transition without a state patch, shared by the batch orchestrator
    pub(crate) async fn lifecycle(
        &self,
        vault: Option<&VaultContext>,
        id: Uuid,
        op: NodeOp,
        parent_id: Option<Uuid>,
        group_ref: Option<Uuid>,
    ) -> Result<Updated<M::View>, ServiceError> {
        let action = match op {
            NodeOp::Move => NodeAction::Move,
            NodeOp::Revoke => NodeAction::Revoke,
            NodeOp::Restore => NodeAction::Restore,
            NodeOp::Delete => NodeAction::Delete,
            NodeOp::Create | NodeOp::Rename => {
                return Err(ServiceError::BadRequest(format!(
                    "{:?} needs a state change",
                    op
                )))
            }
        };
        let step = Step::new(action, Self::action(op)?)
            .with_parent(parent_id)
            .with_group_ref(group_ref);
        self.update(vault, id, step).await
    }

    pub async fn rename(
        &self,
        id: Uuid,
        name: impl Into<String>,
    ) -> Result<Updated<M::View>, ServiceError> {
        let step = Step::new(NodeAction::Update, Self::action(NodeOp::Rename)?)
            .with_patch(NodePatch::Rename(name.into()));
        self.update(None, id, step).await
    }

    /// Move under `parent_id`, `None` moves to the vault root
    pub async fn move_to(
        &self,
        id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Updated<M::View>, ServiceError> {
        self.lifecycle(None, id, NodeOp::Move, parent_id, None).await
    }

    pub async fn revoke(&self, id: Uuid) -> Result<Updated<M::View>, ServiceError> {
        self.lifecycle(None, id, NodeOp::Revoke, None, None).await
    }

    pub async fn restore(&self, id: Uuid) -> Result<Updated<M::View>, ServiceError> {
        self.lifecycle(None, id, NodeOp::Restore, None, None).await
    }

    /// Terminal, nothing can be done to the node afterwards
    pub async fn delete(&self, id: Uuid) -> Result<Updated<M::View>, ServiceError> {
        self.lifecycle(None, id, NodeOp::Delete, None, None).await
    }

    pub async fn get(&self, id: Uuid) -> Result<M::View, ServiceError> {
        self.fetch(id, None).await
    }

    /// Fetch a node, opening its strings unless `decrypt` (or the config) says otherwise
    pub async fn fetch(&self, id: Uuid, decrypt: Option<bool>) -> Result<M::View, ServiceError> {
        let decrypt = self.client.config.resolve_decrypt(decrypt);
        let (record, sealed) = self.load(id).await?;
        let vault = if decrypt {
            self.vault_context(record.vault_id).await?
        } else {
            let vault = self.client.ledger.get_vault(record.vault_id).await?;
            VaultContext::new(vault, KeySet::default())
        };
        self.process_node(&vault, record, sealed, decrypt).await
    }

    /// Live nodes of the vault, oldest first
    pub async fn list(&self, vault_id: Uuid) -> Result<Vec<M::View>, ServiceError> {
        let vault = self.vault_context(vault_id).await?;
        let records = self.client.ledger.list_nodes(vault_id, M::KIND).await?;

        let loads = records
            .into_iter()
            .filter(|record| record.status != NodeStatus::Deleted)
            .map(|record| async move {
                let state_id = record
                    .current_data()
                    .ok_or_else(|| ServiceError::NotFound(format!("state of {}", record.id)))?;
                let sealed: NodeState<M::Version> = fetch_state(&self.client, state_id).await?;
                Ok::<_, ServiceError>((record, sealed))
            });
        let loaded = try_join_all(loads).await?;

        let mut views = Vec::new();
        for (record, sealed) in loaded {
            let ctx = node_context::<M>(&vault, &record);
            let state = open_state::<M>(&ctx, &sealed)?;
            if !M::includes(&state) {
                continue;
            }
            let node = merge(record, state);
            views.push(M::present(self.client.storage.as_ref(), &ctx, node, true).await?);
        }
        Ok(views)
    }

    /// Ordered transactions that touched the node
    pub async fn history(&self, id: Uuid) -> Result<Vec<Transaction>, ServiceError> {
        let record = self.client.ledger.get_node(id, M::KIND).await?;
        let transactions = self.client.ledger.get_transactions(record.vault_id).await?;
        Ok(transactions
            .into_iter()
            .filter(|tx| tx.object_id() == Some(id))
            .collect())
    }

    /// Turn a ledger record and its sealed state into the caller's view
    pub(crate) async fn process_node(
        &self,
        vault: &VaultContext,
        record: NodeRecord,
        sealed: NodeState<M::Version>,
        decrypt: bool,
    ) -> Result<M::View, ServiceError> {
        let ctx = node_context::<M>(vault, &record);
        let state = if decrypt {
            open_state::<M>(&ctx, &sealed)?
        } else {
            sealed
        };
        M::present(self.client.storage.as_ref(), &ctx, merge(record, state), decrypt).await
    }
}

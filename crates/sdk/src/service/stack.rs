use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::base::{ServiceContext, VaultContext};
use super::node::{NodeModel, NodeOp, NodePatch, NodeService, PreparedCreate, Step};
use super::tags::ActionRef;
use super::{NodeCreated, ServiceError, Updated};
use crate::client::ClientInner;
use crate::ledger::{tag_names, Tags};
use crate::storage::{ProgressHook, StorageGateway, UploadOptions};
use crate::types::{now_millis, FileVersion, Node, NodeAction, NodeKind, NodeState, ObjectType};

const SEALED_CONTENT_TYPE: &str = "application/octet-stream";

/// File content handed to the SDK
#[derive(Debug, Clone)]
pub struct FileLike {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl FileLike {
    /// Content type is guessed from the name's extension
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            name,
            content_type,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: mime::Mime) -> Self {
        self.content_type = content_type.essence_str().to_string();
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Knobs of a single file transfer
#[derive(Clone, Default)]
pub struct TransferOptions {
    pub progress: Option<ProgressHook>,
    pub cancel: Option<CancellationToken>,
    /// Overrides the configured upload chunk size
    pub chunk_size: Option<usize>,
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StackCreateOptions {
    pub parent_id: Option<Uuid>,
    pub transfer: TransferOptions,
}

/// File stacks: one version per uploaded revision
#[derive(Debug, Clone, Copy)]
pub struct Stack;

pub type StackService = NodeService<Stack>;

pub(crate) fn map_file_version(
    version: &FileVersion,
    f: &dyn Fn(&str) -> Result<String, ServiceError>,
) -> Result<FileVersion, ServiceError> {
    Ok(FileVersion {
        name: f(&version.name)?,
        content_type: f(&version.content_type)?,
        ..version.clone()
    })
}

/// Revisions append, nothing edits an uploaded version
pub(crate) fn patch_file_state<M: NodeModel<Version = FileVersion>>(
    state: &NodeState<FileVersion>,
    patch: NodePatch<FileVersion>,
) -> Result<NodeState<FileVersion>, ServiceError> {
    match patch {
        NodePatch::Rename(_) | NodePatch::AppendVersion(_) => patch.apply(state),
        other => Err(other.unsupported(M::OBJECT_TYPE)),
    }
}

#[async_trait]
impl NodeModel for Stack {
    const KIND: NodeKind = NodeKind::Stack;
    const OBJECT_TYPE: ObjectType = ObjectType::Stack;

    type Version = FileVersion;
    type View = Node<FileVersion>;

    fn action_ref(op: NodeOp) -> Option<ActionRef> {
        Some(match op {
            NodeOp::Create => ActionRef::StackCreate,
            NodeOp::Rename => ActionRef::StackRename,
            NodeOp::Move => ActionRef::StackMove,
            NodeOp::Revoke => ActionRef::StackRevoke,
            NodeOp::Restore => ActionRef::StackRestore,
            NodeOp::Delete => ActionRef::StackDelete,
        })
    }

    fn map_strings(
        version: &FileVersion,
        f: &dyn Fn(&str) -> Result<String, ServiceError>,
    ) -> Result<FileVersion, ServiceError> {
        map_file_version(version, f)
    }

    fn apply_patch(
        state: &NodeState<FileVersion>,
        patch: NodePatch<FileVersion>,
    ) -> Result<NodeState<FileVersion>, ServiceError> {
        patch_file_state::<Self>(state, patch)
    }

    async fn present(
        _storage: &dyn StorageGateway,
        _ctx: &ServiceContext,
        node: Node<FileVersion>,
        _opened: bool,
    ) -> Result<Node<FileVersion>, ServiceError> {
        Ok(node)
    }
}

/// Seal (in private vaults) and upload a file body, describing it as a version
pub(crate) async fn upload_file_version(
    client: &ClientInner,
    ctx: &ServiceContext,
    file: &FileLike,
    transfer: &TransferOptions,
) -> Result<FileVersion, ServiceError> {
    let body = ctx.process_write_bytes(file.data.clone())?;
    let content_type = if ctx.is_public() {
        file.content_type.as_str()
    } else {
        SEALED_CONTENT_TYPE
    };
    let options = UploadOptions {
        public: ctx.is_public(),
        progress: transfer.progress.clone(),
        cancel: transfer.cancel.clone(),
        chunk_size: Some(client.config.resolve_upload_chunk_size(transfer.chunk_size)),
    };

    let resource = client
        .storage
        .upload_file(
            body,
            Tags::new().with(tag_names::CONTENT_TYPE, content_type),
            options,
        )
        .await?;
    tracing::debug!("uploaded {} bytes to {}", file.size(), resource.resource_url);

    Ok(FileVersion {
        owner: client.wallet.address(),
        name: file.name.clone(),
        content_type: file.content_type.clone(),
        size: file.size(),
        resource_url: resource.resource_url,
        resource_tx: resource.resource_tx,
        created_at: now_millis(),
    })
}

/// Download a version's body and open it
pub(crate) async fn download_file_version(
    storage: &dyn StorageGateway,
    ctx: &ServiceContext,
    version: &FileVersion,
) -> Result<Bytes, ServiceError> {
    let file = storage.download_file(&version.resource_tx).await?;
    ctx.process_read_bytes(file.data)
}

fn size_tag(size: u64) -> Tags {
    Tags::new().with(tag_names::FILE_SIZE, size.to_string())
}

/// The file pipeline shared by stacks and notes
impl<M: NodeModel<Version = FileVersion>> NodeService<M> {
    /// Upload the body and initial state of a new file node
    pub(crate) async fn prepare_file(
        &self,
        vault: &VaultContext,
        file: &FileLike,
        parent_id: Option<Uuid>,
        transfer: &TransferOptions,
        group_ref: Option<Uuid>,
    ) -> Result<PreparedCreate<FileVersion>, ServiceError> {
        let ctx = ServiceContext::for_vault(vault, M::OBJECT_TYPE);
        let version = upload_file_version(self.client(), &ctx, file, transfer).await?;
        let state = NodeState::new(file.name.clone(), vec![version], Vec::new());
        self.prepare_create(vault, state, parent_id, group_ref, size_tag(file.size()))
            .await
    }

    /// Upload a revision and append it as the node's newest version
    pub(crate) async fn append_file(
        &self,
        vault: &VaultContext,
        id: Uuid,
        file: &FileLike,
        transfer: &TransferOptions,
        action_ref: ActionRef,
    ) -> Result<Updated<M::View>, ServiceError> {
        let record = self.client().ledger.get_node(id, M::KIND).await?;
        // nothing is uploaded for a node that cannot take the update
        M::validate_transition(record.status, NodeAction::Update)?;

        let ctx = ServiceContext::for_vault(vault, M::OBJECT_TYPE);
        let version = upload_file_version(self.client(), &ctx, file, transfer).await?;
        let step = Step::new(NodeAction::Update, action_ref)
            .with_patch(NodePatch::AppendVersion(version))
            .with_tags(size_tag(file.size()));
        self.update(Some(vault), id, step).await
    }
}

impl NodeService<Stack> {
    pub async fn create(
        &self,
        vault_id: Uuid,
        file: FileLike,
        options: StackCreateOptions,
    ) -> Result<NodeCreated<Node<FileVersion>>, ServiceError> {
        let vault = self.vault_context(vault_id).await?;
        let prepared = self
            .prepare_file(&vault, &file, options.parent_id, &options.transfer, None)
            .await?;
        self.post_create(prepared).await
    }

    pub async fn upload_revision(
        &self,
        id: Uuid,
        file: FileLike,
        transfer: TransferOptions,
    ) -> Result<Updated<Node<FileVersion>>, ServiceError> {
        let record = self.client().ledger.get_node(id, Stack::KIND).await?;
        let vault = self.vault_context(record.vault_id).await?;
        self.append_file(&vault, id, &file, &transfer, ActionRef::StackUploadRevision)
            .await
    }

    /// Download one version, the latest when `index` is `None`
    pub async fn get_version(
        &self,
        id: Uuid,
        index: Option<usize>,
    ) -> Result<(FileVersion, Bytes), ServiceError> {
        let node = self.get(id).await?;
        let vault = self.vault_context(node.vault_id).await?;
        let version = match index {
            Some(index) => node.versions.get(index),
            None => node.latest(),
        }
        .cloned()
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "version {} of {}",
                index.map_or("latest".to_string(), |i| i.to_string()),
                id
            ))
        })?;

        let ctx = ServiceContext::for_vault(&vault, ObjectType::Stack);
        let data = download_file_version(self.client().storage.as_ref(), &ctx, &version).await?;
        Ok((version, data))
    }
}

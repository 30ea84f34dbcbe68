use async_trait::async_trait;
use uuid::Uuid;

use super::base::ServiceContext;
use super::node::{NodeModel, NodeOp, NodePatch, NodeService};
use super::tags::ActionRef;
use super::{NodeCreated, ServiceError};
use crate::ledger::Tags;
use crate::storage::StorageGateway;
use crate::types::{Node, NodeKind, NodeState, ObjectType};

/// Folders only carry a name, they have no versions
#[derive(Debug, Clone, Copy)]
pub struct Folder;

pub type FolderService = NodeService<Folder>;

#[async_trait]
impl NodeModel for Folder {
    const KIND: NodeKind = NodeKind::Folder;
    const OBJECT_TYPE: ObjectType = ObjectType::Folder;

    type Version = ();
    type View = Node<()>;

    fn action_ref(op: NodeOp) -> Option<ActionRef> {
        Some(match op {
            NodeOp::Create => ActionRef::FolderCreate,
            NodeOp::Rename => ActionRef::FolderRename,
            NodeOp::Move => ActionRef::FolderMove,
            NodeOp::Revoke => ActionRef::FolderRevoke,
            NodeOp::Restore => ActionRef::FolderRestore,
            NodeOp::Delete => ActionRef::FolderDelete,
        })
    }

    fn map_strings(
        _version: &(),
        _f: &dyn Fn(&str) -> Result<String, ServiceError>,
    ) -> Result<(), ServiceError> {
        Ok(())
    }

    fn apply_patch(
        state: &NodeState<()>,
        patch: NodePatch<()>,
    ) -> Result<NodeState<()>, ServiceError> {
        match patch {
            NodePatch::Rename(_) => patch.apply(state),
            other => Err(other.unsupported(Self::OBJECT_TYPE)),
        }
    }

    async fn present(
        _storage: &dyn StorageGateway,
        _ctx: &ServiceContext,
        node: Node<()>,
        _opened: bool,
    ) -> Result<Node<()>, ServiceError> {
        Ok(node)
    }
}

impl NodeService<Folder> {
    /// Create a folder, at the vault root when `parent_id` is `None`
    pub async fn create(
        &self,
        vault_id: Uuid,
        name: impl Into<String>,
        parent_id: Option<Uuid>,
    ) -> Result<NodeCreated<Node<()>>, ServiceError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ServiceError::BadRequest("folder name cannot be empty".to_string()));
        }
        let vault = self.vault_context(vault_id).await?;
        self.create_node(
            &vault,
            NodeState::new(name, Vec::new(), Vec::new()),
            parent_id,
            Tags::new(),
        )
        .await
    }
}

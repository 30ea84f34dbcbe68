use async_trait::async_trait;
use futures::future::try_join_all;
use uuid::Uuid;

use super::base::ServiceContext;
use super::node::{NodeModel, NodeOp, NodePatch, NodeService};
use super::stack::{
    download_file_version, map_file_version, patch_file_state, FileLike, TransferOptions,
};
use super::tags::ActionRef;
use super::{NodeCreated, ServiceError, Updated};
use crate::storage::StorageGateway;
use crate::types::{FileVersion, Node, NodeKind, NodeState, NoteVersion, ObjectType};

/// Content types a stack must carry to be listed as a note
pub const NOTE_CONTENT_TYPES: [&str; 2] = ["text/markdown", "application/json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteType {
    #[default]
    Markdown,
    Json,
}

impl NoteType {
    pub fn content_type(&self) -> &'static str {
        match self {
            NoteType::Markdown => NOTE_CONTENT_TYPES[0],
            NoteType::Json => NOTE_CONTENT_TYPES[1],
        }
    }

    fn wrap(&self, name: String, content: &str) -> FileLike {
        FileLike {
            name,
            content_type: self.content_type().to_string(),
            data: content.to_string().into(),
        }
    }
}

/// Notes are stacks of markdown or JSON revisions read back as text
#[derive(Debug, Clone, Copy)]
pub struct Note;

pub type NoteService = NodeService<Note>;

#[async_trait]
impl NodeModel for Note {
    const KIND: NodeKind = NodeKind::Stack;
    const OBJECT_TYPE: ObjectType = ObjectType::Note;

    type Version = FileVersion;
    type View = Node<NoteVersion>;

    fn action_ref(op: NodeOp) -> Option<ActionRef> {
        Some(match op {
            NodeOp::Create => ActionRef::NoteCreate,
            NodeOp::Rename => ActionRef::NoteRename,
            NodeOp::Move => ActionRef::NoteMove,
            NodeOp::Revoke => ActionRef::NoteRevoke,
            NodeOp::Restore => ActionRef::NoteRestore,
            NodeOp::Delete => ActionRef::NoteDelete,
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

    fn includes(state: &NodeState<FileVersion>) -> bool {
        state
            .latest()
            .is_some_and(|version| NOTE_CONTENT_TYPES.contains(&version.content_type.as_str()))
    }

    /// Downloads every revision; the text lands in `message` when opened
    async fn present(
        storage: &dyn StorageGateway,
        ctx: &ServiceContext,
        node: Node<FileVersion>,
        opened: bool,
    ) -> Result<Node<NoteVersion>, ServiceError> {
        let Node {
            id,
            vault_id,
            kind,
            owner,
            parent_id,
            status,
            name,
            versions,
            tags,
            data,
            created_at,
            updated_at,
        } = node;

        let versions = try_join_all(versions.into_iter().map(|file| async move {
            let message = if opened {
                let body = download_file_version(storage, ctx, &file).await?;
                String::from_utf8(body.to_vec()).map_err(|e| {
                    ServiceError::BadRequest(format!("note {} is not utf-8: {}", id, e))
                })?
            } else {
                String::new()
            };
            Ok::<_, ServiceError>(NoteVersion { file, message })
        }))
        .await?;

        Ok(Node {
            id,
            vault_id,
            kind,
            owner,
            parent_id,
            status,
            name,
            versions,
            tags,
            data,
            created_at,
            updated_at,
        })
    }
}

impl NodeService<Note> {
    pub async fn create(
        &self,
        vault_id: Uuid,
        content: &str,
        name: impl Into<String>,
        note_type: NoteType,
        parent_id: Option<Uuid>,
    ) -> Result<NodeCreated<Node<NoteVersion>>, ServiceError> {
        let file = note_type.wrap(name.into(), content);
        let vault = self.vault_context(vault_id).await?;
        let prepared = self
            .prepare_file(&vault, &file, parent_id, &TransferOptions::default(), None)
            .await?;
        self.post_create(prepared).await
    }

    /// Append new content, the revision keeps the note's current name
    pub async fn upload_revision(
        &self,
        id: Uuid,
        content: &str,
        note_type: NoteType,
    ) -> Result<Updated<Node<NoteVersion>>, ServiceError> {
        let (record, sealed) = self.load(id).await?;
        let vault = self.vault_context(record.vault_id).await?;
        let name = ServiceContext::for_vault(&vault, Note::OBJECT_TYPE)
            .process_read_string(&sealed.name)?;

        let file = note_type.wrap(name, content);
        self.append_file(
            &vault,
            id,
            &file,
            &TransferOptions::default(),
            ActionRef::NoteUploadRevision,
        )
        .await
    }
}

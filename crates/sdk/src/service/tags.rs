//! Action references and the transaction tag layout

use std::fmt;

use uuid::Uuid;

use crate::ledger::{tag_names, ContractFunction, Tags};
use crate::types::ObjectType;

pub const ENCRYPTION_TYPE: &str = "ChaCha20-Poly1305";
pub const ENCODING: &str = "hex";

/// The semantic operation a transaction records
///
/// Several action refs share one contract function (renames and revisions are
/// both `node:update`); the ref is what tells them apart in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionRef {
    VaultCreate,
    VaultRename,
    VaultArchive,
    VaultRestore,
    VaultDelete,
    MembershipOwner,
    MembershipInvite,
    MembershipConfirm,
    MembershipAccept,
    MembershipReject,
    MembershipRevoke,
    MembershipRestore,
    MembershipChangeRole,
    MembershipProfileUpdate,
    FolderCreate,
    FolderRename,
    FolderMove,
    FolderRevoke,
    FolderRestore,
    FolderDelete,
    StackCreate,
    StackUploadRevision,
    StackRename,
    StackMove,
    StackRevoke,
    StackRestore,
    StackDelete,
    NoteCreate,
    NoteUploadRevision,
    NoteRename,
    NoteMove,
    NoteRevoke,
    NoteRestore,
    NoteDelete,
    MemoCreate,
    MemoAddReaction,
    MemoRemoveReaction,
    MemoMove,
    MemoRevoke,
    MemoRestore,
    MemoDelete,
}

impl ActionRef {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionRef::VaultCreate => "VAULT_CREATE",
            ActionRef::VaultRename => "VAULT_RENAME",
            ActionRef::VaultArchive => "VAULT_ARCHIVE",
            ActionRef::VaultRestore => "VAULT_RESTORE",
            ActionRef::VaultDelete => "VAULT_DELETE",
            ActionRef::MembershipOwner => "MEMBERSHIP_OWNER",
            ActionRef::MembershipInvite => "MEMBERSHIP_INVITE",
            ActionRef::MembershipConfirm => "MEMBERSHIP_CONFIRM",
            ActionRef::MembershipAccept => "MEMBERSHIP_ACCEPT",
            ActionRef::MembershipReject => "MEMBERSHIP_REJECT",
            ActionRef::MembershipRevoke => "MEMBERSHIP_REVOKE",
            ActionRef::MembershipRestore => "MEMBERSHIP_RESTORE",
            ActionRef::MembershipChangeRole => "MEMBERSHIP_CHANGE_ROLE",
            ActionRef::MembershipProfileUpdate => "MEMBERSHIP_PROFILE_UPDATE",
            ActionRef::FolderCreate => "FOLDER_CREATE",
            ActionRef::FolderRename => "FOLDER_RENAME",
            ActionRef::FolderMove => "FOLDER_MOVE",
            ActionRef::FolderRevoke => "FOLDER_REVOKE",
            ActionRef::FolderRestore => "FOLDER_RESTORE",
            ActionRef::FolderDelete => "FOLDER_DELETE",
            ActionRef::StackCreate => "STACK_CREATE",
            ActionRef::StackUploadRevision => "STACK_UPLOAD_REVISION",
            ActionRef::StackRename => "STACK_RENAME",
            ActionRef::StackMove => "STACK_MOVE",
            ActionRef::StackRevoke => "STACK_REVOKE",
            ActionRef::StackRestore => "STACK_RESTORE",
            ActionRef::StackDelete => "STACK_DELETE",
            ActionRef::NoteCreate => "NOTE_CREATE",
            ActionRef::NoteUploadRevision => "NOTE_UPLOAD_REVISION",
            ActionRef::NoteRename => "NOTE_RENAME",
            ActionRef::NoteMove => "NOTE_MOVE",
            ActionRef::NoteRevoke => "NOTE_REVOKE",
            ActionRef::NoteRestore => "NOTE_RESTORE",
            ActionRef::NoteDelete => "NOTE_DELETE",
            ActionRef::MemoCreate => "MEMO_CREATE",
            ActionRef::MemoAddReaction => "MEMO_ADD_REACTION",
            ActionRef::MemoRemoveReaction => "MEMO_REMOVE_REACTION",
            ActionRef::MemoMove => "MEMO_MOVE",
            ActionRef::MemoRevoke => "MEMO_REVOKE",
            ActionRef::MemoRestore => "MEMO_RESTORE",
            ActionRef::MemoDelete => "MEMO_DELETE",
        }
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that goes into a transaction's tags
#[derive(Debug, Clone)]
pub struct TagParams<'a> {
    pub protocol_name: &'a str,
    pub protocol_version: &'a str,
    pub function: ContractFunction,
    pub action_ref: ActionRef,
    pub vault_id: Uuid,
    pub object_id: Option<Uuid>,
    pub object_type: ObjectType,
    pub signer: &'a str,
    pub public: bool,
    pub group_ref: Option<Uuid>,
    pub extra: &'a Tags,
}

/// Lay out the tags of a transaction
///
/// The order is fixed by the ledger protocol: protocol, function, action,
/// addressing, signer, visibility, encryption metadata (private vaults only),
/// group (multi-item batches only), then operation specific extras.
pub fn build_tags(params: TagParams<'_>) -> Tags {
    let mut tags = Tags::new()
        .with(tag_names::PROTOCOL_NAME, params.protocol_name)
        .with(tag_names::PROTOCOL_VERSION, params.protocol_version)
        .with(tag_names::FUNCTION_NAME, params.function.as_str())
        .with(tag_names::ACTION_REF, params.action_ref.as_str())
        .with(tag_names::VAULT_ID, params.vault_id.to_string());

    if let Some(object_id) = params.object_id {
        tags.push(tag_names::OBJECT_ID, object_id.to_string());
    }
    tags.push(tag_names::OBJECT_TYPE, params.object_type.as_str());
    if let Some(kind) = params.object_type.node_kind() {
        tags.push(tag_names::NODE_TYPE, kind.as_str());
    }
    tags.push(tag_names::SIGNER_ADDRESS, params.signer);
    tags.push(tag_names::PUBLIC, if params.public { "true" } else { "false" });

    if !params.public {
        tags.push(tag_names::ENCRYPTION_TYPE, ENCRYPTION_TYPE);
        tags.push(tag_names::ENCODING, ENCODING);
    }
    if let Some(group_ref) = params.group_ref {
        tags.push(tag_names::GROUP_REF, group_ref.to_string());
    }
    tags.extend(params.extra.clone());
    tags
}

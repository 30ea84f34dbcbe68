//! Vault data model
//!
//! Two layers of every object exist side by side:
//!
//! - the **record** the ledger folds out of its transactions (ids, status,
//!   parent, role and the history of state pointers), see [`crate::ledger`]
//! - the **state blob** uploaded to storage (names, versions, reactions, wrapped keys)
//!
//! The types here describe the state blobs, the merged objects handed to
//! callers, and the status machines the ledger and the services both enforce.

mod membership;
mod node;
mod status;
mod vault;
mod version;

pub use membership::{MemberDetails, Membership, MembershipState, Role};
pub use node::{Node, NodeState};
pub use status::{
    MembershipAction, MembershipStatus, NodeAction, NodeStatus, TransitionError, VaultAction,
    VaultStatus,
};
pub use vault::{Vault, VaultState};
pub use version::{FileVersion, MemoReaction, MemoVersion, NoteVersion, Reaction};

use serde::{Deserialize, Serialize};

/// Every object type the protocol addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Vault,
    Membership,
    Folder,
    Stack,
    Note,
    Memo,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Vault => "Vault",
            ObjectType::Membership => "Membership",
            ObjectType::Folder => "Folder",
            ObjectType::Stack => "Stack",
            ObjectType::Note => "Note",
            ObjectType::Memo => "Memo",
        }
    }

    /// The node kind an object of this type is stored as, if it is a node
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            ObjectType::Folder => Some(NodeKind::Folder),
            ObjectType::Stack | ObjectType::Note => Some(NodeKind::Stack),
            ObjectType::Memo => Some(NodeKind::Memo),
            ObjectType::Vault | ObjectType::Membership => None,
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of node the ledger stores
///
/// Notes are stacks whose versions hold markdown or JSON, they have no kind of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Folder,
    Stack,
    Memo,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "Folder",
            NodeKind::Stack => "Stack",
            NodeKind::Memo => "Memo",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "Folder" => Some(NodeKind::Folder),
            "Stack" => Some(NodeKind::Stack),
            "Memo" => Some(NodeKind::Memo),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milliseconds since the unix epoch, the timestamp unit of every record
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{NodeKind, NodeStatus};

/// Node state blob
///
/// One blob is uploaded per state change and its content id appended to the
/// node's data pointer history. `versions` is append-only: earlier entries are
/// never edited, and the current version is always the last one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState<V> {
    #[serde(default)]
    pub name: String,
    #[serde(default = "Vec::new")]
    pub versions: Vec<V>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl<V> NodeState<V> {
    pub fn new(name: String, versions: Vec<V>, tags: Vec<String>) -> Self {
        Self {
            name,
            versions,
            tags,
        }
    }

    pub fn latest(&self) -> Option<&V> {
        self.versions.last()
    }
}

/// A node as handed to callers: ledger record merged with its current state
///
/// Folders carry no versions (`V = ()`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node<V> {
    pub id: Uuid,
    pub vault_id: Uuid,
    pub kind: NodeKind,
    pub owner: String,
    /// `None` means the vault root
    pub parent_id: Option<Uuid>,
    pub status: NodeStatus,
    pub name: String,
    pub versions: Vec<V>,
    pub tags: Vec<String>,
    /// State pointer history, the last entry is current
    pub data: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<V> Node<V> {
    pub fn latest(&self) -> Option<&V> {
        self.versions.last()
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One uploaded revision of a stack
///
/// `name` is sealed with the vault keys in private vaults; the resource itself
/// was sealed before upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub owner: String,
    pub name: String,
    pub content_type: String,
    pub size: u64,
    /// Storage location of the (possibly sealed) file body
    pub resource_url: String,
    /// Storage transaction that carried the upload
    pub resource_tx: String,
    pub created_at: i64,
}

/// A note revision with its content downloaded and opened into `message`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteVersion {
    pub file: FileVersion,
    pub message: String,
}

/// A reaction left on a memo version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoReaction {
    /// The emoji, sealed with the vault keys in private vaults
    pub reaction: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_signing_key: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoVersion {
    pub owner: String,
    pub message: String,
    pub created_at: i64,
    #[serde(default)]
    pub reactions: Vec<MemoReaction>,
    #[serde(default)]
    pub attachments: Vec<Uuid>,
}

/// Reactions a member can leave on a memo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reaction {
    Joy,
    Astonished,
    Cry,
    Heart,
    Fire,
    ThumbsUp,
    ThumbsDown,
    Pray,
}

impl Reaction {
    pub fn emoji(&self) -> &'static str {
        match self {
            Reaction::Joy => "😂",
            Reaction::Astonished => "😲",
            Reaction::Cry => "😢",
            Reaction::Heart => "❤️",
            Reaction::Fire => "🔥",
            Reaction::ThumbsUp => "👍",
            Reaction::ThumbsDown => "👎",
            Reaction::Pray => "🙏",
        }
    }
}

impl std::fmt::Display for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.emoji())
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::VaultStatus;

/// Vault state blob
///
/// `name` and `description` are sealed with the vault keys unless the vault is public.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A vault as handed to callers: ledger record merged with its latest state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: Uuid,
    pub owner: String,
    pub public: bool,
    pub status: VaultStatus,
    pub name: String,
    pub description: Option<String>,
    /// Total bytes of file data uploaded into the vault
    pub size: u64,
    /// State pointer history, the last entry is current
    pub data: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

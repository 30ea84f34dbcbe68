use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{PublicKey, SecretShare};

use super::MembershipStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Viewer,
    Contributor,
    Owner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "VIEWER",
            Role::Contributor => "CONTRIBUTOR",
            Role::Owner => "OWNER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Member profile, `name` is sealed with the vault keys in private vaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Membership state blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipState {
    /// Vault key generations wrapped for this member, oldest first
    #[serde(default)]
    pub keys: Vec<SecretShare>,
    /// Key the shares were wrapped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_signing_key: Option<PublicKey>,
    #[serde(default)]
    pub member_details: MemberDetails,
}

/// A membership as handed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub vault_id: Uuid,
    pub owner: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub status: MembershipStatus,
    pub role: Role,
    pub member_details: MemberDetails,
    pub data: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Role;

/// Wire names of the tags the protocol attaches to transactions
pub mod tag_names {
    pub const PROTOCOL_NAME: &str = "Protocol-Name";
    pub const PROTOCOL_VERSION: &str = "Protocol-Version";
    pub const FUNCTION_NAME: &str = "Function-Name";
    pub const ACTION_REF: &str = "Action-Ref";
    pub const VAULT_ID: &str = "Vault-Id";
    pub const OBJECT_ID: &str = "Object-Id";
    pub const OBJECT_TYPE: &str = "Object-Type";
    pub const NODE_TYPE: &str = "Node-Type";
    pub const SIGNER_ADDRESS: &str = "Signer-Address";
    pub const PUBLIC: &str = "Public";
    pub const ENCRYPTION_TYPE: &str = "Encryption-Type";
    pub const ENCODING: &str = "Encoding";
    pub const GROUP_REF: &str = "Group-Ref";
    pub const MEMBER_ADDRESS: &str = "Member-Address";
    pub const FILE_SIZE: &str = "File-Size";
    pub const CONTENT_TYPE: &str = "Content-Type";
}

/// Contract handlers a transaction can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractFunction {
    #[serde(rename = "vault:init")]
    VaultInit,
    #[serde(rename = "vault:update")]
    VaultUpdate,
    #[serde(rename = "vault:archive")]
    VaultArchive,
    #[serde(rename = "vault:restore")]
    VaultRestore,
    #[serde(rename = "vault:delete")]
    VaultDelete,
    #[serde(rename = "membership:add")]
    MembershipAdd,
    #[serde(rename = "membership:invite")]
    MembershipInvite,
    #[serde(rename = "membership:confirm")]
    MembershipConfirm,
    #[serde(rename = "membership:accept")]
    MembershipAccept,
    #[serde(rename = "membership:reject")]
    MembershipReject,
    #[serde(rename = "membership:revoke")]
    MembershipRevoke,
    #[serde(rename = "membership:restore")]
    MembershipRestore,
    #[serde(rename = "membership:change-role")]
    MembershipChangeRole,
    #[serde(rename = "membership:update")]
    MembershipUpdate,
    #[serde(rename = "node:create")]
    NodeCreate,
    #[serde(rename = "node:update")]
    NodeUpdate,
    #[serde(rename = "node:move")]
    NodeMove,
    #[serde(rename = "node:revoke")]
    NodeRevoke,
    #[serde(rename = "node:restore")]
    NodeRestore,
    #[serde(rename = "node:delete")]
    NodeDelete,
}

impl ContractFunction {
    pub const ALL: [ContractFunction; 20] = [
        ContractFunction::VaultInit,
        ContractFunction::VaultUpdate,
        ContractFunction::VaultArchive,
        ContractFunction::VaultRestore,
        ContractFunction::VaultDelete,
        ContractFunction::MembershipAdd,
        ContractFunction::MembershipInvite,
        ContractFunction::MembershipConfirm,
        ContractFunction::MembershipAccept,
        ContractFunction::MembershipReject,
        ContractFunction::MembershipRevoke,
        ContractFunction::MembershipRestore,
        ContractFunction::MembershipChangeRole,
        ContractFunction::MembershipUpdate,
        ContractFunction::NodeCreate,
        ContractFunction::NodeUpdate,
        ContractFunction::NodeMove,
        ContractFunction::NodeRevoke,
        ContractFunction::NodeRestore,
        ContractFunction::NodeDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractFunction::VaultInit => "vault:init",
            ContractFunction::VaultUpdate => "vault:update",
            ContractFunction::VaultArchive => "vault:archive",
            ContractFunction::VaultRestore => "vault:restore",
            ContractFunction::VaultDelete => "vault:delete",
            ContractFunction::MembershipAdd => "membership:add",
            ContractFunction::MembershipInvite => "membership:invite",
            ContractFunction::MembershipConfirm => "membership:confirm",
            ContractFunction::MembershipAccept => "membership:accept",
            ContractFunction::MembershipReject => "membership:reject",
            ContractFunction::MembershipRevoke => "membership:revoke",
            ContractFunction::MembershipRestore => "membership:restore",
            ContractFunction::MembershipChangeRole => "membership:change-role",
            ContractFunction::MembershipUpdate => "membership:update",
            ContractFunction::NodeCreate => "node:create",
            ContractFunction::NodeUpdate => "node:update",
            ContractFunction::NodeMove => "node:move",
            ContractFunction::NodeRevoke => "node:revoke",
            ContractFunction::NodeRestore => "node:restore",
            ContractFunction::NodeDelete => "node:delete",
        }
    }
}

impl fmt::Display for ContractFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|function| function.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown contract function: {}", s))
    }
}

/// Input handed to the contract handler named by `function`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInput {
    pub function: ContractFunction,
    /// Content id of the uploaded state blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
}

impl ContractInput {
    pub fn new(function: ContractFunction) -> Self {
        Self {
            function,
            data: None,
            role: None,
            address: None,
            parent_id: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_parent_id(mut self, parent_id: Option<Uuid>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered tag list
///
/// Order is part of the wire contract, so tags are kept in insertion order and
/// never sorted or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<Tag>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push(Tag::new(name, value));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn extend(&mut self, other: Tags) {
        self.0.extend(other.0);
    }

    /// First value carried under `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|tag| tag.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Tag> for Tags {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One immutable entry of a vault's transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub vault_id: Uuid,
    pub input: ContractInput,
    pub tags: Tags,
    /// Position in the vault's log, starting at 0
    pub sequence: u64,
    pub timestamp: i64,
}

impl Transaction {
    pub fn object_id(&self) -> Option<Uuid> {
        self.tags
            .get(tag_names::OBJECT_ID)
            .and_then(|value| Uuid::parse_str(value).ok())
    }

    pub fn signer(&self) -> Option<&str> {
        self.tags.get(tag_names::SIGNER_ADDRESS)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_function_wire_names() {
        for function in ContractFunction::ALL {
            let json = serde_json::to_string(&function).unwrap();
            assert_eq!(json, format!("\"{}\"", function.as_str()));
            assert_eq!(function.as_str().parse::<ContractFunction>(), Ok(function));
        }
        assert!("node:explode".parse::<ContractFunction>().is_err());
    }

    #[test]
    fn test_input_skips_empty_fields() {
        let input = ContractInput::new(ContractFunction::NodeRevoke);
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({ "function": "node:revoke" })
        );

        let input = ContractInput::new(ContractFunction::MembershipChangeRole)
            .with_role(Role::Contributor)
            .with_address("abcd");
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            serde_json::json!({
                "function": "membership:change-role",
                "role": "CONTRIBUTOR",
                "address": "abcd"
            })
        );
    }

    #[test]
    fn test_tags_keep_insertion_order() {
        let tags = Tags::new()
            .with(tag_names::PROTOCOL_NAME, "Permavault")
            .with(tag_names::ACTION_REF, "FOLDER_CREATE")
            .with(tag_names::ACTION_REF, "ignored duplicate");

        assert_eq!(
            tags.names(),
            vec!["Protocol-Name", "Action-Ref", "Action-Ref"]
        );
        assert_eq!(tags.get(tag_names::ACTION_REF), Some("FOLDER_CREATE"));
        assert_eq!(tags.get(tag_names::GROUP_REF), None);
    }
}

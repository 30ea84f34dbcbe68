//! Status machines shared by the contract fold and the services
//!
//! The services check a transition locally before touching the network, the
//! ledger checks it again when it folds the transaction in.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {action} when status is {from}")]
pub struct TransitionError {
    pub from: String,
    pub action: String,
}

impl TransitionError {
    fn new(from: impl std::fmt::Debug, action: impl std::fmt::Debug) -> Self {
        Self {
            from: format!("{:?}", from).to_uppercase(),
            action: format!("{:?}", action).to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Active,
    Revoked,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Update,
    Move,
    Revoke,
    Restore,
    Delete,
}

impl NodeStatus {
    /// ACTIVE ⇄ REVOKED, ACTIVE|REVOKED → DELETED; nothing leaves DELETED
    pub fn transition(self, action: NodeAction) -> Result<NodeStatus, TransitionError> {
        use NodeAction::*;
        use NodeStatus::*;
        match (self, action) {
            (Deleted, _) => Err(TransitionError::new(self, action)),
            (Active | Revoked, Update | Move) => Ok(self),
            (Active, Revoke) => Ok(Revoked),
            (Revoked, Restore) => Ok(Active),
            (Active | Revoked, Delete) => Ok(Deleted),
            _ => Err(TransitionError::new(self, action)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VaultStatus {
    Active,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultAction {
    Update,
    Archive,
    Restore,
    Delete,
}

impl VaultStatus {
    /// ACTIVE ⇄ ARCHIVED, ACTIVE|ARCHIVED → DELETED; updates only while ACTIVE
    pub fn transition(self, action: VaultAction) -> Result<VaultStatus, TransitionError> {
        use VaultAction::*;
        use VaultStatus::*;
        match (self, action) {
            (Active, Update) => Ok(Active),
            (Active, Archive) => Ok(Archived),
            (Archived, Restore) => Ok(Active),
            (Active | Archived, Delete) => Ok(Deleted),
            _ => Err(TransitionError::new(self, action)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Pending,
    Invited,
    Accepted,
    Rejected,
    Revoked,
}

impl MembershipStatus {
    /// Statuses that block a second invite for the same identity
    pub fn is_active_or_pending(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Pending | MembershipStatus::Invited | MembershipStatus::Accepted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    /// The owner wraps the keys for an invitee who signed up after the invite
    Confirm,
    Accept,
    Reject,
    Revoke,
    Restore,
    ChangeRole,
    Update,
}

impl MembershipStatus {
    /// PENDING|INVITED → ACCEPTED/REJECTED, PENDING → ACCEPTED on confirm,
    /// ACCEPTED → REVOKED, REVOKED → ACCEPTED.
    /// Role changes and profile updates keep the status.
    pub fn transition(self, action: MembershipAction) -> Result<MembershipStatus, TransitionError> {
        use MembershipAction::*;
        use MembershipStatus::*;
        match (self, action) {
            (Pending | Invited, Accept) => Ok(Accepted),
            (Pending, Confirm) => Ok(Accepted),
            (Pending | Invited, Reject) => Ok(Rejected),
            (Accepted, Revoke) => Ok(Revoked),
            (Revoked, Restore) => Ok(Accepted),
            (Pending | Invited | Accepted, ChangeRole | Update) => Ok(self),
            _ => Err(TransitionError::new(self, action)),
        }
    }
}

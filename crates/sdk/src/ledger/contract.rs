//! The vault contract: a pure fold from an ordered log to object state
//!
//! [`ContractState::apply`] validates one transaction against the state folded
//! so far and either applies it completely or leaves the state untouched.
//! Replaying the same log therefore always yields the same state, which is
//! what lets any party re-derive and verify what a gateway reports.

use std::collections::BTreeMap;

use uuid::Uuid;

use super::transaction::{tag_names, ContractFunction, Transaction};
use super::{LedgerObject, MembershipRecord, NodeRecord, VaultRecord};
use crate::types::{
    MembershipAction, MembershipStatus, NodeAction, NodeKind, NodeStatus, Role, TransitionError,
    VaultAction, VaultStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("invalid parent: {0}")]
    InvalidParent(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Transition(#[from] TransitionError),
}

/// Everything the contract knows about one vault
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractState {
    pub vault: Option<VaultRecord>,
    pub memberships: BTreeMap<Uuid, MembershipRecord>,
    pub nodes: BTreeMap<Uuid, NodeRecord>,
}

impl ContractState {
    /// Replay a whole log from the empty state
    pub fn fold<'a, I>(transactions: I) -> Result<Self, ContractError>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut state = Self::default();
        for transaction in transactions {
            state.apply(transaction)?;
        }
        Ok(state)
    }

    /// Validate and apply a single transaction
    ///
    /// Returns the touched object as it stands after the transaction.
    pub fn apply(&mut self, tx: &Transaction) -> Result<LedgerObject, ContractError> {
        let signer = tx
            .signer()
            .ok_or(ContractError::Missing(tag_names::SIGNER_ADDRESS))?
            .to_string();

        match tx.input.function {
            ContractFunction::VaultInit => self.vault_init(tx, signer),
            ContractFunction::VaultUpdate
            | ContractFunction::VaultArchive
            | ContractFunction::VaultRestore
            | ContractFunction::VaultDelete => self.vault_transition(tx, &signer),
            ContractFunction::MembershipAdd => self.membership_add(tx, signer),
            ContractFunction::MembershipInvite => self.membership_invite(tx, signer),
            ContractFunction::MembershipConfirm => self.membership_confirm(tx, signer),
            ContractFunction::MembershipAccept
            | ContractFunction::MembershipReject
            | ContractFunction::MembershipRevoke
            | ContractFunction::MembershipRestore
            | ContractFunction::MembershipChangeRole
            | ContractFunction::MembershipUpdate => self.membership_transition(tx, &signer),
            ContractFunction::NodeCreate => self.node_create(tx, signer),
            ContractFunction::NodeUpdate
            | ContractFunction::NodeMove
            | ContractFunction::NodeRevoke
            | ContractFunction::NodeRestore
            | ContractFunction::NodeDelete => self.node_transition(tx, &signer),
        }
    }

    /// Role of an accepted member, if `address` is one
    pub fn member_role(&self, address: &str) -> Option<Role> {
        self.memberships
            .values()
            .find(|m| m.address.as_deref() == Some(address) && m.status == MembershipStatus::Accepted)
            .map(|m| m.role)
    }

    fn vault(&self) -> Result<&VaultRecord, ContractError> {
        self.vault
            .as_ref()
            .ok_or_else(|| ContractError::NotFound("vault".to_string()))
    }

    /// The vault must exist and accept writes to its content
    fn writable_vault(&self) -> Result<&VaultRecord, ContractError> {
        let vault = self.vault()?;
        if vault.status != VaultStatus::Active {
            return Err(TransitionError {
                from: format!("{:?}", vault.status).to_uppercase(),
                action: "write".to_string(),
            }
            .into());
        }
        Ok(vault)
    }

    fn require_role(&self, signer: &str, allowed: &[Role]) -> Result<(), ContractError> {
        match self.member_role(signer) {
            Some(role) if allowed.contains(&role) => Ok(()),
            Some(role) => Err(ContractError::Unauthorized(format!(
                "{} holds role {}",
                signer, role
            ))),
            None => Err(ContractError::Unauthorized(format!(
                "{} is not a member",
                signer
            ))),
        }
    }

    fn vault_init(&mut self, tx: &Transaction, signer: String) -> Result<LedgerObject, ContractError> {
        if self.vault.is_some() {
            return Err(ContractError::AlreadyExists(format!("vault {}", tx.vault_id)));
        }
        let data = tx.input.data.clone().ok_or(ContractError::Missing("data"))?;
        let vault = VaultRecord {
            id: tx.vault_id,
            owner: signer,
            public: tx.tags.get(tag_names::PUBLIC) == Some("true"),
            status: VaultStatus::Active,
            size: 0,
            data: vec![data],
            created_at: tx.timestamp,
            updated_at: tx.timestamp,
        };
        self.vault = Some(vault.clone());
        Ok(LedgerObject::Vault(vault))
    }

    fn vault_transition(&mut self, tx: &Transaction, signer: &str) -> Result<LedgerObject, ContractError> {
        let action = match tx.input.function {
            ContractFunction::VaultUpdate => VaultAction::Update,
            ContractFunction::VaultArchive => VaultAction::Archive,
            ContractFunction::VaultRestore => VaultAction::Restore,
            _ => VaultAction::Delete,
        };
        let mut vault = self.vault()?.clone();
        self.require_role(signer, &[Role::Owner])?;
        vault.status = vault.status.transition(action)?;
        if action == VaultAction::Update {
            let data = tx.input.data.clone().ok_or(ContractError::Missing("data"))?;
            vault.data.push(data);
        }
        vault.updated_at = tx.timestamp;

        self.vault = Some(vault.clone());
        Ok(LedgerObject::Vault(vault))
    }

    fn membership_add(&mut self, tx: &Transaction, signer: String) -> Result<LedgerObject, ContractError> {
        let vault = self.writable_vault()?;
        if vault.owner != signer {
            return Err(ContractError::Unauthorized(
                "only the vault owner adds members directly".to_string(),
            ));
        }
        let id = tx.object_id().ok_or(ContractError::Missing(tag_names::OBJECT_ID))?;
        let address = tx.input.address.clone().unwrap_or_else(|| signer.clone());
        self.check_new_membership(id, &address)?;

        let membership = MembershipRecord {
            id,
            vault_id: tx.vault_id,
            owner: signer,
            address: Some(address),
            email: None,
            status: MembershipStatus::Accepted,
            role: tx.input.role.unwrap_or(Role::Owner),
            data: tx.input.data.iter().cloned().collect(),
            created_at: tx.timestamp,
            updated_at: tx.timestamp,
        };
        self.memberships.insert(id, membership.clone());
        Ok(LedgerObject::Membership(membership))
    }

    fn membership_invite(&mut self, tx: &Transaction, signer: String) -> Result<LedgerObject, ContractError> {
        self.writable_vault()?;
        self.require_role(&signer, &[Role::Owner])?;
        let id = tx.object_id().ok_or(ContractError::Missing(tag_names::OBJECT_ID))?;
        let address = tx.input.address.clone().ok_or(ContractError::Missing("address"))?;
        let role = tx.input.role.ok_or(ContractError::Missing("role"))?;
        let data = tx.input.data.clone().ok_or(ContractError::Missing("data"))?;
        self.check_new_membership(id, &address)?;

        let membership = MembershipRecord {
            id,
            vault_id: tx.vault_id,
            owner: signer,
            address: Some(address),
            email: None,
            status: MembershipStatus::Invited,
            role,
            data: vec![data],
            created_at: tx.timestamp,
            updated_at: tx.timestamp,
        };
        self.memberships.insert(id, membership.clone());
        Ok(LedgerObject::Membership(membership))
    }

    /// An invite the backend kept for a user without an account, now carrying
    /// keys wrapped for the account they signed up with
    fn membership_confirm(&mut self, tx: &Transaction, signer: String) -> Result<LedgerObject, ContractError> {
        self.writable_vault()?;
        self.require_role(&signer, &[Role::Owner])?;
        let id = tx.object_id().ok_or(ContractError::Missing(tag_names::OBJECT_ID))?;
        let address = tx.input.address.clone().ok_or(ContractError::Missing("address"))?;
        let role = tx.input.role.ok_or(ContractError::Missing("role"))?;
        let data = tx.input.data.clone().ok_or(ContractError::Missing("data"))?;
        self.check_new_membership(id, &address)?;

        let membership = MembershipRecord {
            id,
            vault_id: tx.vault_id,
            owner: signer,
            address: Some(address),
            email: None,
            status: MembershipStatus::Pending.transition(MembershipAction::Confirm)?,
            role,
            data: vec![data],
            created_at: tx.timestamp,
            updated_at: tx.timestamp,
        };
        self.memberships.insert(id, membership.clone());
        Ok(LedgerObject::Membership(membership))
    }

    fn check_new_membership(&self, id: Uuid, address: &str) -> Result<(), ContractError> {
        if self.memberships.contains_key(&id) {
            return Err(ContractError::AlreadyExists(format!("membership {}", id)));
        }
        let taken = self.memberships.values().any(|m| {
            m.address.as_deref() == Some(address) && m.status.is_active_or_pending()
        });
        if taken {
            return Err(ContractError::AlreadyExists(format!("member {}", address)));
        }
        Ok(())
    }

    fn membership_transition(
        &mut self,
        tx: &Transaction,
        signer: &str,
    ) -> Result<LedgerObject, ContractError> {
        self.writable_vault()?;
        let id = tx.object_id().ok_or(ContractError::Missing(tag_names::OBJECT_ID))?;
        let mut membership = self
            .memberships
            .get(&id)
            .cloned()
            .ok_or_else(|| ContractError::NotFound(format!("membership {}", id)))?;
        let is_member = membership.address.as_deref() == Some(signer);

        let action = match tx.input.function {
            ContractFunction::MembershipAccept => MembershipAction::Accept,
            ContractFunction::MembershipReject => MembershipAction::Reject,
            ContractFunction::MembershipRevoke => MembershipAction::Revoke,
            ContractFunction::MembershipRestore => MembershipAction::Restore,
            ContractFunction::MembershipChangeRole => MembershipAction::ChangeRole,
            _ => MembershipAction::Update,
        };
        match action {
            MembershipAction::Accept | MembershipAction::Reject if !is_member => {
                return Err(ContractError::Unauthorized(format!(
                    "{} cannot answer an invite addressed to someone else",
                    signer
                )));
            }
            MembershipAction::Accept | MembershipAction::Reject => {}
            MembershipAction::Update if is_member => {}
            _ => {
                self.require_role(signer, &[Role::Owner])?;
                if membership.address.as_deref() == Some(self.vault()?.owner.as_str()) {
                    return Err(ContractError::Unauthorized(
                        "the vault owner's membership is fixed".to_string(),
                    ));
                }
            }
        }

        membership.status = membership.status.transition(action)?;
        if action == MembershipAction::ChangeRole {
            membership.role = tx.input.role.ok_or(ContractError::Missing("role"))?;
        }
        if let Some(data) = &tx.input.data {
            membership.data.push(data.clone());
        } else if action == MembershipAction::Update {
            return Err(ContractError::Missing("data"));
        }
        membership.updated_at = tx.timestamp;

        self.memberships.insert(id, membership.clone());
        Ok(LedgerObject::Membership(membership))
    }

    /// A parent must be a live folder of this vault other than the node itself
    /// and must not sit underneath it
    fn check_parent(&self, node_id: Uuid, parent_id: Option<Uuid>) -> Result<(), ContractError> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        let mut cursor = Some(parent_id);
        while let Some(id) = cursor {
            if id == node_id {
                return Err(ContractError::InvalidParent(format!(
                    "{} would contain itself",
                    node_id
                )));
            }
            let folder = self.nodes.get(&id).ok_or_else(|| {
                ContractError::InvalidParent(format!("{} is not a folder of this vault", id))
            })?;
            if folder.kind != NodeKind::Folder || folder.status == NodeStatus::Deleted {
                return Err(ContractError::InvalidParent(format!(
                    "{} is not a live folder",
                    id
                )));
            }
            cursor = folder.parent_id;
        }
        Ok(())
    }

    fn grow_vault(&mut self, tx: &Transaction) {
        let size = tx
            .tags
            .get(tag_names::FILE_SIZE)
            .and_then(|value| value.parse::<u64>().ok());
        if let (Some(size), Some(vault)) = (size, self.vault.as_mut()) {
            vault.size += size;
        }
    }

    fn node_create(&mut self, tx: &Transaction, signer: String) -> Result<LedgerObject, ContractError> {
        self.writable_vault()?;
        self.require_role(&signer, &[Role::Owner, Role::Contributor])?;
        let id = tx.object_id().ok_or(ContractError::Missing(tag_names::OBJECT_ID))?;
        let kind = tx
            .tags
            .get(tag_names::NODE_TYPE)
            .and_then(NodeKind::from_wire)
            .ok_or(ContractError::Missing(tag_names::NODE_TYPE))?;
        let data = tx.input.data.clone().ok_or(ContractError::Missing("data"))?;
        if self.nodes.contains_key(&id) {
            return Err(ContractError::AlreadyExists(format!("node {}", id)));
        }
        self.check_parent(id, tx.input.parent_id)?;

        let node = NodeRecord {
            id,
            vault_id: tx.vault_id,
            kind,
            owner: signer,
            parent_id: tx.input.parent_id,
            status: NodeStatus::Active,
            data: vec![data],
            created_at: tx.timestamp,
            updated_at: tx.timestamp,
        };
        self.nodes.insert(id, node.clone());
        self.grow_vault(tx);
        Ok(LedgerObject::Node(node))
    }

    fn node_transition(&mut self, tx: &Transaction, signer: &str) -> Result<LedgerObject, ContractError> {
        self.writable_vault()?;
        self.require_role(signer, &[Role::Owner, Role::Contributor])?;
        let id = tx.object_id().ok_or(ContractError::Missing(tag_names::OBJECT_ID))?;
        let mut node = self
            .nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| ContractError::NotFound(format!("node {}", id)))?;

        let action = match tx.input.function {
            ContractFunction::NodeUpdate => NodeAction::Update,
            ContractFunction::NodeMove => NodeAction::Move,
            ContractFunction::NodeRevoke => NodeAction::Revoke,
            ContractFunction::NodeRestore => NodeAction::Restore,
            _ => NodeAction::Delete,
        };
        node.status = node.status.transition(action)?;

        if action == NodeAction::Move {
            self.check_parent(id, tx.input.parent_id)?;
            node.parent_id = tx.input.parent_id;
        }
        match &tx.input.data {
            Some(data) => node.data.push(data.clone()),
            None if action == NodeAction::Update => return Err(ContractError::Missing("data")),
            None => {}
        }
        node.updated_at = tx.timestamp;

        self.nodes.insert(id, node.clone());
        self.grow_vault(tx);
        Ok(LedgerObject::Node(node))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ledger::{ContractInput, Tags};

    const OWNER: &str = "owner-address";
    const GUEST: &str = "guest-address";

    struct Log {
        vault_id: Uuid,
        transactions: Vec<Transaction>,
    }

    impl Log {
        fn new() -> Self {
            Self {
                vault_id: Uuid::new_v4(),
                transactions: Vec::new(),
            }
        }

        fn tx(&self, signer: &str, object: Option<Uuid>, input: ContractInput) -> Transaction {
            let mut tags = Tags::new().with(tag_names::SIGNER_ADDRESS, signer);
            if let Some(object) = object {
                tags.push(tag_names::OBJECT_ID, object.to_string());
            }
            if input.function == ContractFunction::NodeCreate {
                tags.push(tag_names::NODE_TYPE, "Folder");
            }
            Transaction {
                id: Uuid::new_v4().to_string(),
                vault_id: self.vault_id,
                input,
                tags,
                sequence: self.transactions.len() as u64,
                timestamp: 1_000 + self.transactions.len() as i64,
            }
        }

        fn push(&mut self, state: &mut ContractState, tx: Transaction) -> Result<LedgerObject, ContractError> {
            let object = state.apply(&tx)?;
            self.transactions.push(tx);
            Ok(object)
        }
    }

    fn bootstrap() -> (Log, ContractState) {
        let mut log = Log::new();
        let mut state = ContractState::default();
        let init = log.tx(OWNER, None, ContractInput::new(ContractFunction::VaultInit).with_data("s0"));
        log.push(&mut state, init).unwrap();
        let add = log.tx(
            OWNER,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::MembershipAdd),
        );
        log.push(&mut state, add).unwrap();
        (log, state)
    }

    fn folder(log: &mut Log, state: &mut ContractState, parent: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let tx = log.tx(
            OWNER,
            Some(id),
            ContractInput::new(ContractFunction::NodeCreate)
                .with_data(format!("state-{}", id))
                .with_parent_id(parent),
        );
        log.push(state, tx).unwrap();
        id
    }

    #[test]
    fn test_fold_is_deterministic() {
        let (mut log, mut state) = bootstrap();
        let docs = folder(&mut log, &mut state, None);
        let nested = folder(&mut log, &mut state, Some(docs));
        let revoke = log.tx(OWNER, Some(nested), ContractInput::new(ContractFunction::NodeRevoke));
        log.push(&mut state, revoke).unwrap();

        let first = ContractState::fold(&log.transactions).unwrap();
        let second = ContractState::fold(&log.transactions).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, state);
        assert_eq!(first.nodes[&nested].status, NodeStatus::Revoked);
    }

    #[test]
    fn test_rejected_transaction_leaves_state_untouched() {
        let (mut log, mut state) = bootstrap();
        let before = state.clone();
        let orphan = log.tx(
            OWNER,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::NodeCreate)
                .with_data("s")
                .with_parent_id(Some(Uuid::new_v4())),
        );
        assert!(matches!(
            log.push(&mut state, orphan),
            Err(ContractError::InvalidParent(_))
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn test_parent_must_be_live_folder() {
        let (mut log, mut state) = bootstrap();
        let docs = folder(&mut log, &mut state, None);
        let delete = log.tx(OWNER, Some(docs), ContractInput::new(ContractFunction::NodeDelete));
        log.push(&mut state, delete).unwrap();

        let child = log.tx(
            OWNER,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::NodeCreate)
                .with_data("s")
                .with_parent_id(Some(docs)),
        );
        assert!(matches!(
            log.push(&mut state, child),
            Err(ContractError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let (mut log, mut state) = bootstrap();
        let outer = folder(&mut log, &mut state, None);
        let inner = folder(&mut log, &mut state, Some(outer));

        let into_self = log.tx(
            OWNER,
            Some(outer),
            ContractInput::new(ContractFunction::NodeMove).with_parent_id(Some(outer)),
        );
        assert!(log.push(&mut state, into_self).is_err());

        let into_child = log.tx(
            OWNER,
            Some(outer),
            ContractInput::new(ContractFunction::NodeMove).with_parent_id(Some(inner)),
        );
        assert!(log.push(&mut state, into_child).is_err());

        let to_root = log.tx(
            OWNER,
            Some(inner),
            ContractInput::new(ContractFunction::NodeMove).with_parent_id(None),
        );
        let moved = log.push(&mut state, to_root).unwrap().into_node().unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[test]
    fn test_deleted_node_is_terminal() {
        let (mut log, mut state) = bootstrap();
        let docs = folder(&mut log, &mut state, None);
        let delete = log.tx(OWNER, Some(docs), ContractInput::new(ContractFunction::NodeDelete));
        log.push(&mut state, delete).unwrap();

        for function in [
            ContractFunction::NodeRestore,
            ContractFunction::NodeRevoke,
            ContractFunction::NodeDelete,
        ] {
            let tx = log.tx(OWNER, Some(docs), ContractInput::new(function));
            assert!(matches!(
                log.push(&mut state, tx),
                Err(ContractError::Transition(_))
            ));
        }
        let rename = log.tx(
            OWNER,
            Some(docs),
            ContractInput::new(ContractFunction::NodeUpdate).with_data("s2"),
        );
        assert!(log.push(&mut state, rename).is_err());
    }

    #[test]
    fn test_invite_flow_and_permissions() {
        let (mut log, mut state) = bootstrap();
        let membership = Uuid::new_v4();

        // non-members cannot write
        let intruder = log.tx(
            GUEST,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::NodeCreate).with_data("s"),
        );
        assert!(matches!(
            log.push(&mut state, intruder),
            Err(ContractError::Unauthorized(_))
        ));

        let invite = log.tx(
            OWNER,
            Some(membership),
            ContractInput::new(ContractFunction::MembershipInvite)
                .with_address(GUEST)
                .with_role(Role::Viewer)
                .with_data("keys"),
        );
        log.push(&mut state, invite).unwrap();

        let again = log.tx(
            OWNER,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::MembershipInvite)
                .with_address(GUEST)
                .with_role(Role::Viewer)
                .with_data("keys"),
        );
        assert!(matches!(
            log.push(&mut state, again),
            Err(ContractError::AlreadyExists(_))
        ));

        let hijack = log.tx(
            OWNER,
            Some(membership),
            ContractInput::new(ContractFunction::MembershipAccept),
        );
        assert!(log.push(&mut state, hijack).is_err());

        let accept = log.tx(
            GUEST,
            Some(membership),
            ContractInput::new(ContractFunction::MembershipAccept),
        );
        log.push(&mut state, accept).unwrap();
        assert_eq!(state.member_role(GUEST), Some(Role::Viewer));

        // viewers read only
        let write = log.tx(
            GUEST,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::NodeCreate).with_data("s"),
        );
        assert!(log.push(&mut state, write).is_err());

        let promote = log.tx(
            OWNER,
            Some(membership),
            ContractInput::new(ContractFunction::MembershipChangeRole).with_role(Role::Contributor),
        );
        let promoted = log.push(&mut state, promote).unwrap().into_membership().unwrap();
        assert_eq!(promoted.status, MembershipStatus::Accepted);
        assert_eq!(promoted.role, Role::Contributor);
    }

    #[test]
    fn test_confirm_grants_access_without_accept() {
        let (mut log, mut state) = bootstrap();
        let membership = Uuid::new_v4();
        let confirm = |log: &Log, signer: &str| {
            log.tx(
                signer,
                Some(membership),
                ContractInput::new(ContractFunction::MembershipConfirm)
                    .with_address(GUEST)
                    .with_role(Role::Contributor)
                    .with_data("keys"),
            )
        };

        let forged = confirm(&log, GUEST);
        assert!(matches!(
            log.push(&mut state, forged),
            Err(ContractError::Unauthorized(_))
        ));

        let tx = confirm(&log, OWNER);
        let confirmed = log.push(&mut state, tx).unwrap().into_membership().unwrap();
        assert_eq!(confirmed.status, MembershipStatus::Accepted);
        assert_eq!(confirmed.email, None);
        assert_eq!(state.member_role(GUEST), Some(Role::Contributor));

        let write = log.tx(
            GUEST,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::NodeCreate).with_data("s"),
        );
        log.push(&mut state, write).unwrap();

        let replay = confirm(&log, OWNER);
        assert!(matches!(
            log.push(&mut state, replay),
            Err(ContractError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_archived_vault_is_read_only() {
        let (mut log, mut state) = bootstrap();
        let archive = log.tx(OWNER, None, ContractInput::new(ContractFunction::VaultArchive));
        log.push(&mut state, archive).unwrap();

        let write = log.tx(
            OWNER,
            Some(Uuid::new_v4()),
            ContractInput::new(ContractFunction::NodeCreate).with_data("s"),
        );
        assert!(log.push(&mut state, write).is_err());

        let restore = log.tx(OWNER, None, ContractInput::new(ContractFunction::VaultRestore));
        let vault = log.push(&mut state, restore).unwrap().into_vault().unwrap();
        assert_eq!(vault.status, VaultStatus::Active);
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use super::base::ServiceContext;
use super::node::{NodeModel, NodeOp, NodePatch, NodeService, Step};
use super::tags::ActionRef;
use super::{NodeCreated, ServiceError, Updated};
use crate::ledger::Tags;
use crate::storage::StorageGateway;
use crate::types::{
    now_millis, MemoReaction, MemoVersion, Node, NodeAction, NodeKind, NodeState, ObjectType,
    Reaction,
};

/// Short messages with reactions; memos have no name to rename
#[derive(Debug, Clone, Copy)]
pub struct Memo;

pub type MemoService = NodeService<Memo>;

/// Who a reaction belongs to, matched on any of the three
#[derive(Debug, Clone)]
pub(crate) struct Reactor {
    pub address: String,
    pub public_signing_key: String,
}

impl Reactor {
    fn owns(&self, reaction: &MemoReaction) -> bool {
        reaction.owner == self.address
            || reaction.address.as_deref() == Some(self.address.as_str())
            || reaction.public_signing_key.as_deref() == Some(self.public_signing_key.as_str())
    }

    fn react(&self, reaction: Reaction) -> MemoReaction {
        MemoReaction {
            reaction: reaction.emoji().to_string(),
            owner: self.address.clone(),
            address: Some(self.address.clone()),
            public_signing_key: Some(self.public_signing_key.clone()),
            created_at: now_millis(),
        }
    }
}

/// Remove the first reaction of `reactor` with the given emoji
///
/// Insertion never checks for duplicates, so only one entry goes per call.
pub(crate) fn remove_reaction(
    version: &mut MemoVersion,
    reactor: &Reactor,
    reaction: Reaction,
) -> Result<MemoReaction, ServiceError> {
    let position = version
        .reactions
        .iter()
        .position(|r| reactor.owns(r) && r.reaction == reaction.emoji())
        .ok_or_else(|| {
            ServiceError::NotFound(format!("reaction {} of {}", reaction, reactor.address))
        })?;
    Ok(version.reactions.remove(position))
}

#[async_trait]
impl NodeModel for Memo {
    const KIND: NodeKind = NodeKind::Memo;
    const OBJECT_TYPE: ObjectType = ObjectType::Memo;

    type Version = MemoVersion;
    type View = Node<MemoVersion>;

    fn action_ref(op: NodeOp) -> Option<ActionRef> {
        match op {
            NodeOp::Create => Some(ActionRef::MemoCreate),
            NodeOp::Rename => None,
            NodeOp::Move => Some(ActionRef::MemoMove),
            NodeOp::Revoke => Some(ActionRef::MemoRevoke),
            NodeOp::Restore => Some(ActionRef::MemoRestore),
            NodeOp::Delete => Some(ActionRef::MemoDelete),
        }
    }

    fn map_strings(
        version: &MemoVersion,
        f: &dyn Fn(&str) -> Result<String, ServiceError>,
    ) -> Result<MemoVersion, ServiceError> {
        let reactions = version
            .reactions
            .iter()
            .map(|r| {
                Ok(MemoReaction {
                    reaction: f(&r.reaction)?,
                    ..r.clone()
                })
            })
            .collect::<Result<_, ServiceError>>()?;
        Ok(MemoVersion {
            message: f(&version.message)?,
            reactions,
            ..version.clone()
        })
    }

    /// Reactions of other identities keep their stored ciphertext
    fn reseal(
        sealed: &MemoVersion,
        before: &MemoVersion,
        after: &MemoVersion,
        f: &dyn Fn(&str) -> Result<String, ServiceError>,
    ) -> Result<MemoVersion, ServiceError> {
        let mut taken = vec![false; before.reactions.len()];
        let mut reactions = Vec::with_capacity(after.reactions.len());
        for reaction in &after.reactions {
            let kept = before
                .reactions
                .iter()
                .enumerate()
                .position(|(i, r)| !taken[i] && r == reaction)
                .and_then(|i| sealed.reactions.get(i).map(|r| (i, r)));
            match kept {
                Some((i, r)) => {
                    taken[i] = true;
                    reactions.push(r.clone());
                }
                None => reactions.push(MemoReaction {
                    reaction: f(&reaction.reaction)?,
                    ..reaction.clone()
                }),
            }
        }
        let message = if before.message == after.message {
            sealed.message.clone()
        } else {
            f(&after.message)?
        };
        Ok(MemoVersion {
            message,
            reactions,
            ..after.clone()
        })
    }

    fn apply_patch(
        state: &NodeState<MemoVersion>,
        patch: NodePatch<MemoVersion>,
    ) -> Result<NodeState<MemoVersion>, ServiceError> {
        match patch {
            NodePatch::EditLatest(_) => patch.apply(state),
            other => Err(other.unsupported(Self::OBJECT_TYPE)),
        }
    }

    async fn present(
        _storage: &dyn StorageGateway,
        _ctx: &ServiceContext,
        node: Node<MemoVersion>,
        _opened: bool,
    ) -> Result<Node<MemoVersion>, ServiceError> {
        Ok(node)
    }
}

impl NodeService<Memo> {
    fn reactor(&self) -> Reactor {
        Reactor {
            address: self.client().wallet.address(),
            public_signing_key: self.client().wallet.public_signing_key().to_hex(),
        }
    }

    pub async fn create(
        &self,
        vault_id: Uuid,
        message: impl Into<String>,
        parent_id: Option<Uuid>,
    ) -> Result<NodeCreated<Node<MemoVersion>>, ServiceError> {
        let version = MemoVersion {
            owner: self.client().wallet.address(),
            message: message.into(),
            created_at: now_millis(),
            reactions: Vec::new(),
            attachments: Vec::new(),
        };
        let vault = self.vault_context(vault_id).await?;
        self.create_node(
            &vault,
            NodeState::new(String::new(), vec![version], Vec::new()),
            parent_id,
            Tags::new(),
        )
        .await
    }

    /// React on the latest version as the client's identity
    pub async fn add_reaction(
        &self,
        id: Uuid,
        reaction: Reaction,
    ) -> Result<Updated<Node<MemoVersion>>, ServiceError> {
        let entry = self.reactor().react(reaction);
        let patch = NodePatch::edit_latest(move |version: &mut MemoVersion| {
            version.reactions.push(entry);
            Ok(())
        });
        let step = Step::new(NodeAction::Update, ActionRef::MemoAddReaction).with_patch(patch);
        self.update(None, id, step).await
    }

    /// # Errors
    ///
    /// [`ServiceError::NotFound`] when the client's identity holds no such reaction.
    pub async fn remove_reaction(
        &self,
        id: Uuid,
        reaction: Reaction,
    ) -> Result<Updated<Node<MemoVersion>>, ServiceError> {
        let reactor = self.reactor();
        let patch = NodePatch::edit_latest(move |version: &mut MemoVersion| {
            remove_reaction(version, &reactor, reaction).map(|_| ())
        });
        let step = Step::new(NodeAction::Update, ActionRef::MemoRemoveReaction).with_patch(patch);
        self.update(None, id, step).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reactor(name: &str) -> Reactor {
        Reactor {
            address: name.to_string(),
            public_signing_key: format!("{}-key", name),
        }
    }

    fn memo() -> MemoVersion {
        MemoVersion {
            owner: "a".to_string(),
            message: "status update".to_string(),
            created_at: 0,
            reactions: Vec::new(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_remove_only_own_reaction() {
        let (a, b) = (reactor("a"), reactor("b"));
        let mut version = memo();
        version.reactions.push(a.react(Reaction::Fire));
        version.reactions.push(b.react(Reaction::Fire));

        let removed = remove_reaction(&mut version, &a, Reaction::Fire).unwrap();
        assert_eq!(removed.owner, "a");
        assert_eq!(version.reactions.len(), 1);
        assert_eq!(version.reactions[0].owner, "b");

        assert!(matches!(
            remove_reaction(&mut version, &a, Reaction::Fire),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_match_by_signing_key() {
        let a = reactor("a");
        let mut version = memo();
        version.reactions.push(MemoReaction {
            reaction: Reaction::Heart.emoji().to_string(),
            owner: "old-address".to_string(),
            address: None,
            public_signing_key: Some(a.public_signing_key.clone()),
            created_at: 0,
        });

        assert!(remove_reaction(&mut version, &a, Reaction::Joy).is_err());
        assert!(remove_reaction(&mut version, &a, Reaction::Heart).is_ok());
        assert!(version.reactions.is_empty());
    }

    #[test]
    fn test_duplicates_removed_one_at_a_time() {
        let a = reactor("a");
        let mut version = memo();
        version.reactions.push(a.react(Reaction::ThumbsUp));
        version.reactions.push(a.react(Reaction::ThumbsUp));

        remove_reaction(&mut version, &a, Reaction::ThumbsUp).unwrap();
        assert_eq!(version.reactions.len(), 1);
    }

    #[test]
    fn test_reseal_keeps_other_reactions() {
        let (a, b) = (reactor("a"), reactor("b"));
        let mut before = memo();
        before.reactions.push(a.react(Reaction::Fire));
        before.reactions.push(b.react(Reaction::Heart));
        let stored = |s: &str| Ok::<_, ServiceError>(format!("sealed:{}", s));
        let fresh = |s: &str| Ok::<_, ServiceError>(format!("new:{}", s));
        let sealed = Memo::map_strings(&before, &stored).unwrap();

        let mut after = before.clone();
        remove_reaction(&mut after, &a, Reaction::Fire).unwrap();
        after.reactions.push(a.react(Reaction::Joy));

        let resealed = Memo::reseal(&sealed, &before, &after, &fresh).unwrap();
        assert_eq!(resealed.message, "sealed:status update");
        assert_eq!(resealed.reactions.len(), 2);
        assert_eq!(resealed.reactions[0], sealed.reactions[1]);
        assert_eq!(resealed.reactions[1].reaction, format!("new:{}", Reaction::Joy.emoji()));
    }

    #[test]
    fn test_memo_cannot_be_renamed() {
        let state = NodeState::new(String::new(), vec![memo()], Vec::new());
        assert!(Memo::action_ref(NodeOp::Rename).is_none());
        assert!(Memo::apply_patch(&state, NodePatch::Rename("x".to_string())).is_err());
    }
}

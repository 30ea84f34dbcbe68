//! Integration tests for memos and their reactions

mod common;

use permavault::prelude::*;

#[tokio::test]
async fn test_create_memo() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;

    let created = owner
        .client()
        .memo()
        .create(vault_id, "standup at 10", None)
        .await
        .unwrap();
    let memo = owner.client().memo().get(created.node_id).await.unwrap();
    assert_eq!(memo.name, "");
    assert_eq!(memo.versions.len(), 1);
    assert_eq!(memo.versions[0].message, "standup at 10");
    assert_eq!(memo.versions[0].owner, owner.address());
    assert!(memo.versions[0].reactions.is_empty());
}

#[tokio::test]
async fn test_remove_only_own_reaction() {
    let (mut net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let member = net.add_user(common::MEMBER).unwrap();
    common::join(&owner, &member, vault_id, Role::Contributor).await;

    let id = owner
        .client()
        .memo()
        .create(vault_id, "ship it?", None)
        .await
        .unwrap()
        .node_id;
    owner
        .client()
        .memo()
        .add_reaction(id, Reaction::ThumbsUp)
        .await
        .unwrap();
    let both = member
        .client()
        .memo()
        .add_reaction(id, Reaction::ThumbsUp)
        .await
        .unwrap();
    assert_eq!(both.object.versions[0].reactions.len(), 2);

    let after = owner
        .client()
        .memo()
        .remove_reaction(id, Reaction::ThumbsUp)
        .await
        .unwrap();
    let reactions = &after.object.versions[0].reactions;
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].reaction, "👍");
    assert_eq!(reactions[0].owner, member.address());

    // the owner has nothing left to remove
    assert!(matches!(
        owner
            .client()
            .memo()
            .remove_reaction(id, Reaction::ThumbsUp)
            .await,
        Err(ServiceError::NotFound(_))
    ));

    let memo = member.client().memo().get(id).await.unwrap();
    assert_eq!(memo.versions[0].reactions.len(), 1);
    assert_eq!(memo.versions.len(), 1);
}

#[tokio::test]
async fn test_reactions_are_sealed() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let memos = owner.client().memo();

    let id = memos.create(vault_id, "fire drill", None).await.unwrap().node_id;
    memos.add_reaction(id, Reaction::Fire).await.unwrap();

    let sealed = memos.fetch(id, Some(false)).await.unwrap();
    assert_ne!(sealed.versions[0].message, "fire drill");
    assert_ne!(sealed.versions[0].reactions[0].reaction, "🔥");

    let opened = memos.get(id).await.unwrap();
    assert_eq!(opened.versions[0].reactions[0].reaction, "🔥");
}

#[tokio::test]
async fn test_reaction_leaves_others_as_stored() {
    let (mut net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let member = net.add_user(common::MEMBER).unwrap();
    common::join(&owner, &member, vault_id, Role::Contributor).await;

    let id = owner
        .client()
        .memo()
        .create(vault_id, "retro notes", None)
        .await
        .unwrap()
        .node_id;
    member
        .client()
        .memo()
        .add_reaction(id, Reaction::Heart)
        .await
        .unwrap();
    let before = owner.client().memo().fetch(id, Some(false)).await.unwrap();
    let after = owner
        .client()
        .memo()
        .add_reaction(id, Reaction::Fire)
        .await
        .unwrap();

    let stored = |index: usize| -> serde_json::Value {
        let raw = net.storage().raw(&after.object.data[index]).unwrap();
        serde_json::from_slice(&raw).unwrap()
    };
    let (earlier, latest) = (stored(1), stored(2));
    assert_eq!(earlier["versions"][0]["message"], latest["versions"][0]["message"]);
    assert_eq!(
        earlier["versions"][0]["reactions"][0],
        latest["versions"][0]["reactions"][0]
    );
    assert_eq!(
        latest["versions"][0]["reactions"][0]["reaction"],
        before.versions[0].reactions[0].reaction.as_str()
    );
    assert_eq!(after.object.versions[0].reactions[1].reaction, "🔥");
}

#[tokio::test]
async fn test_memo_cannot_be_renamed() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let memos = owner.client().memo();

    let id = memos.create(vault_id, "hi", None).await.unwrap().node_id;
    assert!(matches!(
        memos.rename(id, "named").await,
        Err(ServiceError::BadRequest(_))
    ));
    assert_eq!(memos.history(id).await.unwrap().len(), 1);
}

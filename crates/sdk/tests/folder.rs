//! Integration tests for folder operations

mod common;

use permavault::ledger::ContractFunction;
use permavault::prelude::*;

#[tokio::test]
async fn test_create_folder() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;

    let created = owner.client().folder().create(vault_id, "Docs", None).await.unwrap();
    assert_eq!(created.object.name, "Docs");
    assert_eq!(created.object.parent_id, None);
    assert_eq!(created.object.status, NodeStatus::Active);
    assert_eq!(created.object.owner, owner.address());

    let folder = owner.client().folder().get(created.node_id).await.unwrap();
    assert_eq!(folder.name, "Docs");
    assert_eq!(folder.vault_id, vault_id);
}

#[tokio::test]
async fn test_create_nested_folder() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let folders = owner.client().folder();

    let parent = folders.create(vault_id, "Docs", None).await.unwrap();
    let child = folders
        .create(vault_id, "2024", Some(parent.node_id))
        .await
        .unwrap();
    assert_eq!(child.object.parent_id, Some(parent.node_id));
}

#[tokio::test]
async fn test_create_folder_empty_name() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;

    assert!(matches!(
        owner.client().folder().create(vault_id, "   ", None).await,
        Err(ServiceError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_create_under_missing_parent() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;

    let result = owner
        .client()
        .folder()
        .create(vault_id, "Orphan", Some(uuid::Uuid::new_v4()))
        .await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
}

#[tokio::test]
async fn test_rename_folder() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let folders = owner.client().folder();

    let created = folders.create(vault_id, "Docs", None).await.unwrap();
    let renamed = folders.rename(created.node_id, "Documents").await.unwrap();
    assert_eq!(renamed.object.name, "Documents");
    assert_eq!(renamed.object.data.len(), 2);

    let history = folders.history(created.node_id).await.unwrap();
    let functions: Vec<_> = history.iter().map(|tx| tx.input.function).collect();
    assert_eq!(
        functions,
        vec![ContractFunction::NodeCreate, ContractFunction::NodeUpdate]
    );
}

#[tokio::test]
async fn test_move_folder() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let folders = owner.client().folder();

    let a = folders.create(vault_id, "a", None).await.unwrap();
    let b = folders.create(vault_id, "b", None).await.unwrap();

    let moved = folders.move_to(b.node_id, Some(a.node_id)).await.unwrap();
    assert_eq!(moved.object.parent_id, Some(a.node_id));
    // moving keeps the state pointer
    assert_eq!(moved.object.data.len(), 1);
    assert_eq!(moved.object.name, "b");

    // a folder cannot end up inside its own subtree
    assert!(matches!(
        folders.move_to(a.node_id, Some(b.node_id)).await,
        Err(ServiceError::BadRequest(_))
    ));

    let back = folders.move_to(b.node_id, None).await.unwrap();
    assert_eq!(back.object.parent_id, None);
}

#[tokio::test]
async fn test_folder_lifecycle() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let folders = owner.client().folder();
    let id = folders.create(vault_id, "Docs", None).await.unwrap().node_id;

    let revoked = folders.revoke(id).await.unwrap();
    assert_eq!(revoked.object.status, NodeStatus::Revoked);
    assert!(matches!(
        folders.revoke(id).await,
        Err(ServiceError::BadRequest(_))
    ));

    let restored = folders.restore(id).await.unwrap();
    assert_eq!(restored.object.status, NodeStatus::Active);

    let deleted = folders.delete(id).await.unwrap();
    assert_eq!(deleted.object.status, NodeStatus::Deleted);

    // deleted is terminal
    assert!(matches!(
        folders.restore(id).await,
        Err(ServiceError::BadRequest(_))
    ));
    assert!(matches!(
        folders.rename(id, "again").await,
        Err(ServiceError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_list_skips_deleted() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let folders = owner.client().folder();

    let keep = folders.create(vault_id, "keep", None).await.unwrap();
    let revoked = folders.create(vault_id, "revoked", None).await.unwrap();
    let gone = folders.create(vault_id, "gone", None).await.unwrap();
    folders.revoke(revoked.node_id).await.unwrap();
    folders.delete(gone.node_id).await.unwrap();

    let listed = folders.list(vault_id).await.unwrap();
    let names: Vec<_> = listed.iter().map(|folder| folder.name.as_str()).collect();
    assert_eq!(names, vec!["keep", "revoked"]);
    assert_eq!(listed[0].id, keep.node_id);
}

#[tokio::test]
async fn test_fetch_without_decrypt() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let folders = owner.client().folder();
    let id = folders.create(vault_id, "Docs", None).await.unwrap().node_id;

    let sealed = folders.fetch(id, Some(false)).await.unwrap();
    assert_ne!(sealed.name, "Docs");
    assert!(!sealed.name.is_empty());

    let opened = folders.fetch(id, Some(true)).await.unwrap();
    assert_eq!(opened.name, "Docs");
}

#[tokio::test]
async fn test_public_folder_is_plaintext() {
    let (net, owner) = common::setup_test_env();
    let vault_id = common::public_vault(&owner).await;
    let id = owner
        .client()
        .folder()
        .create(vault_id, "Open Docs", None)
        .await
        .unwrap()
        .node_id;

    let sealed = owner.client().folder().fetch(id, Some(false)).await.unwrap();
    assert_eq!(sealed.name, "Open Docs");

    let stranger = net.stranger().unwrap();
    assert_eq!(stranger.client().folder().get(id).await.unwrap().name, "Open Docs");
}

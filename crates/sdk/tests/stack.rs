//! Integration tests for file stacks and their revisions

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use permavault::prelude::*;
use permavault::storage::StorageError;
use permavault::testkit::TestNetwork;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_create_and_download() {
    let (net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let stacks = owner.client().stack();

    let created = stacks
        .create(
            vault_id,
            common::file("report.txt", "quarterly numbers"),
            StackCreateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(created.object.name, "report.txt");
    assert_eq!(created.object.versions.len(), 1);

    let (version, data) = stacks.get_version(created.node_id, None).await.unwrap();
    assert_eq!(version.name, "report.txt");
    assert_eq!(version.content_type, "text/plain");
    assert_eq!(version.size, 17);
    assert_eq!(version.owner, owner.address());
    assert_eq!(&data[..], b"quarterly numbers");

    // the body left the client sealed
    let raw = net.storage().raw(&version.resource_tx).unwrap();
    assert_ne!(&raw[..], b"quarterly numbers");
    assert!(raw.len() > 17);

    let vault = owner.client().vault().get(vault_id).await.unwrap();
    assert_eq!(vault.size, 17);
}

#[tokio::test]
async fn test_public_stack_is_stored_as_is() {
    let (net, owner) = common::setup_test_env();
    let vault_id = common::public_vault(&owner).await;

    let created = owner
        .client()
        .stack()
        .create(
            vault_id,
            common::file("readme.txt", "plain"),
            StackCreateOptions::default(),
        )
        .await
        .unwrap();
    let version = created.object.latest().unwrap();
    assert_eq!(&net.storage().raw(&version.resource_tx).unwrap()[..], b"plain");
}

#[tokio::test]
async fn test_upload_revision_appends() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let stacks = owner.client().stack();

    let id = stacks
        .create(
            vault_id,
            common::file("draft.txt", "v1"),
            StackCreateOptions::default(),
        )
        .await
        .unwrap()
        .node_id;
    let updated = stacks
        .upload_revision(id, common::file("draft.txt", "v2 longer"), TransferOptions::default())
        .await
        .unwrap();
    assert_eq!(updated.object.versions.len(), 2);
    assert_eq!(updated.object.data.len(), 2);

    // earlier versions are untouched
    let (first, data) = stacks.get_version(id, Some(0)).await.unwrap();
    assert_eq!(first.size, 2);
    assert_eq!(&data[..], b"v1");
    let (_, latest) = stacks.get_version(id, None).await.unwrap();
    assert_eq!(&latest[..], b"v2 longer");

    assert!(matches!(
        stacks.get_version(id, Some(5)).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_revision_of_deleted_stack_uploads_nothing() {
    let (net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let stacks = owner.client().stack();

    let id = stacks
        .create(vault_id, common::file("a.txt", "a"), StackCreateOptions::default())
        .await
        .unwrap()
        .node_id;
    stacks.delete(id).await.unwrap();
    let uploads = net.storage().file_uploads();

    assert!(matches!(
        stacks
            .upload_revision(id, common::file("a.txt", "b"), TransferOptions::default())
            .await,
        Err(ServiceError::BadRequest(_))
    ));
    assert_eq!(net.storage().file_uploads(), uploads);
}

#[tokio::test]
async fn test_rename_stack() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let stacks = owner.client().stack();

    let id = stacks
        .create(vault_id, common::file("a.txt", "a"), StackCreateOptions::default())
        .await
        .unwrap()
        .node_id;
    let renamed = stacks.rename(id, "b.txt").await.unwrap();
    assert_eq!(renamed.object.name, "b.txt");
    // the version keeps the name it was uploaded under
    assert_eq!(renamed.object.versions[0].name, "a.txt");
}

/// The stored state blob behind a node's `index`th state pointer
fn stored_state(net: &TestNetwork, data: &[String], index: usize) -> serde_json::Value {
    let raw = net.storage().raw(&data[index]).unwrap();
    serde_json::from_slice(&raw).unwrap()
}

#[tokio::test]
async fn test_updates_keep_earlier_versions_as_stored() {
    let (net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let stacks = owner.client().stack();

    let id = stacks
        .create(vault_id, common::file("draft.txt", "v1"), StackCreateOptions::default())
        .await
        .unwrap()
        .node_id;
    stacks
        .upload_revision(id, common::file("draft.txt", "v2"), TransferOptions::default())
        .await
        .unwrap();
    let renamed = stacks.rename(id, "final.txt").await.unwrap();
    let data = &renamed.object.data;
    assert_eq!(data.len(), 3);

    let created = stored_state(&net, data, 0);
    let revised = stored_state(&net, data, 1);
    let latest = stored_state(&net, data, 2);
    assert_eq!(created["versions"][0], revised["versions"][0]);
    assert_eq!(created["name"], revised["name"]);
    assert_eq!(revised["versions"], latest["versions"]);
    assert_ne!(revised["name"], latest["name"]);

    // file metadata is sealed along with the name
    for state_id in data {
        let raw = net.storage().raw(state_id).unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(!text.contains("text/plain"));
        assert!(!text.contains("draft.txt"));
    }
    let (version, _) = stacks.get_version(id, Some(0)).await.unwrap();
    assert_eq!(version.content_type, "text/plain");
}

#[tokio::test]
async fn test_upload_progress() {
    let (_net, owner) = common::setup_test_env();
    let vault_id = common::public_vault(&owner).await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    owner
        .client()
        .stack()
        .create(
            vault_id,
            common::file("big.txt", &"x".repeat(10)),
            StackCreateOptions {
                parent_id: None,
                transfer: TransferOptions {
                    progress: Some(Arc::new(move |done: u64, total: u64| {
                        sink.lock().push((done, total))
                    })),
                    cancel: None,
                    chunk_size: Some(4),
                },
            },
        )
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![(4, 10), (8, 10), (10, 10)]);
}

#[tokio::test]
async fn test_cancelled_upload() {
    let (net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = owner
        .client()
        .stack()
        .create(
            vault_id,
            common::file("a.txt", "a"),
            StackCreateOptions {
                parent_id: None,
                transfer: TransferOptions {
                    cancel: Some(cancel),
                    ..Default::default()
                },
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(ServiceError::Storage(StorageError::Cancelled))
    ));
    assert_eq!(net.storage().file_uploads(), 0);
    assert!(owner.client().stack().list(vault_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_viewer_cannot_upload() {
    let (mut net, owner) = common::setup_test_env();
    let vault_id = common::private_vault(&owner).await;
    let viewer = net.add_user(common::MEMBER).unwrap();
    common::join(&owner, &viewer, vault_id, Role::Viewer).await;

    let result = viewer
        .client()
        .stack()
        .create(vault_id, common::file("a.txt", "a"), StackCreateOptions::default())
        .await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));

    // but can read what the owner uploads
    let id = owner
        .client()
        .stack()
        .create(vault_id, common::file("b.txt", "shared"), StackCreateOptions::default())
        .await
        .unwrap()
        .node_id;
    let (_, data) = viewer.client().stack().get_version(id, None).await.unwrap();
    assert_eq!(&data[..], b"shared");
}

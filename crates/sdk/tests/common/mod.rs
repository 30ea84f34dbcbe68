//! Shared test utilities for service integration tests
#![allow(dead_code)]

use permavault::prelude::*;
use permavault::testkit::{TestNetwork, TestUser};
use uuid::Uuid;

pub const OWNER: &str = "owner@example.com";
pub const MEMBER: &str = "member@example.com";

/// A network with one registered owner
pub fn setup_test_env() -> (TestNetwork, TestUser) {
    let mut net = TestNetwork::new();
    let owner = net.add_user(OWNER).unwrap();
    (net, owner)
}

/// A private vault owned by `user`
pub async fn private_vault(user: &TestUser) -> Uuid {
    user.client()
        .vault()
        .create("private", VaultCreateOptions::default())
        .await
        .unwrap()
        .vault_id
}

pub async fn public_vault(user: &TestUser) -> Uuid {
    user.client()
        .vault()
        .create(
            "public",
            VaultCreateOptions {
                public: true,
                description: None,
            },
        )
        .await
        .unwrap()
        .vault_id
}

/// Invite a registered user and have them accept, returning the membership id
pub async fn join(owner: &TestUser, member: &TestUser, vault_id: Uuid, role: Role) -> Uuid {
    let invited = owner
        .client()
        .membership()
        .invite(vault_id, member.email(), role, None)
        .await
        .unwrap();
    member
        .client()
        .membership()
        .accept(invited.membership_id)
        .await
        .unwrap();
    invited.membership_id
}

pub fn file(name: &str, content: &str) -> FileLike {
    FileLike::new(name, content.as_bytes().to_vec())
}

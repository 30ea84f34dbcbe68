use std::collections::HashMap;

use anyhow::{anyhow, Result};
use uuid::Uuid;

use super::user::TestUser;
use crate::config::Config;
use crate::ledger::memory::MemoryLedger;
use crate::ledger::ContractState;
use crate::storage::MemoryStorage;

/// Shared backend for a set of test users
///
/// Users are registered with the ledger as they join, so they can be invited
/// by email like accounts of a real backend.
pub struct TestNetwork {
    ledger: MemoryLedger,
    storage: MemoryStorage,
    config: Config,
    /// All users, indexed by email
    users: HashMap<String, TestUser>,
}

impl TestNetwork {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// A network whose clients all run with `config`
    pub fn with_config(config: Config) -> Self {
        let storage = MemoryStorage::new();
        Self {
            ledger: MemoryLedger::new(storage.clone()),
            storage,
            config,
            users: HashMap::new(),
        }
    }

    /// Create a registered user with a fresh identity
    pub fn add_user(&mut self, email: impl Into<String>) -> Result<TestUser> {
        let email = email.into();
        if self.users.contains_key(&email) {
            return Err(anyhow!("user '{}' already exists", email));
        }

        let user = TestUser::new(
            &email,
            self.ledger.clone(),
            self.storage.clone(),
            self.config.clone(),
        )?;
        self.ledger.register_user(&email, user.public_data());
        tracing::debug!("added test user {} ({})", email, user.address());

        self.users.insert(email, user.clone());
        Ok(user)
    }

    /// A client identity the ledger knows nothing about
    pub fn stranger(&self) -> Result<TestUser> {
        TestUser::new(
            "stranger@example.com",
            self.ledger.clone(),
            self.storage.clone(),
            self.config.clone(),
        )
    }

    pub fn user(&self, email: &str) -> Option<&TestUser> {
        self.users.get(email)
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    /// Replay the vault's log from scratch and compare with the live state
    pub fn verify(&self, vault_id: Uuid) -> Result<ContractState> {
        Ok(self.ledger.verify(vault_id)?)
    }
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

use anyhow::Result;

use crate::client::Client;
use crate::config::Config;
use crate::crypto::{KeyWallet, SecretKey, Wallet};
use crate::ledger::memory::MemoryLedger;
use crate::ledger::UserPublicData;
use crate::storage::MemoryStorage;

/// A test identity with a client bound to the network's backend
#[derive(Debug, Clone)]
pub struct TestUser {
    email: String,
    wallet: KeyWallet,
    client: Client,
}

impl TestUser {
    pub(crate) fn new(
        email: &str,
        ledger: MemoryLedger,
        storage: MemoryStorage,
        config: Config,
    ) -> Result<Self> {
        let wallet = KeyWallet::new(SecretKey::generate()?);
        let client = Client::builder()
            .ledger(ledger)
            .storage(storage)
            .wallet(wallet.clone())
            .config(config)
            .build()?;
        Ok(Self {
            email: email.to_string(),
            wallet,
            client,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn address(&self) -> String {
        self.wallet.address()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// What the backend publishes about this user
    pub fn public_data(&self) -> UserPublicData {
        UserPublicData {
            address: self.wallet.address(),
            public_key: self.wallet.public_key(),
            public_signing_key: self.wallet.public_signing_key(),
        }
    }
}

use std::fmt;
use std::sync::Arc;

use crate::batch::BatchService;
use crate::config::Config;
use crate::crypto::{CryptoError, KeyWallet, Wallet};
use crate::ledger::LedgerGateway;
use crate::service::{
    FolderService, MembershipService, MemoService, NoteService, StackService, VaultService,
};
use crate::storage::StorageGateway;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("a ledger gateway is required")]
    MissingLedger,
    #[error("a storage gateway is required")]
    MissingStorage,
    #[error("could not generate an identity: {0}")]
    Identity(#[from] CryptoError),
}

/// Collaborators every service works through
pub(crate) struct ClientInner {
    pub ledger: Arc<dyn LedgerGateway>,
    pub storage: Arc<dyn StorageGateway>,
    pub wallet: Arc<dyn Wallet>,
    pub config: Config,
}

impl fmt::Debug for ClientInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientInner")
            .field("ledger", &self.ledger)
            .field("storage", &self.storage)
            .field("address", &self.wallet.address())
            .finish()
    }
}

#[derive(Default)]
pub struct ClientBuilder {
    ledger: Option<Arc<dyn LedgerGateway>>,
    storage: Option<Arc<dyn StorageGateway>>,
    /// the identity to act as, generated if not set
    wallet: Option<Arc<dyn Wallet>>,
    config: Option<Config>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(mut self, ledger: impl LedgerGateway + 'static) -> Self {
        self.ledger = Some(Arc::new(ledger));
        self
    }

    pub fn storage(mut self, storage: impl StorageGateway + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    pub fn wallet(mut self, wallet: impl Wallet + 'static) -> Self {
        self.wallet = Some(Arc::new(wallet));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Client, ClientError> {
        let ledger = self.ledger.ok_or(ClientError::MissingLedger)?;
        let storage = self.storage.ok_or(ClientError::MissingStorage)?;
        let wallet: Arc<dyn Wallet> = match self.wallet {
            Some(wallet) => wallet,
            None => Arc::new(KeyWallet::generate()?),
        };
        let config = self.config.unwrap_or_default();

        tracing::debug!("client ready for {}", wallet.address());
        Ok(Client {
            inner: Arc::new(ClientInner {
                ledger,
                storage,
                wallet,
                config,
            }),
        })
    }
}

/// Entry point to the vault services
///
/// Cheap to clone; every service handed out shares the same gateways, wallet
/// and configuration.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Ledger address of the identity this client acts as
    pub fn address(&self) -> String {
        self.inner.wallet.address()
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.inner.wallet
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn vault(&self) -> VaultService {
        VaultService::new(self.inner.clone())
    }

    pub fn membership(&self) -> MembershipService {
        MembershipService::new(self.inner.clone())
    }

    pub fn folder(&self) -> FolderService {
        FolderService::new(self.inner.clone())
    }

    pub fn stack(&self) -> StackService {
        StackService::new(self.inner.clone())
    }

    pub fn note(&self) -> NoteService {
        NoteService::new(self.inner.clone())
    }

    pub fn memo(&self) -> MemoService {
        MemoService::new(self.inner.clone())
    }

    pub fn batch(&self) -> BatchService {
        BatchService::new(self.inner.clone())
    }
}

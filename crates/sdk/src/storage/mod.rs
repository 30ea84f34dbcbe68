//! Bulk data storage outside the ledger
//!
//! State blobs (JSON) and file bodies live here; transactions only carry the
//! content id. Private payloads are sealed by the services before they reach
//! a gateway, so a gateway never sees plaintext of a private vault.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::ledger::Tags;

pub use memory::MemoryStorage;

/// Called with `(bytes_uploaded, bytes_total)` as an upload advances
pub type ProgressHook = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("upload cancelled")]
    Cancelled,
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("storage provider error: {0}")]
    Provider(#[from] anyhow::Error),
}

#[derive(Clone, Default)]
pub struct UploadOptions {
    pub public: bool,
    pub progress: Option<ProgressHook>,
    /// Checked between chunks, a fired token aborts with [`StorageError::Cancelled`]
    pub cancel: Option<CancellationToken>,
    /// Bytes per chunk; the gateway's own default applies when unset
    pub chunk_size: Option<usize>,
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("public", &self.public)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedResource {
    pub resource_url: String,
    pub resource_tx: String,
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub data: Bytes,
    pub headers: BTreeMap<String, String>,
}

#[async_trait]
pub trait StorageGateway: Send + Sync + fmt::Debug {
    /// Store a state blob, returning its content id
    async fn upload_state(&self, data: Bytes) -> Result<String, StorageError>;

    async fn upload_file(
        &self,
        data: Bytes,
        tags: Tags,
        options: UploadOptions,
    ) -> Result<UploadedResource, StorageError>;

    /// Fetch a file by its `resource_tx` or `resource_url`
    async fn download_file(&self, id: &str) -> Result<DownloadedFile, StorageError>;

    async fn get_node_state(&self, state_id: &str) -> Result<serde_json::Value, StorageError>;
}

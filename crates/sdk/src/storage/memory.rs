use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{DownloadedFile, StorageError, StorageGateway, UploadOptions, UploadedResource};
use crate::ledger::Tags;

const URL_SCHEME: &str = "memory://";
const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// In-memory content addressed storage
///
/// Ids are the hex BLAKE3 hash of the stored bytes. File uploads advance chunk
/// by chunk, yielding to the runtime in between so concurrent uploads interleave.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<MemoryStorageInner>>,
}

#[derive(Debug, Default)]
struct MemoryStorageInner {
    blobs: HashMap<String, StoredBlob>,
    file_uploads: usize,
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    tags: Tags,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed file uploads
    pub fn file_uploads(&self) -> usize {
        self.inner.read().map(|inner| inner.file_uploads).unwrap_or(0)
    }

    /// Raw stored bytes, for inspecting what actually left the client
    pub fn raw(&self, id: &str) -> Option<Bytes> {
        let id = id.strip_prefix(URL_SCHEME).unwrap_or(id);
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.blobs.get(id).map(|blob| blob.data.clone()))
    }

    fn put(&self, data: Bytes, tags: Tags) -> Result<String, StorageError> {
        let id = blake3::hash(&data).to_hex().to_string();
        let mut inner = self.inner.write().map_err(|e| {
            StorageError::Provider(anyhow::anyhow!("failed to acquire write lock: {}", e))
        })?;
        inner.blobs.insert(id.clone(), StoredBlob { data, tags });
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<StoredBlob, StorageError> {
        let id = id.strip_prefix(URL_SCHEME).unwrap_or(id);
        let inner = self.inner.read().map_err(|e| {
            StorageError::Provider(anyhow::anyhow!("failed to acquire read lock: {}", e))
        })?;
        inner
            .blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl StorageGateway for MemoryStorage {
    async fn upload_state(&self, data: Bytes) -> Result<String, StorageError> {
        self.put(data, Tags::new())
    }

    async fn upload_file(
        &self,
        data: Bytes,
        tags: Tags,
        options: UploadOptions,
    ) -> Result<UploadedResource, StorageError> {
        let total = data.len() as u64;
        let chunk_size = options.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1);

        let mut uploaded = 0u64;
        for chunk in data.chunks(chunk_size) {
            if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                tracing::debug!("upload cancelled after {} of {} bytes", uploaded, total);
                return Err(StorageError::Cancelled);
            }
            tokio::task::yield_now().await;
            uploaded += chunk.len() as u64;
            if let Some(progress) = &options.progress {
                progress(uploaded, total);
            }
        }
        if total == 0 {
            if let Some(progress) = &options.progress {
                progress(0, 0);
            }
        }

        let id = self.put(data, tags)?;
        if let Ok(mut inner) = self.inner.write() {
            inner.file_uploads += 1;
        }
        Ok(UploadedResource {
            resource_url: format!("{}{}", URL_SCHEME, id),
            resource_tx: id,
        })
    }

    async fn download_file(&self, id: &str) -> Result<DownloadedFile, StorageError> {
        let blob = self.get(id)?;
        let headers: BTreeMap<String, String> = blob
            .tags
            .iter()
            .map(|tag| (tag.name.clone(), tag.value.clone()))
            .collect();
        Ok(DownloadedFile {
            data: blob.data,
            headers,
        })
    }

    async fn get_node_state(&self, state_id: &str) -> Result<serde_json::Value, StorageError> {
        let blob = self.get(state_id)?;
        Ok(serde_json::from_slice(&blob.data)?)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::ledger::tag_names;

    #[tokio::test]
    async fn test_state_is_content_addressed() {
        let storage = MemoryStorage::new();
        let a = storage
            .upload_state(Bytes::from_static(br#"{"name":"Docs"}"#))
            .await
            .unwrap();
        let b = storage
            .upload_state(Bytes::from_static(br#"{"name":"Docs"}"#))
            .await
            .unwrap();
        assert_eq!(a, b);

        let state = storage.get_node_state(&a).await.unwrap();
        assert_eq!(state["name"], "Docs");
    }

    #[tokio::test]
    async fn test_upload_reports_progress_per_chunk() {
        let storage = MemoryStorage::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook = seen.clone();

        let resource = storage
            .upload_file(
                Bytes::from(vec![7u8; 10]),
                Tags::new().with(tag_names::CONTENT_TYPE, "text/plain"),
                UploadOptions {
                    progress: Some(Arc::new(move |done, total| {
                        hook.lock().unwrap().push((done, total))
                    })),
                    chunk_size: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(4, 10), (8, 10), (10, 10)]);

        let file = storage.download_file(&resource.resource_url).await.unwrap();
        assert_eq!(file.data.len(), 10);
        assert_eq!(file.headers.get("Content-Type").map(String::as_str), Some("text/plain"));
        assert_eq!(storage.file_uploads(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_upload_stores_nothing() {
        let storage = MemoryStorage::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = storage
            .upload_file(
                Bytes::from_static(b"never stored"),
                Tags::new(),
                UploadOptions {
                    cancel: Some(cancel),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(StorageError::Cancelled)));
        assert_eq!(storage.file_uploads(), 0);
    }

    #[tokio::test]
    async fn test_missing_resource() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.download_file("nope").await,
            Err(StorageError::NotFound(_))
        ));
    }
}

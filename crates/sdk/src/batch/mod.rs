//! Batch operations over many objects of one vault
//!
//! A batch loads the vault context once and shares it, read-only, with every
//! item. Items run in chunks of bounded concurrency; one item failing never
//! stops the others, it lands in [`BatchResponse::errors`] instead. Only a
//! failure to start the batch at all (an unknown vault, missing keys) is
//! returned as an error.
//!
//! Stack creation is the one batch whose transactions must reach the ledger
//! in a fixed order: uploads run concurrently, then a single poster drains a
//! FIFO queue of prepared transactions.

mod orchestrator;
mod progress;
mod queue;

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::service::{FileLike, ServiceError};
use crate::types::{ObjectType, Role};

pub use orchestrator::BatchService;
pub use progress::PercentHook;

/// Called with each successful item as soon as it is done
pub type ItemHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A failed item
#[derive(Debug)]
pub struct BatchError {
    /// The item's id, email or file name
    pub identifier: String,
    pub message: String,
    pub cause: ServiceError,
}

#[derive(Debug)]
pub struct BatchResponse<T> {
    pub data: Vec<T>,
    pub errors: Vec<BatchError>,
    /// Items never attempted because the batch was cancelled
    pub cancelled: usize,
}

impl<T> Default for BatchResponse<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            errors: Vec::new(),
            cancelled: 0,
        }
    }
}

impl<T> BatchResponse<T> {
    pub(crate) fn push_error(&mut self, identifier: impl Into<String>, cause: ServiceError) {
        let identifier = identifier.into();
        tracing::warn!("batch item {} failed: {}", identifier, cause);
        self.errors.push(BatchError {
            identifier,
            message: cause.to_string(),
            cause,
        });
    }

    pub(crate) fn record(
        &mut self,
        identifier: impl Into<String>,
        result: Result<T, ServiceError>,
        on_item_complete: Option<&ItemHook<T>>,
    ) {
        match result {
            Ok(item) => {
                if let Some(hook) = on_item_complete {
                    hook(&item);
                }
                self.data.push(item);
            }
            Err(cause) => self.push_error(identifier, cause),
        }
    }

    /// Count whatever was neither done nor failed as cancelled
    pub(crate) fn settle(mut self, total: usize) -> Self {
        self.cancelled = total.saturating_sub(self.data.len() + self.errors.len());
        self
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty() && self.cancelled == 0
    }
}

/// Per-call knobs of a batch
pub struct BatchOptions<T> {
    /// Stops new work once fired; transactions already posted stay posted
    pub cancel: Option<CancellationToken>,
    /// Overall upload progress, stack creation only
    pub progress: Option<PercentHook>,
    pub on_item_complete: Option<ItemHook<T>>,
    /// Items prepared concurrently, overrides the configured chunk size
    pub chunk_size: Option<usize>,
}

impl<T> Default for BatchOptions<T> {
    fn default() -> Self {
        Self {
            cancel: None,
            progress: None,
            on_item_complete: None,
            chunk_size: None,
        }
    }
}

impl<T> Clone for BatchOptions<T> {
    fn clone(&self) -> Self {
        Self {
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
            on_item_complete: self.on_item_complete.clone(),
            chunk_size: self.chunk_size,
        }
    }
}

impl<T> fmt::Debug for BatchOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchOptions")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .field("on_item_complete", &self.on_item_complete.is_some())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// A node addressed by id and the type it was created as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchNodeItem {
    pub id: Uuid,
    pub object_type: ObjectType,
}

impl BatchNodeItem {
    pub fn new(id: Uuid, object_type: ObjectType) -> Self {
        Self { id, object_type }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipRoleItem {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipInviteItem {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct StackCreateItem {
    pub file: FileLike,
    pub parent_id: Option<Uuid>,
}

impl StackCreateItem {
    pub fn new(file: FileLike) -> Self {
        Self {
            file,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// A successful transition of one batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUpdated {
    pub id: Uuid,
    pub transaction_id: String,
}

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use uuid::Uuid;

use super::progress::ProgressTracker;
use super::queue::transaction_queue;
use super::{
    BatchNodeItem, BatchOptions, BatchResponse, BatchUpdated, MembershipInviteItem,
    MembershipRoleItem, StackCreateItem,
};
use crate::client::ClientInner;
use crate::service::{
    group_ref_for, Folder, Memo, MembershipInvited, MembershipService, NodeCreated, NodeModel,
    NodeOp, NodeService, Note, PreparedCreate, ServiceError, Stack, StackService, TransferOptions,
    VaultContext,
};
use crate::types::{FileVersion, Node, ObjectType};

/// What the stack producer hands to the poster, in item order
enum Entry {
    Ready {
        identifier: String,
        prepared: PreparedCreate<FileVersion>,
    },
    Failed {
        identifier: String,
        cause: ServiceError,
    },
}

/// Run `run` over `items` a chunk at a time, checking for cancellation between chunks
async fn run_chunks<I, T, F, Fut>(
    items: Vec<I>,
    chunk_size: usize,
    options: &BatchOptions<T>,
    identify: impl Fn(&I) -> String,
    run: F,
) -> BatchResponse<T>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let total = items.len();
    let mut response = BatchResponse::default();
    for chunk in items.chunks(chunk_size) {
        if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            tracing::info!("batch cancelled with {} items done", response.data.len());
            break;
        }
        let results = join_all(chunk.iter().cloned().map(|item| {
            let identifier = identify(&item);
            let run = run(item);
            async move { (identifier, run.await) }
        }))
        .await;
        for (identifier, result) in results {
            response.record(identifier, result, options.on_item_complete.as_ref());
        }
    }
    response.settle(total)
}

async fn node_lifecycle<M: NodeModel>(
    client: &Arc<ClientInner>,
    vault: &VaultContext,
    id: Uuid,
    op: NodeOp,
    parent_id: Option<Uuid>,
    group_ref: Option<Uuid>,
) -> Result<String, ServiceError> {
    let updated = NodeService::<M>::new(client.clone())
        .lifecycle(Some(vault), id, op, parent_id, group_ref)
        .await?;
    Ok(updated.transaction_id)
}

/// Runs one kind of operation over many objects of a vault
#[derive(Debug, Clone)]
pub struct BatchService {
    client: Arc<ClientInner>,
}

impl BatchService {
    pub(crate) fn new(client: Arc<ClientInner>) -> Self {
        Self { client }
    }

    fn chunk_size<T>(&self, options: &BatchOptions<T>) -> usize {
        self.client
            .config
            .resolve_batch_chunk_size(options.chunk_size)
    }

    /// The vault of the first item, which every other item must share
    async fn node_vault(&self, first: &BatchNodeItem) -> Result<VaultContext, ServiceError> {
        let kind = first.object_type.node_kind().ok_or_else(|| {
            ServiceError::BadRequest(format!("{} is not a node type", first.object_type))
        })?;
        let record = self.client.ledger.get_node(first.id, kind).await?;
        VaultContext::load(&self.client, record.vault_id).await
    }

    async fn node_step(
        &self,
        vault: &VaultContext,
        item: BatchNodeItem,
        op: NodeOp,
        parent_id: Option<Uuid>,
        group_ref: Option<Uuid>,
    ) -> Result<BatchUpdated, ServiceError> {
        let client = &self.client;
        let transaction_id = match item.object_type {
            ObjectType::Folder => {
                node_lifecycle::<Folder>(client, vault, item.id, op, parent_id, group_ref).await?
            }
            ObjectType::Stack => {
                node_lifecycle::<Stack>(client, vault, item.id, op, parent_id, group_ref).await?
            }
            ObjectType::Note => {
                node_lifecycle::<Note>(client, vault, item.id, op, parent_id, group_ref).await?
            }
            ObjectType::Memo => {
                node_lifecycle::<Memo>(client, vault, item.id, op, parent_id, group_ref).await?
            }
            other => {
                return Err(ServiceError::BadRequest(format!(
                    "{} is not a node type",
                    other
                )))
            }
        };
        Ok(BatchUpdated {
            id: item.id,
            transaction_id,
        })
    }

    async fn nodes(
        &self,
        items: Vec<BatchNodeItem>,
        op: NodeOp,
        parent_id: Option<Uuid>,
        options: BatchOptions<BatchUpdated>,
    ) -> Result<BatchResponse<BatchUpdated>, ServiceError> {
        let Some(first) = items.first() else {
            return Ok(BatchResponse::default());
        };
        let vault = self.node_vault(first).await?;
        let group_ref = group_ref_for(items.len());
        tracing::debug!("{:?} batch of {} items in vault {}", op, items.len(), vault.id());

        let vault = &vault;
        Ok(run_chunks(
            items,
            self.chunk_size(&options),
            &options,
            |item| item.id.to_string(),
            |item| self.node_step(vault, item, op, parent_id, group_ref),
        )
        .await)
    }

    pub async fn revoke(
        &self,
        items: Vec<BatchNodeItem>,
        options: BatchOptions<BatchUpdated>,
    ) -> Result<BatchResponse<BatchUpdated>, ServiceError> {
        self.nodes(items, NodeOp::Revoke, None, options).await
    }

    pub async fn restore(
        &self,
        items: Vec<BatchNodeItem>,
        options: BatchOptions<BatchUpdated>,
    ) -> Result<BatchResponse<BatchUpdated>, ServiceError> {
        self.nodes(items, NodeOp::Restore, None, options).await
    }

    pub async fn delete(
        &self,
        items: Vec<BatchNodeItem>,
        options: BatchOptions<BatchUpdated>,
    ) -> Result<BatchResponse<BatchUpdated>, ServiceError> {
        self.nodes(items, NodeOp::Delete, None, options).await
    }

    /// Move every item under `parent_id`, the vault root when `None`
    pub async fn move_to(
        &self,
        items: Vec<BatchNodeItem>,
        parent_id: Option<Uuid>,
        options: BatchOptions<BatchUpdated>,
    ) -> Result<BatchResponse<BatchUpdated>, ServiceError> {
        self.nodes(items, NodeOp::Move, parent_id, options).await
    }

    pub async fn membership_change_role(
        &self,
        items: Vec<MembershipRoleItem>,
        options: BatchOptions<BatchUpdated>,
    ) -> Result<BatchResponse<BatchUpdated>, ServiceError> {
        let Some(first) = items.first() else {
            return Ok(BatchResponse::default());
        };
        let record = self.client.ledger.get_membership(first.id).await?;
        let vault = VaultContext::load(&self.client, record.vault_id).await?;
        let group_ref = group_ref_for(items.len());
        let memberships = MembershipService::new(self.client.clone());

        let (vault, memberships) = (&vault, &memberships);
        Ok(run_chunks(
            items,
            self.chunk_size(&options),
            &options,
            |item| item.id.to_string(),
            |item| async move {
                let updated = memberships
                    .change_role_in(Some(vault), item.id, item.role, group_ref)
                    .await?;
                Ok(BatchUpdated {
                    id: item.id,
                    transaction_id: updated.transaction_id,
                })
            },
        )
        .await)
    }

    /// Invite many identities at once
    ///
    /// Invites are independent of each other, so unlike stack creation they
    /// are posted concurrently.
    pub async fn membership_invite(
        &self,
        vault_id: Uuid,
        items: Vec<MembershipInviteItem>,
        message: Option<String>,
        options: BatchOptions<MembershipInvited>,
    ) -> Result<BatchResponse<MembershipInvited>, ServiceError> {
        let vault = VaultContext::load(&self.client, vault_id).await?;
        let members = self.client.ledger.get_members(vault_id).await?;
        let group_ref = group_ref_for(items.len());
        let memberships = MembershipService::new(self.client.clone());

        let (vault, members, memberships, message) = (&vault, &members, &memberships, &message);
        Ok(run_chunks(
            items,
            self.chunk_size(&options),
            &options,
            |item| item.email.clone(),
            |item| async move {
                memberships
                    .invite_one(vault, members, &item.email, item.role, message.clone(), group_ref)
                    .await
            },
        )
        .await)
    }

    /// Upload many files as new stacks
    ///
    /// Each chunk of items is uploaded concurrently, then its prepared
    /// transactions are queued in item order. A single poster drains the queue,
    /// so the ledger sees the creates in the order the items were given no
    /// matter which upload finished first. Cancellation stops the poster before
    /// its next transaction; what was posted stays posted.
    pub async fn stack_create(
        &self,
        vault_id: Uuid,
        items: Vec<StackCreateItem>,
        options: BatchOptions<NodeCreated<Node<FileVersion>>>,
    ) -> Result<BatchResponse<NodeCreated<Node<FileVersion>>>, ServiceError> {
        let total = items.len();
        let vault = VaultContext::load(&self.client, vault_id).await?;
        let group_ref = group_ref_for(total);
        let cancel = options.cancel.clone().unwrap_or_default();
        let chunk_size = self.chunk_size(&options);
        let tracker = ProgressTracker::new(
            items.iter().map(|item| item.file.size()),
            options.progress.clone(),
        );
        let stacks = StackService::new(self.client.clone());
        let (queue, receiver) = transaction_queue::<Entry>();

        let (vault, stacks, cancel, tracker) = (&vault, &stacks, &cancel, &tracker);
        let producer = async {
            // dropped on exit, which closes the queue
            let queue = queue;
            let indexed: Vec<_> = items.iter().enumerate().collect();
            for chunk in indexed.chunks(chunk_size) {
                if cancel.is_cancelled() {
                    return;
                }
                let mut prepared = stream::iter(chunk.iter().map(|&(index, item)| {
                    let transfer = TransferOptions {
                        progress: Some(tracker.item_hook(index)),
                        cancel: Some(cancel.clone()),
                        chunk_size: None,
                    };
                    async move {
                        let identifier = item.file.name.clone();
                        match stacks
                            .prepare_file(vault, &item.file, item.parent_id, &transfer, group_ref)
                            .await
                        {
                            Ok(prepared) => Entry::Ready {
                                identifier,
                                prepared,
                            },
                            Err(cause) => Entry::Failed { identifier, cause },
                        }
                    }
                }))
                .buffered(chunk.len());

                while let Some(entry) = prepared.next().await {
                    if queue.push(entry).is_err() {
                        return;
                    }
                }
            }
        };

        let drain = async {
            let receiver = receiver;
            let mut response = BatchResponse::default();
            loop {
                let entry = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    entry = receiver.next() => match entry {
                        Some(entry) => entry,
                        None => break,
                    },
                };
                match entry {
                    Entry::Ready {
                        identifier,
                        prepared,
                    } => {
                        let result = stacks.post_create(prepared).await;
                        response.record(identifier, result, options.on_item_complete.as_ref());
                    }
                    Entry::Failed { identifier, cause } => response.push_error(identifier, cause),
                }
            }
            response
        };

        let ((), response) = tokio::join!(producer, drain);
        let response = response.settle(total);
        tracing::info!(
            "stack batch in vault {}: {} created, {} failed, {} cancelled ({:.0}% uploaded)",
            vault_id,
            response.data.len(),
            response.errors.len(),
            response.cancelled,
            tracker.percentage()
        );
        Ok(response)
    }
}

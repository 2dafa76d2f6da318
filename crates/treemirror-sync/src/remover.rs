//! Removal of nodes and their cached content
//!
//! Metadata goes first: the batch that deletes rows (or forgets cached
//! content) commits before any byte is removed from disk. Conflicted files
//! that disappear take their ancestors' aggregate markers with them.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, ContentLayout, Node};
use treemirror_core::ports::{ILocalStorage, IMediaIndex, INodeStore, NodeChanges, NodeOp};

use crate::conflict::{is_conflicted_file, ConflictPropagator};
use crate::effects::{purge_effects, EffectQueue, LocalEffect, LocalIoFailure};
use crate::tree::{load_stored, stored_id};
use crate::MirrorError;

/// Summary of a removal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Rows deleted from the store
    pub rows_deleted: u64,
    /// Rows whose cached content was forgotten while the row was kept
    pub content_released: usize,
    /// Local effects that failed after the batch committed
    pub local_failures: Vec<LocalIoFailure>,
}

/// Removes metadata, cached content, or both
pub struct NodeRemover {
    store: Arc<dyn INodeStore>,
    storage: Arc<dyn ILocalStorage>,
    media: Arc<dyn IMediaIndex>,
    layout: ContentLayout,
    conflicts: ConflictPropagator,
}

impl NodeRemover {
    pub fn new(
        store: Arc<dyn INodeStore>,
        storage: Arc<dyn ILocalStorage>,
        media: Arc<dyn IMediaIndex>,
        layout: ContentLayout,
    ) -> Self {
        Self {
            conflicts: ConflictPropagator::new(Arc::clone(&store)),
            store,
            storage,
            media,
            layout,
        }
    }

    /// Removes a file row and/or its cached bytes
    ///
    /// A node that is not stored is a no-op.
    #[instrument(skip(self, node), fields(account = %account, path = %node.remote_path()))]
    pub async fn remove_file(
        &self,
        account: &AccountName,
        node: &Node,
        remove_metadata: bool,
        remove_local: bool,
    ) -> Result<RemoveOutcome, MirrorError> {
        let Some(stored) = load_stored(self.store.as_ref(), account, node).await? else {
            debug!("node not stored, nothing to remove");
            return Ok(RemoveOutcome::default());
        };
        if stored.is_folder() {
            return Err(MirrorError::usage(format!(
                "{} is a folder",
                stored.remote_path()
            )));
        }

        let subtree = vec![stored.clone()];
        self.remove(account, &stored, &subtree, remove_metadata, remove_local)
            .await
    }

    /// Removes a folder's subtree and/or every cached file below it
    ///
    /// Purging local content removes the folder's default location as a
    /// whole, plus cached files of the subtree that live elsewhere.
    #[instrument(skip(self, folder), fields(account = %account, path = %folder.remote_path()))]
    pub async fn remove_folder(
        &self,
        account: &AccountName,
        folder: &Node,
        remove_metadata: bool,
        remove_local: bool,
    ) -> Result<RemoveOutcome, MirrorError> {
        let Some(stored) = load_stored(self.store.as_ref(), account, folder).await? else {
            debug!("folder not stored, nothing to remove");
            return Ok(RemoveOutcome::default());
        };
        if !stored.is_folder() {
            return Err(MirrorError::usage(format!(
                "{} is not a folder",
                stored.remote_path()
            )));
        }

        let subtree = self.store.subtree(account, stored.remote_path()).await?;
        self.remove(account, &stored, &subtree, remove_metadata, remove_local)
            .await
    }

    async fn remove(
        &self,
        account: &AccountName,
        stored: &Node,
        subtree: &[Node],
        remove_metadata: bool,
        remove_local: bool,
    ) -> Result<RemoveOutcome, MirrorError> {
        let mut outcome = RemoveOutcome::default();
        let mut ops = Vec::new();

        if remove_metadata {
            ops.push(NodeOp::Delete {
                account: account.clone(),
                path: stored.remote_path().clone(),
            });
        } else if remove_local {
            for row in subtree {
                let mut changes = NodeChanges::default();
                if row.local_path().is_some() {
                    changes = changes.with_local_path(None);
                    outcome.content_released += 1;
                }
                if row.conflict_marker().is_some() {
                    changes = changes.with_conflict_marker(None);
                }
                if !changes.is_empty() {
                    ops.push(NodeOp::update_id(account, stored_id(row)?, changes));
                }
            }
        }

        let departing = subtree.iter().filter(|n| is_conflicted_file(n)).count() as u64;
        if !ops.is_empty() && departing > 0 {
            ops.extend(self.conflicts.retraction_ops(account, stored, departing).await?);
        }

        if !ops.is_empty() {
            let results = self.store.apply(ops).await?;
            if remove_metadata {
                outcome.rows_deleted = results.first().map_or(0, |r| r.rows());
            }
            info!(
                rows_deleted = outcome.rows_deleted,
                content_released = outcome.content_released,
                "node removed"
            );
        }

        if remove_local {
            let mut effects = EffectQueue::new();
            for effect in purge_effects(&self.layout, account, stored, subtree, &[]) {
                effects.push(effect);
            }
            if !stored.is_folder() && stored.local_path().is_none() {
                effects.push(LocalEffect::DeleteFile(
                    self.layout.default_local_path(account, stored.remote_path()),
                ));
            }
            outcome.local_failures = effects
                .drain(self.storage.as_ref(), self.media.as_ref())
                .await;
        }

        Ok(outcome)
    }
}

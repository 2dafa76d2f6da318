//! Folder reconciliation
//!
//! Given a folder and a fresh listing of its children, the
//! [`TreeReconciler`] brings the stored children in line with the listing:
//!
//! 1. **Observed children**: updated in place (matched by path, or by id for
//!    renames) or inserted with an inherited available-offline status
//! 2. **Vanished children**: deleted together with their subtrees; cached
//!    content is purged after commit. A child renamed in the same pass
//!    keeps its row and content
//! 3. **The folder itself**: refreshed with its new metadata
//!
//! All writes of one pass form a single batch. Client-local state
//! (cached content, pins, conflict markers) is never overwritten by a
//! listing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, AvailableOffline, ContentLayout, Node, NodeId};
use treemirror_core::ports::{
    ILocalStorage, IMediaIndex, INodeStore, NodeChanges, NodeOp, OpResult,
};

use crate::conflict::{is_conflicted_file, ConflictPropagator};
use crate::effects::{purge_effects, EffectQueue, LocalIoFailure};
use crate::offline::OfflinePropagator;
use crate::tree::stored_id;
use crate::MirrorError;

// ============================================================================
// ReconcileOutcome
// ============================================================================

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Children inserted as new rows
    pub inserted: usize,
    /// Children matched to existing rows and refreshed
    pub updated: usize,
    /// Rows deleted, descendants of removed folders included
    pub removed: u64,
    /// Local effects that failed after the batch committed
    pub local_failures: Vec<LocalIoFailure>,
}

// ============================================================================
// TreeReconciler
// ============================================================================

/// Applies a folder listing to the stored tree
pub struct TreeReconciler {
    store: Arc<dyn INodeStore>,
    storage: Arc<dyn ILocalStorage>,
    media: Arc<dyn IMediaIndex>,
    layout: ContentLayout,
    offline: OfflinePropagator,
    conflicts: ConflictPropagator,
}

/// Where one entry of the listing ended up in the batch
enum Placement {
    Inserted { op_index: usize, status: AvailableOffline },
    Updated(NodeId),
}

impl TreeReconciler {
    pub fn new(
        store: Arc<dyn INodeStore>,
        storage: Arc<dyn ILocalStorage>,
        media: Arc<dyn IMediaIndex>,
        layout: ContentLayout,
    ) -> Self {
        Self {
            offline: OfflinePropagator::new(Arc::clone(&store)),
            conflicts: ConflictPropagator::new(Arc::clone(&store)),
            store,
            storage,
            media,
            layout,
        }
    }

    /// Reconciles `folder` against a listing of its children
    ///
    /// `updated` holds every child observed remotely; on success each entry
    /// gets the id of its stored row. `to_remove` holds children that
    /// vanished remotely; entries whose stored parent is no longer `folder`
    /// are left alone.
    ///
    /// # Errors
    ///
    /// - `MirrorError::Usage` if `folder` is not a stored folder
    /// - `MirrorError::Persistence` if a read or the batch fails; nothing
    ///   was changed in that case
    #[instrument(
        skip(self, folder, updated, to_remove),
        fields(account = %account, folder = %folder.remote_path(), listed = updated.len(), vanished = to_remove.len())
    )]
    pub async fn reconcile(
        &self,
        account: &AccountName,
        folder: &Node,
        updated: &mut [Node],
        to_remove: &[Node],
    ) -> Result<ReconcileOutcome, MirrorError> {
        if !folder.is_folder() {
            return Err(MirrorError::usage(format!(
                "cannot reconcile file {}",
                folder.remote_path()
            )));
        }
        let folder_id = folder.id().ok_or_else(|| {
            MirrorError::usage(format!("folder {} has no id", folder.remote_path()))
        })?;
        let stored_folder = self
            .store
            .get_by_id(account, folder_id)
            .await?
            .ok_or_else(|| {
                MirrorError::usage(format!("folder {} is not stored", folder.remote_path()))
            })?;

        let mut ops = Vec::new();
        let mut placements = Vec::with_capacity(updated.len());
        let mut renamed: HashMap<NodeId, Node> = HashMap::new();
        let mut inherited: Option<AvailableOffline> = None;

        // Observed children
        for node in updated.iter() {
            let existing = match self.store.get_by_path(account, node.remote_path()).await? {
                Some(existing) => Some(existing),
                None => match node.id() {
                    Some(id) => self.store.get_by_id(account, id).await?,
                    None => None,
                },
            };

            match existing {
                Some(existing) => {
                    let id = stored_id(&existing)?;
                    if existing.remote_path() != node.remote_path() {
                        debug!(from = %existing.remote_path(), to = %node.remote_path(), "child renamed");
                        renamed.insert(id, existing);
                    }
                    ops.push(NodeOp::update_id(
                        account,
                        id,
                        NodeChanges::remote_metadata(node).with_parent_id(folder_id),
                    ));
                    placements.push(Placement::Updated(id));
                }
                None => {
                    let status = match inherited {
                        Some(status) => status,
                        None => {
                            let status =
                                self.offline.initial_status(account, &stored_folder).await?;
                            inherited = Some(status);
                            status
                        }
                    };
                    let mut fresh = node.clone();
                    fresh.set_parent_id(folder_id);
                    fresh.set_available_offline(status);
                    fresh.set_conflict_marker(None);
                    placements.push(Placement::Inserted {
                        op_index: ops.len(),
                        status,
                    });
                    ops.push(NodeOp::Insert(fresh));
                }
            }
        }

        // Vanished children
        let protected: Vec<PathBuf> = renamed
            .values()
            .filter_map(Node::local_path)
            .map(Path::to_path_buf)
            .collect();
        let mut effects = EffectQueue::new();
        let mut departing_conflicts = 0u64;
        let mut first_removed: Option<Node> = None;
        let mut delete_indexes = Vec::new();

        for node in to_remove {
            let Some(stored) = self.store.get_by_path(account, node.remote_path()).await? else {
                debug!(path = %node.remote_path(), "vanished child already gone");
                continue;
            };
            if stored.parent_id() != folder_id {
                debug!(path = %node.remote_path(), "vanished child belongs to another folder now");
                continue;
            }

            // The row already moved to its new path in this batch; deleting
            // the old path would take its descendants along.
            if renamed.contains_key(&stored_id(&stored)?) {
                debug!(path = %stored.remote_path(), "renamed in this pass, keeping row and content");
                continue;
            }

            let subtree = if stored.is_folder() {
                self.store.subtree(account, stored.remote_path()).await?
            } else {
                vec![stored.clone()]
            };

            departing_conflicts += subtree.iter().filter(|n| is_conflicted_file(n)).count() as u64;

            delete_indexes.push(ops.len());
            ops.push(NodeOp::Delete {
                account: account.clone(),
                path: stored.remote_path().clone(),
            });

            for effect in purge_effects(&self.layout, account, &stored, &subtree, &protected) {
                effects.push(effect);
            }
            first_removed.get_or_insert(stored);
        }

        if let Some(removed) = first_removed.filter(|_| departing_conflicts > 0) {
            ops.extend(
                self.conflicts
                    .retraction_ops(account, &removed, departing_conflicts)
                    .await?,
            );
        }

        // The folder itself
        ops.push(NodeOp::update_id(
            account,
            folder_id,
            NodeChanges::remote_metadata(folder),
        ));

        let results = self.store.apply(ops).await?;

        let mut outcome = ReconcileOutcome {
            removed: delete_indexes
                .iter()
                .filter_map(|&i| results.get(i))
                .map(OpResult::rows)
                .sum(),
            ..ReconcileOutcome::default()
        };

        for (node, placement) in updated.iter_mut().zip(placements) {
            match placement {
                Placement::Inserted { op_index, status } => {
                    if let Some(id) = results.get(op_index).and_then(OpResult::inserted_id) {
                        node.set_id(id);
                    }
                    node.set_parent_id(folder_id);
                    node.set_available_offline(status);
                    outcome.inserted += 1;
                }
                Placement::Updated(id) => {
                    node.set_id(id);
                    node.set_parent_id(folder_id);
                    outcome.updated += 1;
                }
            }
        }

        info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            removed = outcome.removed,
            "folder reconciled"
        );

        outcome.local_failures = effects
            .drain(self.storage.as_ref(), self.media.as_ref())
            .await;
        Ok(outcome)
    }
}

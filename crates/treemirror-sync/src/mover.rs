//! Move/rename rewriting
//!
//! Moving a node rewrites the path of every row in its subtree, rebases
//! cached content that lives in the default location, re-derives the
//! available-offline state against the new ancestors and keeps conflict
//! markers consistent on both the old and the new ancestor chain. The
//! whole rewrite is one batch; the local directory is moved after commit.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, AvailableOffline, ContentLayout, Node, RemotePath};
use treemirror_core::ports::{ILocalStorage, IMediaIndex, INodeStore, NodeChanges, NodeOp};

use crate::conflict::{is_conflicted_file, ConflictPropagator};
use crate::effects::{EffectQueue, LocalEffect, LocalIoFailure};
use crate::offline::OfflinePropagator;
use crate::tree::{load_stored, stored_id};
use crate::MirrorError;

/// Summary of a move
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Rows rewritten, the moved node included
    pub moved: usize,
    /// Cached files whose location changed, as (old, new) pairs
    pub relocated: Vec<(PathBuf, PathBuf)>,
    /// Local effects that failed after the batch committed
    pub local_failures: Vec<LocalIoFailure>,
}

/// Rewrites a subtree under a new path
pub struct NodeMover {
    store: Arc<dyn INodeStore>,
    storage: Arc<dyn ILocalStorage>,
    media: Arc<dyn IMediaIndex>,
    layout: ContentLayout,
    offline: OfflinePropagator,
    conflicts: ConflictPropagator,
}

impl NodeMover {
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

    /// Moves `node` to `target_path` inside the folder `target_parent_path`
    ///
    /// # Errors
    ///
    /// `MirrorError::Usage`, before anything is written, when:
    /// - the node is not stored or is the root folder
    /// - `target_path` and the node disagree on being a folder
    /// - `target_path` is not a direct child of `target_parent_path`
    /// - the target parent does not exist or is not a folder
    /// - a node already exists at `target_path`
    /// - a folder would move into its own subtree
    #[instrument(skip(self, node), fields(account = %account, from = %node.remote_path(), to = %target_path))]
    pub async fn move_node(
        &self,
        account: &AccountName,
        node: &Node,
        target_path: &RemotePath,
        target_parent_path: &RemotePath,
    ) -> Result<MoveOutcome, MirrorError> {
        let stored = load_stored(self.store.as_ref(), account, node)
            .await?
            .ok_or_else(|| MirrorError::usage(format!("{} is not stored", node.remote_path())))?;
        let source = stored.remote_path().clone();

        if source.is_root() {
            return Err(MirrorError::usage("the root folder cannot be moved"));
        }
        if source.is_folder() != target_path.is_folder() {
            return Err(MirrorError::usage(format!(
                "cannot move {source} to {target_path}: folder paths end with '/' and file paths do not"
            )));
        }
        if target_path.parent().as_ref() != Some(target_parent_path) {
            return Err(MirrorError::usage(format!(
                "{target_path} is not a child of {target_parent_path}"
            )));
        }

        let parent = self
            .store
            .get_by_path(account, target_parent_path)
            .await?
            .ok_or_else(|| {
                MirrorError::usage(format!("target folder {target_parent_path} does not exist"))
            })?;
        if !parent.is_folder() {
            return Err(MirrorError::usage(format!(
                "target {target_parent_path} is not a folder"
            )));
        }

        if source == *target_path {
            debug!("source and target are the same, nothing to do");
            return Ok(MoveOutcome::default());
        }
        if source.is_strict_ancestor_of(target_path) {
            return Err(MirrorError::usage(format!(
                "cannot move {source} into its own subtree"
            )));
        }
        if self.store.exists_by_path(account, target_path).await? {
            return Err(MirrorError::usage(format!("{target_path} already exists")));
        }

        let moved_id = stored_id(&stored)?;
        let parent_id = stored_id(&parent)?;
        let inherits = parent.available_offline() == AvailableOffline::Offline
            || self
                .offline
                .find_offline_ancestor(account, &parent)
                .await?
                .is_some();

        let subtree = self.store.subtree(account, &source).await?;
        let mut ops = Vec::with_capacity(subtree.len());
        let mut relocated = Vec::new();
        let mut pins: Vec<&RemotePath> = Vec::new();
        let mut moved_conflicts = 0u64;
        let mut moved_marker: Option<&str> = None;

        for row in &subtree {
            let id = stored_id(row)?;
            let new_path = row.remote_path().rebase(&source, target_path).ok_or_else(|| {
                MirrorError::Persistence(anyhow::anyhow!(
                    "{} was returned for the subtree of {source}",
                    row.remote_path()
                ))
            })?;
            let mut changes = NodeChanges::default().with_remote_path(new_path);

            if id == moved_id {
                changes = changes.with_parent_id(parent_id);
            }

            if let Some(local) = row.local_path() {
                if let Some(new_local) =
                    self.layout
                        .rebase_local_path(account, local, &source, target_path)
                {
                    relocated.push((local.to_path_buf(), new_local.clone()));
                    changes = changes.with_local_path(Some(new_local));
                }
            }

            let current = row.available_offline();
            let status = if inherits {
                AvailableOffline::OfflineByParent
            } else if current == AvailableOffline::OfflineByParent
                && !pins.iter().any(|pin| pin.is_strict_ancestor_of(row.remote_path()))
            {
                AvailableOffline::NotOffline
            } else {
                current
            };
            if current == AvailableOffline::Offline {
                pins.push(row.remote_path());
            }
            if status != current {
                changes = changes.with_available_offline(status);
            }

            if is_conflicted_file(row) {
                moved_conflicts += 1;
                moved_marker = moved_marker.or(row.conflict_marker());
            }

            ops.push(NodeOp::update_id(account, id, changes));
        }

        if let Some(marker) = moved_marker {
            ops.extend(
                self.conflicts
                    .retraction_ops(account, &stored, moved_conflicts)
                    .await?,
            );
            ops.push(NodeOp::update_id(
                account,
                parent_id,
                NodeChanges::default().with_conflict_marker(Some(marker.to_string())),
            ));
            ops.extend(self.conflicts.marking_ops(account, &parent, marker).await?);
        }

        self.store.apply(ops).await?;
        info!(
            moved = subtree.len(),
            relocated = relocated.len(),
            inherits_offline = inherits,
            "subtree moved"
        );

        let mut effects = EffectQueue::new();
        effects.push(LocalEffect::MoveTree {
            from: self.layout.default_local_path(account, &source),
            to: self.layout.default_local_path(account, target_path),
            relocated: relocated.clone(),
        });
        let local_failures = effects
            .drain(self.storage.as_ref(), self.media.as_ref())
            .await;

        Ok(MoveOutcome {
            moved: subtree.len(),
            relocated,
            local_failures,
        })
    }
}

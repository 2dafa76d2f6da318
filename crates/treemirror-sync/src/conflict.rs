//! Conflict marker propagation
//!
//! A file in conflict carries the remote etag that clashed with its local
//! copy. Every ancestor folder carries a marker as long as at least one
//! file below it is in conflict, so a UI can flag the path down to the
//! culprit without scanning the tree.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, Node};
use treemirror_core::ports::{INodeStore, NodeChanges, NodeOp};

use crate::tree::{load_stored, stored_id, AncestorWalk};
use crate::MirrorError;

/// Maintains conflict markers on files and their ancestors
#[derive(Clone)]
pub struct ConflictPropagator {
    store: Arc<dyn INodeStore>,
}

impl ConflictPropagator {
    pub fn new(store: Arc<dyn INodeStore>) -> Self {
        Self { store }
    }

    /// Sets or clears the conflict marker of a node
    ///
    /// A marker on a node without cached content is meaningless and is
    /// stored as `None`. Returns the marker that was stored, or `None`
    /// without touching anything if the node is not stored.
    ///
    /// Folder markers are derived from the files below them, so a folder
    /// target is a usage error and leaves the tree untouched.
    #[instrument(skip(self, node, marker), fields(account = %account, path = %node.remote_path(), set = marker.is_some()))]
    pub async fn set_conflict(
        &self,
        account: &AccountName,
        node: &Node,
        marker: Option<String>,
    ) -> Result<Option<String>, MirrorError> {
        let Some(stored) = load_stored(self.store.as_ref(), account, node).await? else {
            debug!("node not stored, nothing to mark");
            return Ok(None);
        };
        if stored.is_folder() {
            return Err(MirrorError::usage(format!(
                "conflict markers belong to files; {} is a folder",
                stored.remote_path()
            )));
        }

        let marker = marker.filter(|_| stored.has_local_content());
        let mut ops = vec![NodeOp::update_id(
            account,
            stored_id(&stored)?,
            NodeChanges::default().with_conflict_marker(marker.clone()),
        )];

        match &marker {
            Some(marker) => ops.extend(self.marking_ops(account, &stored, marker).await?),
            None => {
                let departing = u64::from(is_conflicted_file(&stored));
                ops.extend(self.retraction_ops(account, &stored, departing).await?);
            }
        }

        let results = self.store.apply(ops).await?;
        info!(ancestors = results.len() - 1, "conflict marker updated");
        Ok(marker)
    }

    /// Updates that put `marker` on every strict ancestor of `node`
    pub(crate) async fn marking_ops(
        &self,
        account: &AccountName,
        node: &Node,
        marker: &str,
    ) -> Result<Vec<NodeOp>, MirrorError> {
        let mut ops = Vec::new();
        let mut walk = AncestorWalk::new(self.store.as_ref(), account, node);
        while let Some(ancestor) = walk.next().await? {
            ops.push(NodeOp::update_id(
                account,
                stored_id(&ancestor)?,
                NodeChanges::default().with_conflict_marker(Some(marker.to_string())),
            ));
        }
        Ok(ops)
    }

    /// Updates that clear ancestor markers once `departing` conflicted files
    /// below `node` (inclusive) go away in the same batch
    ///
    /// Walks root-ward from the parent of `node`, re-counting conflicted
    /// files at each level, and stops at the first folder that still has
    /// one left.
    pub(crate) async fn retraction_ops(
        &self,
        account: &AccountName,
        node: &Node,
        departing: u64,
    ) -> Result<Vec<NodeOp>, MirrorError> {
        let mut ops = Vec::new();
        let mut walk = AncestorWalk::new(self.store.as_ref(), account, node);
        while let Some(ancestor) = walk.next().await? {
            let remaining = self
                .store
                .count_conflicted_files(account, ancestor.remote_path())
                .await?
                .saturating_sub(departing);
            if remaining > 0 {
                debug!(folder = %ancestor.remote_path(), remaining, "ancestor keeps its marker");
                break;
            }
            ops.push(NodeOp::update_id(
                account,
                stored_id(&ancestor)?,
                NodeChanges::default().with_conflict_marker(None),
            ));
        }
        Ok(ops)
    }
}

/// True for a file row that currently counts as conflicted
pub(crate) fn is_conflicted_file(node: &Node) -> bool {
    !node.is_folder() && node.conflict_marker().is_some()
}

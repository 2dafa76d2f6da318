//! Available-offline propagation
//!
//! A user pins a file or folder with [`AvailableOffline::Offline`]. Every
//! node below a pinned folder carries the derived
//! [`AvailableOffline::OfflineByParent`] state. This module computes the
//! state of new nodes and cascades explicit changes down a subtree.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, AvailableOffline, Node};
use treemirror_core::ports::{INodeStore, NodeChanges, NodeOp, OpResult};

use crate::tree::{load_stored, stored_id, AncestorWalk};
use crate::MirrorError;

/// Computes and cascades available-offline status
#[derive(Clone)]
pub struct OfflinePropagator {
    store: Arc<dyn INodeStore>,
}

impl OfflinePropagator {
    pub fn new(store: Arc<dyn INodeStore>) -> Self {
        Self { store }
    }

    /// Status a new child of `parent_candidate` starts with
    ///
    /// `OfflineByParent` when the candidate or any of its ancestors is
    /// pinned, `NotOffline` otherwise.
    pub async fn initial_status(
        &self,
        account: &AccountName,
        parent_candidate: &Node,
    ) -> Result<AvailableOffline, MirrorError> {
        if parent_candidate.available_offline() == AvailableOffline::Offline {
            return Ok(AvailableOffline::OfflineByParent);
        }
        if self
            .find_offline_ancestor(account, parent_candidate)
            .await?
            .is_some()
        {
            return Ok(AvailableOffline::OfflineByParent);
        }
        Ok(AvailableOffline::NotOffline)
    }

    /// Nearest strict ancestor whose status is exactly `Offline`
    pub async fn find_offline_ancestor(
        &self,
        account: &AccountName,
        node: &Node,
    ) -> Result<Option<Node>, MirrorError> {
        let mut walk = AncestorWalk::new(self.store.as_ref(), account, node);
        while let Some(ancestor) = walk.next().await? {
            if ancestor.available_offline() == AvailableOffline::Offline {
                return Ok(Some(ancestor));
            }
        }
        Ok(None)
    }

    /// Persists an explicit status and cascades it over a folder's subtree
    ///
    /// Pinning a folder turns every strict descendant into
    /// `OfflineByParent`; any other status turns them into `NotOffline`,
    /// dropping pins of their own. Both cascades are unconditional.
    ///
    /// Returns `Ok(false)` without touching anything if the node is not
    /// stored.
    ///
    /// # Errors
    ///
    /// `MirrorError::Usage` for `OfflineByParent`, which is only ever
    /// derived.
    #[instrument(skip(self, node), fields(account = %account, path = %node.remote_path(), %status))]
    pub async fn set_status(
        &self,
        account: &AccountName,
        node: &Node,
        status: AvailableOffline,
    ) -> Result<bool, MirrorError> {
        if status.is_derived() {
            return Err(MirrorError::usage(format!(
                "{status} cannot be set explicitly on {}",
                node.remote_path()
            )));
        }

        let Some(stored) = load_stored(self.store.as_ref(), account, node).await? else {
            debug!("node not stored, nothing to update");
            return Ok(false);
        };

        let mut ops = vec![NodeOp::update_id(
            account,
            stored_id(&stored)?,
            NodeChanges::default().with_available_offline(status),
        )];

        if stored.is_folder() {
            let inherited = match status {
                AvailableOffline::Offline => AvailableOffline::OfflineByParent,
                _ => AvailableOffline::NotOffline,
            };
            ops.push(NodeOp::UpdateDescendants {
                account: account.clone(),
                root: stored.remote_path().clone(),
                changes: NodeChanges::default().with_available_offline(inherited),
            });
        }

        let results = self.store.apply(ops).await?;
        let changed = results.first().map_or(false, |r| r.rows() > 0);
        info!(
            changed,
            cascaded = results.get(1).map_or(0, OpResult::rows),
            "available-offline status updated"
        );
        Ok(changed)
    }
}

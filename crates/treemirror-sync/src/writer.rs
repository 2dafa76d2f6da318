//! Single-node saves
//!
//! Used when one node is learned about outside of a folder listing, for
//! example after an upload or a download finished. Propagated state
//! (available-offline status, conflict marker) is never written here.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, AvailableOffline, Node};
use treemirror_core::ports::{INodeStore, NodeChanges, NodeOp, OpResult};

use crate::offline::OfflinePropagator;
use crate::tree::stored_id;
use crate::MirrorError;

/// Upserts individual nodes
pub struct NodeWriter {
    store: Arc<dyn INodeStore>,
    offline: OfflinePropagator,
}

impl NodeWriter {
    pub fn new(store: Arc<dyn INodeStore>) -> Self {
        Self {
            offline: OfflinePropagator::new(Arc::clone(&store)),
            store,
        }
    }

    /// Saves `node`, overwriting the row at its path (or with its id)
    ///
    /// A new row starts with the available-offline status inherited from
    /// its parent. The stored id and propagated state are written back into
    /// `node`. Returns `true` when an existing row was overwritten.
    ///
    /// # Errors
    ///
    /// `MirrorError::Usage` when the node belongs to another account, or
    /// when a new row's parent is not stored.
    #[instrument(skip(self, node), fields(account = %account, path = %node.remote_path()))]
    pub async fn save_node(
        &self,
        account: &AccountName,
        node: &mut Node,
    ) -> Result<bool, MirrorError> {
        if node.account() != account {
            return Err(MirrorError::usage(format!(
                "{} belongs to account {}",
                node.remote_path(),
                node.account()
            )));
        }

        let existing = match self.store.get_by_path(account, node.remote_path()).await? {
            Some(existing) => Some(existing),
            None => match node.id() {
                Some(id) => self.store.get_by_id(account, id).await?,
                None => None,
            },
        };

        if let Some(existing) = existing {
            let id = stored_id(&existing)?;
            self.store
                .apply(vec![NodeOp::update_id(account, id, NodeChanges::record(node))])
                .await?;
            node.set_id(id);
            node.set_available_offline(existing.available_offline());
            node.set_conflict_marker(existing.conflict_marker().map(str::to_string));
            debug!(%id, "node overwritten");
            return Ok(true);
        }

        let status = self.initial_status(account, node).await?;
        let mut fresh = node.clone();
        fresh.set_available_offline(status);
        fresh.set_conflict_marker(None);

        let results = self.store.apply(vec![NodeOp::Insert(fresh)]).await?;
        let id = results
            .first()
            .and_then(OpResult::inserted_id)
            .ok_or_else(|| MirrorError::Persistence(anyhow::anyhow!("insert returned no id")))?;
        node.set_id(id);
        node.set_available_offline(status);
        node.set_conflict_marker(None);
        info!(%id, %status, "node inserted");
        Ok(false)
    }

    /// Returns the root folder of `account`, creating it if missing
    #[instrument(skip(self), fields(account = %account))]
    pub async fn ensure_root(&self, account: &AccountName) -> Result<Node, MirrorError> {
        let mut root = Node::root(account.clone());
        if let Some(stored) = self.store.get_by_path(account, root.remote_path()).await? {
            return Ok(stored);
        }
        self.save_node(account, &mut root).await?;
        Ok(root)
    }

    async fn initial_status(
        &self,
        account: &AccountName,
        node: &Node,
    ) -> Result<AvailableOffline, MirrorError> {
        if node.parent_id().is_root_parent() {
            if node.remote_path().is_root() {
                return Ok(AvailableOffline::NotOffline);
            }
            return Err(MirrorError::usage(format!(
                "{} has no parent",
                node.remote_path()
            )));
        }
        let parent = self
            .store
            .get_by_id(account, node.parent_id())
            .await?
            .ok_or_else(|| {
                MirrorError::usage(format!(
                    "parent {} of {} is not stored",
                    node.parent_id(),
                    node.remote_path()
                ))
            })?;
        self.offline.initial_status(account, &parent).await
    }
}

//! Ancestor and descendant walks over the node table
//!
//! Every propagation rule in the engine is expressed with two primitives:
//! [`AncestorWalk`], a lazy cursor that follows `parent_id` towards the
//! root, and [`strict_descendants`], a path-ordered prefix scan.

use std::collections::HashSet;

use tracing::{debug, warn};
use treemirror_core::domain::{AccountName, Node, NodeId};
use treemirror_core::ports::INodeStore;

use crate::MirrorError;

/// Lazy root-ward cursor over the `parent_id` chain of a node
///
/// Each call to [`AncestorWalk::next`] reads one row. The walk ends at the
/// root sentinel, at a parent id with no row, or before revisiting a row.
pub struct AncestorWalk<'a> {
    store: &'a dyn INodeStore,
    account: &'a AccountName,
    next: NodeId,
    seen: HashSet<NodeId>,
}

impl<'a> AncestorWalk<'a> {
    /// Starts at the parent of `node`
    pub fn new(store: &'a dyn INodeStore, account: &'a AccountName, node: &Node) -> Self {
        let mut seen = HashSet::new();
        if let Some(id) = node.id() {
            seen.insert(id);
        }
        Self {
            store,
            account,
            next: node.parent_id(),
            seen,
        }
    }

    /// Reads the next ancestor, `None` once the chain is exhausted
    pub async fn next(&mut self) -> anyhow::Result<Option<Node>> {
        if self.next.is_root_parent() {
            return Ok(None);
        }

        let id = self.next;
        self.next = NodeId::ROOT_PARENT;

        if !self.seen.insert(id) {
            warn!(account = %self.account, %id, "parent chain loops back, stopping walk");
            return Ok(None);
        }

        match self.store.get_by_id(self.account, id).await? {
            Some(ancestor) => {
                self.next = ancestor.parent_id();
                Ok(Some(ancestor))
            }
            None => {
                debug!(account = %self.account, %id, "parent chain ends at a missing row");
                Ok(None)
            }
        }
    }
}

/// Strict descendants of `node` ordered by path; empty for files
pub async fn strict_descendants(
    store: &dyn INodeStore,
    account: &AccountName,
    node: &Node,
) -> anyhow::Result<Vec<Node>> {
    if !node.is_folder() {
        return Ok(Vec::new());
    }
    let mut nodes = store.subtree(account, node.remote_path()).await?;
    nodes.retain(|n| n.remote_path() != node.remote_path());
    Ok(nodes)
}

/// Re-reads the stored row for `node`, by id when it has one
pub(crate) async fn load_stored(
    store: &dyn INodeStore,
    account: &AccountName,
    node: &Node,
) -> anyhow::Result<Option<Node>> {
    match node.id() {
        Some(id) => store.get_by_id(account, id).await,
        None => store.get_by_path(account, node.remote_path()).await,
    }
}

/// Id of a row read back from the store
pub(crate) fn stored_id(node: &Node) -> Result<NodeId, MirrorError> {
    node.id().ok_or_else(|| {
        MirrorError::Persistence(anyhow::anyhow!(
            "stored node {} has no id",
            node.remote_path()
        ))
    })
}

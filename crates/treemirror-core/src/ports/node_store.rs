//! Node store port (driven/secondary port)
//!
//! This module defines the interface for persisting and querying the
//! mirrored node tree, plus the batch operation types accepted by
//! [`INodeStore::apply`].
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and the engine only needs to know that a batch failed.
//! - Every query takes the owning [`AccountName`] explicitly; there is no
//!   ambient "current account".
//! - Writes only happen through [`INodeStore::apply`], which is
//!   all-or-nothing. Readers never observe half of a batch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::{AccountName, AvailableOffline, Node, NodeId, RemoteId, RemotePath};

// ============================================================================
// Batch operations
// ============================================================================

/// Row selector for an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTarget {
    /// The row with this id
    Id(NodeId),
    /// The row at this path
    Path(RemotePath),
}

/// Column changes carried by an update
///
/// Each `None` leaves the column untouched. Nullable columns use a nested
/// `Option` so that `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeChanges {
    pub parent_id: Option<NodeId>,
    pub remote_path: Option<RemotePath>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub etag: Option<Option<String>>,
    pub tree_etag: Option<Option<String>>,
    pub local_path: Option<Option<PathBuf>>,
    pub available_offline: Option<AvailableOffline>,
    pub conflict_marker: Option<Option<String>>,
    pub created_at: Option<Option<DateTime<Utc>>>,
    pub modified_at: Option<Option<DateTime<Utc>>>,
    pub modified_at_last_sync_for_data: Option<Option<DateTime<Utc>>>,
    pub last_sync_for_properties: Option<Option<DateTime<Utc>>>,
    pub last_sync_for_data: Option<Option<DateTime<Utc>>>,
    pub shared_via_link: Option<bool>,
    pub shared_with_sharee: Option<bool>,
    pub permissions: Option<Option<String>>,
    pub remote_id: Option<Option<RemoteId>>,
    pub private_link: Option<Option<String>>,
    pub needs_thumbnail_update: Option<bool>,
    pub is_downloading: Option<bool>,
}

impl NodeChanges {
    /// Attributes observed on the remote service
    ///
    /// Client-local state (cached content, available-offline status,
    /// conflict marker, data sync timestamps, downloading flag) is left
    /// out so that a listing never clobbers it.
    pub fn remote_metadata(node: &Node) -> Self {
        Self {
            parent_id: Some(node.parent_id()),
            remote_path: Some(node.remote_path().clone()),
            mime_type: Some(node.mime_type().to_string()),
            size: Some(node.size()),
            etag: Some(node.etag().map(str::to_string)),
            tree_etag: Some(node.tree_etag().map(str::to_string)),
            created_at: Some(node.created_at()),
            modified_at: Some(node.modified_at()),
            last_sync_for_properties: Some(node.last_sync_for_properties()),
            shared_via_link: Some(node.shared_via_link()),
            shared_with_sharee: Some(node.shared_with_sharee()),
            permissions: Some(node.permissions().map(str::to_string)),
            remote_id: Some(node.remote_id().cloned()),
            private_link: Some(node.private_link().map(str::to_string)),
            needs_thumbnail_update: Some(node.needs_thumbnail_update()),
            ..Self::default()
        }
    }

    /// Every column except the propagated ones
    ///
    /// Used by single-node saves where the caller owns the full record.
    /// The available-offline status and the conflict marker are only ever
    /// written by their propagators, which keep ancestors consistent.
    pub fn record(node: &Node) -> Self {
        Self {
            local_path: Some(node.local_path().map(Path::to_path_buf)),
            modified_at_last_sync_for_data: Some(node.modified_at_last_sync_for_data()),
            last_sync_for_data: Some(node.last_sync_for_data()),
            is_downloading: Some(node.is_downloading()),
            ..Self::remote_metadata(node)
        }
    }

    #[must_use]
    pub fn with_parent_id(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn with_remote_path(mut self, path: RemotePath) -> Self {
        self.remote_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_local_path(mut self, local_path: Option<PathBuf>) -> Self {
        self.local_path = Some(local_path);
        self
    }

    #[must_use]
    pub fn with_available_offline(mut self, status: AvailableOffline) -> Self {
        self.available_offline = Some(status);
        self
    }

    #[must_use]
    pub fn with_conflict_marker(mut self, marker: Option<String>) -> Self {
        self.conflict_marker = Some(marker);
        self
    }

    /// Returns true if no column is touched
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One write in a batch submitted to [`INodeStore::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOp {
    /// Insert a new row; the node's id is ignored and reassigned
    Insert(Node),
    /// Update the selected row
    Update {
        account: AccountName,
        target: NodeTarget,
        changes: NodeChanges,
    },
    /// Update every strict descendant of the folder at `root`
    UpdateDescendants {
        account: AccountName,
        root: RemotePath,
        changes: NodeChanges,
    },
    /// Delete the row at `path`; a folder path also removes its subtree
    Delete { account: AccountName, path: RemotePath },
}

impl NodeOp {
    /// Convenience constructor for an update by id
    pub fn update_id(account: &AccountName, id: NodeId, changes: NodeChanges) -> Self {
        NodeOp::Update {
            account: account.clone(),
            target: NodeTarget::Id(id),
            changes,
        }
    }
}

/// Outcome of one [`NodeOp`], in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpResult {
    /// Id assigned to the inserted row
    Inserted(NodeId),
    /// Number of rows updated
    Updated(u64),
    /// Number of rows deleted
    Deleted(u64),
}

impl OpResult {
    /// Assigned id for inserts, `None` otherwise
    pub fn inserted_id(&self) -> Option<NodeId> {
        match self {
            OpResult::Inserted(id) => Some(*id),
            _ => None,
        }
    }

    /// Rows touched by the operation
    pub fn rows(&self) -> u64 {
        match self {
            OpResult::Inserted(_) => 1,
            OpResult::Updated(n) | OpResult::Deleted(n) => *n,
        }
    }
}

// ============================================================================
// INodeStore trait
// ============================================================================

/// Port trait for the transactional node table
///
/// ## Implementation Notes
///
/// - `subtree` is an inclusive prefix-range scan: a folder path matches
///   itself and every path starting with it, a file path only itself.
///   Results are ordered by path ascending.
/// - `apply` must run all operations in one transaction and roll back
///   completely if any of them fails, including unique-path violations.
#[async_trait::async_trait]
pub trait INodeStore: Send + Sync {
    /// Retrieves a node by its remote path
    async fn get_by_path(
        &self,
        account: &AccountName,
        path: &RemotePath,
    ) -> anyhow::Result<Option<Node>>;

    /// Retrieves a node by its id
    async fn get_by_id(&self, account: &AccountName, id: NodeId) -> anyhow::Result<Option<Node>>;

    /// Retrieves a node by its remote identifier
    async fn get_by_remote_id(
        &self,
        account: &AccountName,
        remote_id: &RemoteId,
    ) -> anyhow::Result<Option<Node>>;

    /// Retrieves the file whose cached content lives at `local_path`
    async fn get_by_local_path(
        &self,
        account: &AccountName,
        local_path: &Path,
    ) -> anyhow::Result<Option<Node>>;

    async fn exists_by_path(&self, account: &AccountName, path: &RemotePath)
        -> anyhow::Result<bool>;

    async fn exists_by_id(&self, account: &AccountName, id: NodeId) -> anyhow::Result<bool>;

    /// Direct children of a folder ordered by path
    ///
    /// With `offline_only`, only children that are pinned or inherit a pin.
    async fn children(
        &self,
        account: &AccountName,
        parent_id: NodeId,
        offline_only: bool,
    ) -> anyhow::Result<Vec<Node>>;

    /// Inclusive prefix-range scan ordered by path
    async fn subtree(&self, account: &AccountName, root: &RemotePath)
        -> anyhow::Result<Vec<Node>>;

    /// Number of files below `prefix` that carry a conflict marker
    async fn count_conflicted_files(
        &self,
        account: &AccountName,
        prefix: &RemotePath,
    ) -> anyhow::Result<u64>;

    /// Files of every account that are pinned or inherit a pin
    async fn available_offline_files(&self) -> anyhow::Result<Vec<Node>>;

    /// Nodes of `account` pinned by the user
    async fn pinned_nodes(&self, account: &AccountName) -> anyhow::Result<Vec<Node>>;

    /// Applies a batch atomically, returning one result per operation
    async fn apply(&self, ops: Vec<NodeOp>) -> anyhow::Result<Vec<OpResult>>;
}

//! Read surface over the mirrored tree
//!
//! Lookups here return nodes as a client should see them: a file row with
//! no recorded local path whose default location exists on disk is
//! reported with that location. The binding is not persisted.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;
use treemirror_core::domain::{AccountName, ContentLayout, Node, NodeId, RemoteId, RemotePath};
use treemirror_core::ports::{ILocalStorage, INodeStore};

use crate::offline::OfflinePropagator;
use crate::MirrorError;

/// Read-only queries with cached-content binding
pub struct MirrorQueries {
    store: Arc<dyn INodeStore>,
    storage: Arc<dyn ILocalStorage>,
    layout: ContentLayout,
    offline: OfflinePropagator,
}

impl MirrorQueries {
    pub fn new(
        store: Arc<dyn INodeStore>,
        storage: Arc<dyn ILocalStorage>,
        layout: ContentLayout,
    ) -> Self {
        Self {
            offline: OfflinePropagator::new(Arc::clone(&store)),
            store,
            storage,
            layout,
        }
    }

    pub async fn get_by_path(
        &self,
        account: &AccountName,
        path: &RemotePath,
    ) -> Result<Option<Node>, MirrorError> {
        let node = self.store.get_by_path(account, path).await?;
        self.bind_optional(node).await
    }

    pub async fn get_by_id(
        &self,
        account: &AccountName,
        id: NodeId,
    ) -> Result<Option<Node>, MirrorError> {
        let node = self.store.get_by_id(account, id).await?;
        self.bind_optional(node).await
    }

    pub async fn get_by_remote_id(
        &self,
        account: &AccountName,
        remote_id: &RemoteId,
    ) -> Result<Option<Node>, MirrorError> {
        let node = self.store.get_by_remote_id(account, remote_id).await?;
        self.bind_optional(node).await
    }

    pub async fn get_by_local_path(
        &self,
        account: &AccountName,
        local_path: &Path,
    ) -> Result<Option<Node>, MirrorError> {
        Ok(self.store.get_by_local_path(account, local_path).await?)
    }

    /// Direct children of `folder`; empty for files and unsaved folders
    pub async fn children(
        &self,
        account: &AccountName,
        folder: &Node,
        offline_only: bool,
    ) -> Result<Vec<Node>, MirrorError> {
        let Some(id) = folder.id().filter(|_| folder.is_folder()) else {
            return Ok(Vec::new());
        };
        let nodes = self.store.children(account, id, offline_only).await?;
        self.bind_all(nodes).await
    }

    /// Files of every account that should be kept cached
    pub async fn available_offline_files(&self) -> Result<Vec<Node>, MirrorError> {
        let nodes = self.store.available_offline_files().await?;
        self.bind_all(nodes).await
    }

    /// Nodes pinned explicitly by the user
    pub async fn pinned_nodes(&self, account: &AccountName) -> Result<Vec<Node>, MirrorError> {
        let nodes = self.store.pinned_nodes(account).await?;
        self.bind_all(nodes).await
    }

    /// Nearest pinned strict ancestor of `node`
    pub async fn offline_ancestor(
        &self,
        account: &AccountName,
        node: &Node,
    ) -> Result<Option<Node>, MirrorError> {
        self.offline.find_offline_ancestor(account, node).await
    }

    async fn bind_optional(&self, node: Option<Node>) -> Result<Option<Node>, MirrorError> {
        match node {
            Some(node) => Ok(Some(self.bind_content(node).await)),
            None => Ok(None),
        }
    }

    async fn bind_all(&self, nodes: Vec<Node>) -> Result<Vec<Node>, MirrorError> {
        let mut bound = Vec::with_capacity(nodes.len());
        for node in nodes {
            bound.push(self.bind_content(node).await);
        }
        Ok(bound)
    }

    async fn bind_content(&self, mut node: Node) -> Node {
        if node.is_folder() || node.local_path().is_some() {
            return node;
        }
        let default = self
            .layout
            .default_local_path(node.account(), node.remote_path());
        match self.storage.exists(&default).await {
            Ok(true) => node.set_local_path(Some(default)),
            Ok(false) => {}
            Err(e) => warn!(
                path = %default.display(),
                error = %format!("{e:#}"),
                "cannot probe default location"
            ),
        }
        node
    }
}

//! Shared test helpers for engine integration tests
//!
//! Provides a [`Harness`] bundling an in-memory node store, a temporary
//! content root and a media index that records notifications.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use treemirror_cache::{DatabasePool, SqliteNodeStore};
use treemirror_core::domain::{
    AccountName, AvailableOffline, ContentLayout, Node, NodeId, RemoteId, RemotePath,
};
use treemirror_core::ports::{IMediaIndex, INodeStore, NodeOp, OpResult};
use treemirror_sync::filesystem::LocalStorageAdapter;
use treemirror_sync::MirrorEngine;

// ============================================================================
// Media index recorder
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Added(PathBuf),
    Removed(PathBuf),
}

#[derive(Default)]
pub struct RecordingMediaIndex {
    events: Mutex<Vec<MediaEvent>>,
}

impl RecordingMediaIndex {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl IMediaIndex for RecordingMediaIndex {
    fn added(&self, path: &Path) {
        self.events
            .lock()
            .unwrap()
            .push(MediaEvent::Added(path.to_path_buf()));
    }

    fn removed(&self, path: &Path) {
        self.events
            .lock()
            .unwrap()
            .push(MediaEvent::Removed(path.to_path_buf()));
    }
}

// ============================================================================
// Store that fails every batch
// ============================================================================

/// Delegates to a real store but appends a duplicate root insert to every
/// batch, so each `apply` hits a unique-path violation at its very end.
pub struct FailingStore {
    inner: Arc<SqliteNodeStore>,
}

#[async_trait::async_trait]
impl INodeStore for FailingStore {
    async fn get_by_path(
        &self,
        account: &AccountName,
        path: &RemotePath,
    ) -> anyhow::Result<Option<Node>> {
        self.inner.get_by_path(account, path).await
    }

    async fn get_by_id(&self, account: &AccountName, id: NodeId) -> anyhow::Result<Option<Node>> {
        self.inner.get_by_id(account, id).await
    }

    async fn get_by_remote_id(
        &self,
        account: &AccountName,
        remote_id: &RemoteId,
    ) -> anyhow::Result<Option<Node>> {
        self.inner.get_by_remote_id(account, remote_id).await
    }

    async fn get_by_local_path(
        &self,
        account: &AccountName,
        local_path: &Path,
    ) -> anyhow::Result<Option<Node>> {
        self.inner.get_by_local_path(account, local_path).await
    }

    async fn exists_by_path(
        &self,
        account: &AccountName,
        path: &RemotePath,
    ) -> anyhow::Result<bool> {
        self.inner.exists_by_path(account, path).await
    }

    async fn exists_by_id(&self, account: &AccountName, id: NodeId) -> anyhow::Result<bool> {
        self.inner.exists_by_id(account, id).await
    }

    async fn children(
        &self,
        account: &AccountName,
        parent_id: NodeId,
        offline_only: bool,
    ) -> anyhow::Result<Vec<Node>> {
        self.inner.children(account, parent_id, offline_only).await
    }

    async fn subtree(
        &self,
        account: &AccountName,
        root: &RemotePath,
    ) -> anyhow::Result<Vec<Node>> {
        self.inner.subtree(account, root).await
    }

    async fn count_conflicted_files(
        &self,
        account: &AccountName,
        prefix: &RemotePath,
    ) -> anyhow::Result<u64> {
        self.inner.count_conflicted_files(account, prefix).await
    }

    async fn available_offline_files(&self) -> anyhow::Result<Vec<Node>> {
        self.inner.available_offline_files().await
    }

    async fn pinned_nodes(&self, account: &AccountName) -> anyhow::Result<Vec<Node>> {
        self.inner.pinned_nodes(account).await
    }

    async fn apply(&self, mut ops: Vec<NodeOp>) -> anyhow::Result<Vec<OpResult>> {
        ops.push(NodeOp::Insert(Node::root(alice())));
        self.inner.apply(ops).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: MirrorEngine,
    pub store: Arc<SqliteNodeStore>,
    pub media: Arc<RecordingMediaIndex>,
    pub content: TempDir,
    pub account: AccountName,
}

/// Fresh in-memory store and content root
pub async fn harness() -> Harness {
    build(|store| store).await
}

/// Same as [`harness`], but every batch submitted by the engine fails
pub async fn failing_harness() -> Harness {
    build(|store| Arc::new(FailingStore { inner: store })).await
}

async fn build(wrap: impl FnOnce(Arc<SqliteNodeStore>) -> Arc<dyn INodeStore>) -> Harness {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let store = Arc::new(SqliteNodeStore::new(pool.pool().clone()));
    let media = Arc::new(RecordingMediaIndex::default());
    let content = TempDir::new().unwrap();

    let engine = MirrorEngine::new(
        wrap(Arc::clone(&store)),
        Arc::new(LocalStorageAdapter::new()),
        media.clone(),
        ContentLayout::new(content.path()),
    );

    Harness {
        engine,
        store,
        media,
        content,
        account: alice(),
    }
}

pub fn alice() -> AccountName {
    AccountName::new("alice").unwrap()
}

pub fn path(p: &str) -> RemotePath {
    RemotePath::new(p).unwrap()
}

impl Harness {
    pub fn folder(&self, p: &str, parent: NodeId) -> Node {
        Node::new_folder(self.account.clone(), path(p), parent).unwrap()
    }

    pub fn file(&self, p: &str, parent: NodeId) -> Node {
        Node::new_file(self.account.clone(), path(p), parent, "text/plain").unwrap()
    }

    /// Inserts a row directly, bypassing the engine
    pub async fn insert(&self, node: Node) -> NodeId {
        let results = self.store.apply(vec![NodeOp::Insert(node)]).await.unwrap();
        results[0].inserted_id().unwrap()
    }

    /// Stored row at `p`; panics if missing
    pub async fn node(&self, p: &str) -> Node {
        self.store
            .get_by_path(&self.account, &path(p))
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{p} should be stored"))
    }

    pub async fn exists(&self, p: &str) -> bool {
        self.store.exists_by_path(&self.account, &path(p)).await.unwrap()
    }

    pub async fn status(&self, p: &str) -> AvailableOffline {
        self.node(p).await.available_offline()
    }

    pub async fn marker(&self, p: &str) -> Option<String> {
        self.node(p).await.conflict_marker().map(str::to_string)
    }

    /// Every row of the account, ordered by path
    pub async fn snapshot(&self) -> Vec<Node> {
        self.store
            .subtree(&self.account, &RemotePath::root())
            .await
            .unwrap()
    }

    /// Default local location of `p`
    pub fn local(&self, p: &str) -> PathBuf {
        self.engine.layout().default_local_path(&self.account, &path(p))
    }

    /// Writes bytes at the default location of `p` and returns it
    pub fn write_cached(&self, p: &str, bytes: &[u8]) -> PathBuf {
        let local = self.local(p);
        std::fs::create_dir_all(local.parent().unwrap()).unwrap();
        std::fs::write(&local, bytes).unwrap();
        local
    }

    /// Builds the standard tree used across tests
    ///
    /// ```text
    /// /
    /// ├── Docs/
    /// │   ├── a.txt        (cached)
    /// │   └── Sub/
    /// │       └── b.txt    (cached)
    /// └── Music/
    /// ```
    pub async fn seed(&self) -> Tree {
        let root = self.insert(Node::root(self.account.clone())).await;
        let docs = self.insert(self.folder("/Docs/", root)).await;
        let a_local = self.write_cached("/Docs/a.txt", b"a");
        let a = self
            .insert(self.file("/Docs/a.txt", docs).with_local_path(a_local))
            .await;
        let sub = self.insert(self.folder("/Docs/Sub/", docs)).await;
        let b_local = self.write_cached("/Docs/Sub/b.txt", b"b");
        let b = self
            .insert(self.file("/Docs/Sub/b.txt", sub).with_local_path(b_local))
            .await;
        let music = self.insert(self.folder("/Music/", root)).await;
        Tree {
            root,
            docs,
            a,
            sub,
            b,
            music,
        }
    }
}

/// Ids of the standard tree
#[derive(Debug, Clone, Copy)]
pub struct Tree {
    pub root: NodeId,
    pub docs: NodeId,
    pub a: NodeId,
    pub sub: NodeId,
    pub b: NodeId,
    pub music: NodeId,
}

//! Copies of cached content
//!
//! A remote copy creates a new node whose bytes are identical to the
//! source's. When the source is cached the bytes are copied locally so the
//! new node does not need a download.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, instrument};
use treemirror_core::domain::{AccountName, ContentLayout, Node, RemotePath};
use treemirror_core::ports::{ILocalStorage, IMediaIndex, INodeStore, NodeChanges, NodeOp};

use crate::effects::LocalIoFailure;
use crate::tree::{load_stored, stored_id};
use crate::MirrorError;

/// Summary of a local copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOutcome {
    /// Where the bytes were copied, `None` when nothing was cached
    pub copied_to: Option<PathBuf>,
    /// True when a node at the target path now points at the copy
    pub linked: bool,
    /// The copy itself, if it failed
    pub local_failures: Vec<LocalIoFailure>,
}

/// Copies cached bytes to the default location of another path
pub struct NodeCopier {
    store: Arc<dyn INodeStore>,
    storage: Arc<dyn ILocalStorage>,
    media: Arc<dyn IMediaIndex>,
    layout: ContentLayout,
}

impl NodeCopier {
    pub fn new(
        store: Arc<dyn INodeStore>,
        storage: Arc<dyn ILocalStorage>,
        media: Arc<dyn IMediaIndex>,
        layout: ContentLayout,
    ) -> Self {
        Self {
            store,
            storage,
            media,
            layout,
        }
    }

    /// Copies the cached bytes of `node` for the file at `target_path`
    ///
    /// Unlike removals, bytes come first here: the target row is only
    /// pointed at the copy once it exists on disk.
    #[instrument(skip(self, node), fields(account = %account, from = %node.remote_path(), to = %target_path))]
    pub async fn copy_local(
        &self,
        account: &AccountName,
        node: &Node,
        target_path: &RemotePath,
    ) -> Result<CopyOutcome, MirrorError> {
        let source = load_stored(self.store.as_ref(), account, node)
            .await?
            .unwrap_or_else(|| node.clone());
        if source.is_folder() || target_path.is_folder() {
            return Err(MirrorError::usage(format!(
                "only files can be copied: {} -> {target_path}",
                source.remote_path()
            )));
        }

        let Some(src) = source.local_path() else {
            debug!("source has no cached content");
            return Ok(CopyOutcome::default());
        };
        let dst = self.layout.default_local_path(account, target_path);

        if let Err(e) = self.storage.copy(src, &dst).await {
            let mut local_failures = Vec::new();
            LocalIoFailure::record(&mut local_failures, &dst, "copy", &e);
            return Ok(CopyOutcome {
                local_failures,
                ..CopyOutcome::default()
            });
        }
        self.media.added(&dst);

        let mut linked = false;
        if let Some(target) = self.store.get_by_path(account, target_path).await? {
            self.store
                .apply(vec![NodeOp::update_id(
                    account,
                    stored_id(&target)?,
                    NodeChanges::default().with_local_path(Some(dst.clone())),
                )])
                .await?;
            linked = true;
        }

        info!(dst = %dst.display(), linked, "cached content copied");
        Ok(CopyOutcome {
            copied_to: Some(dst),
            linked,
            local_failures: Vec::new(),
        })
    }
}

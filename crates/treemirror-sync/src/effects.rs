//! Local side effects run after a batch commits
//!
//! Operations never touch cached bytes while their batch is pending.
//! Instead they queue [`LocalEffect`]s and drain the queue once the store
//! has committed. A failing effect does not undo the metadata change: it is
//! logged and returned as a [`LocalIoFailure`] so the caller can retry or
//! repair the content later.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use treemirror_core::domain::{AccountName, ContentLayout, Node};
use treemirror_core::ports::{ILocalStorage, IMediaIndex};

/// One pending change to cached content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEffect {
    /// Delete one cached file
    DeleteFile(PathBuf),
    /// Delete a directory tree, plus cached files that live outside of it
    ///
    /// `cached` lists every cached file that belonged to the removed
    /// subtree; each one that disappears is reported to the media index.
    PurgeTree { root: PathBuf, cached: Vec<PathBuf> },
    /// Relocate a directory tree or file
    ///
    /// Skipped silently when `from` does not exist. `relocated` pairs are
    /// reported to the media index once the move succeeded.
    MoveTree {
        from: PathBuf,
        to: PathBuf,
        relocated: Vec<(PathBuf, PathBuf)>,
    },
}

/// A local effect that failed after its batch committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIoFailure {
    pub path: PathBuf,
    pub operation: &'static str,
    pub message: String,
}

impl LocalIoFailure {
    /// Logs a failed effect and appends it to `failures`
    pub(crate) fn record(
        failures: &mut Vec<LocalIoFailure>,
        path: &Path,
        operation: &'static str,
        error: &anyhow::Error,
    ) {
        warn!(
            path = %path.display(),
            operation,
            error = %format!("{error:#}"),
            "local content out of sync with committed metadata"
        );
        failures.push(LocalIoFailure {
            path: path.to_path_buf(),
            operation,
            message: format!("{error:#}"),
        });
    }
}

/// Ordered queue of effects belonging to one operation
#[derive(Debug, Default)]
pub struct EffectQueue {
    effects: Vec<LocalEffect>,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: LocalEffect) {
        self.effects.push(effect);
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Runs every effect in order, collecting failures
    pub async fn drain(
        self,
        storage: &dyn ILocalStorage,
        media: &dyn IMediaIndex,
    ) -> Vec<LocalIoFailure> {
        let mut failures = Vec::new();
        if self.is_empty() {
            return failures;
        }

        for effect in self.effects {
            match effect {
                LocalEffect::DeleteFile(path) => {
                    delete_file(storage, media, &path, &mut failures).await;
                }
                LocalEffect::PurgeTree { root, cached } => {
                    let root_removed = match storage.delete(&root).await {
                        Ok(removed) => removed,
                        Err(e) => {
                            LocalIoFailure::record(&mut failures, &root, "purge", &e);
                            false
                        }
                    };
                    debug!(root = %root.display(), root_removed, "purged local tree");

                    for path in cached {
                        if path.starts_with(&root) {
                            if root_removed {
                                media.removed(&path);
                            }
                        } else {
                            delete_file(storage, media, &path, &mut failures).await;
                        }
                    }
                }
                LocalEffect::MoveTree {
                    from,
                    to,
                    relocated,
                } => {
                    match storage.exists(&from).await {
                        Ok(true) => {}
                        Ok(false) => {
                            debug!(from = %from.display(), "nothing cached to relocate");
                            continue;
                        }
                        Err(e) => {
                            LocalIoFailure::record(&mut failures, &from, "move", &e);
                            continue;
                        }
                    }

                    match storage.move_tree(&from, &to).await {
                        Ok(()) => {
                            for (old, new) in &relocated {
                                media.removed(old);
                                media.added(new);
                            }
                        }
                        Err(e) => LocalIoFailure::record(&mut failures, &from, "move", &e),
                    }
                }
            }
        }

        failures
    }
}

/// Effects that remove the cached content of a deleted node
///
/// `subtree` is the inclusive subtree of `removed`. Cached files listed in
/// `protected` still belong to live nodes and are left alone; if one of them
/// sits inside the folder's default location the tree is not purged as a
/// whole and cached files are deleted one by one instead.
pub(crate) fn purge_effects(
    layout: &ContentLayout,
    account: &AccountName,
    removed: &Node,
    subtree: &[Node],
    protected: &[PathBuf],
) -> Vec<LocalEffect> {
    let cached: Vec<PathBuf> = subtree
        .iter()
        .filter_map(Node::local_path)
        .filter(|path| !protected.iter().any(|kept| kept == path))
        .map(Path::to_path_buf)
        .collect();

    if !removed.is_folder() {
        return cached.into_iter().map(LocalEffect::DeleteFile).collect();
    }

    let root = layout.default_local_path(account, removed.remote_path());
    if protected.iter().any(|kept| kept.starts_with(&root)) {
        debug!(root = %root.display(), "local tree still holds live content, deleting files one by one");
        return cached.into_iter().map(LocalEffect::DeleteFile).collect();
    }
    vec![LocalEffect::PurgeTree { root, cached }]
}

async fn delete_file(
    storage: &dyn ILocalStorage,
    media: &dyn IMediaIndex,
    path: &Path,
    failures: &mut Vec<LocalIoFailure>,
) {
    match storage.delete(path).await {
        Ok(true) => media.removed(path),
        Ok(false) => debug!(path = %path.display(), "cached file already gone"),
        Err(e) => LocalIoFailure::record(failures, path, "delete", &e),
    }
}

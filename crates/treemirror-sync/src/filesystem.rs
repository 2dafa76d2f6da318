//! Local storage adapter (secondary/driven adapter)
//!
//! Implements [`ILocalStorage`] using `tokio::fs` for async file operations.
//!
//! ## Design Decisions
//!
//! - **Atomic copies**: Copies go to a temporary sibling first and are
//!   renamed into place, so a crash never leaves a truncated cached file
//!   at a location the node table points to.
//! - **Missing paths**: Deleting something that is not there reports
//!   `false` instead of failing; purges routinely target trees that were
//!   never cached.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use treemirror_core::ports::ILocalStorage;

/// Adapter that bridges the [`ILocalStorage`] port to the real filesystem.
///
/// This is a zero-sized struct because all operations derive their context
/// from absolute path arguments. The content root lives in the
/// `ContentLayout` at a higher layer.
#[derive(Debug, Clone, Default)]
pub struct LocalStorageAdapter;

impl LocalStorageAdapter {
    /// Create a new `LocalStorageAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

#[async_trait::async_trait]
impl ILocalStorage for LocalStorageAdapter {
    #[instrument(skip(self), fields(src = %src.display(), dst = %dst.display()))]
    async fn copy(&self, src: &Path, dst: &Path) -> anyhow::Result<()> {
        ensure_parent(dst).await?;

        let tmp_path = temporary_sibling(dst);
        debug!(?tmp_path, "copying to temporary file");
        let bytes = tokio::fs::copy(src, &tmp_path).await?;

        debug!(bytes, "renaming temporary file to target");
        tokio::fs::rename(&tmp_path, dst).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn delete(&self, path: &Path) -> anyhow::Result<bool> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            debug!("removing directory recursively");
            tokio::fs::remove_dir_all(path).await?;
        } else {
            debug!("removing file");
            tokio::fs::remove_file(path).await?;
        }

        debug!("delete complete");
        Ok(true)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn exists(&self, path: &Path) -> anyhow::Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    #[instrument(skip(self), fields(old = %old_root.display(), new = %new_root.display()))]
    async fn move_tree(&self, old_root: &Path, new_root: &Path) -> anyhow::Result<()> {
        ensure_parent(new_root).await?;
        tokio::fs::rename(old_root, new_root).await?;
        debug!("move complete");
        Ok(())
    }
}

// ============================================================================
// Unit tests
// ============================================================================

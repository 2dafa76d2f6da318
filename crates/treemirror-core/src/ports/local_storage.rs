//! Local byte storage port (driven/secondary port)
//!
//! The metadata engine never touches cached bytes while a batch is open.
//! After a batch commits it asks this port to copy, delete or relocate
//! content so that disk follows the committed metadata.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - Deleting a path that does not exist is not an error; it reports
//!   `false` so callers can skip the media-index notification.

use std::path::Path;

/// Port trait for cached-content operations
#[async_trait::async_trait]
pub trait ILocalStorage: Send + Sync {
    /// Copies a single file, creating the target's parent directories
    async fn copy(&self, src: &Path, dst: &Path) -> anyhow::Result<()>;

    /// Deletes a file, or a directory and everything below it
    ///
    /// Returns `false` if nothing existed at `path`.
    async fn delete(&self, path: &Path) -> anyhow::Result<bool>;

    /// Returns true if a file or directory exists at `path`
    async fn exists(&self, path: &Path) -> anyhow::Result<bool>;

    /// Moves a file or directory tree, creating the target's parent directories
    async fn move_tree(&self, old_root: &Path, new_root: &Path) -> anyhow::Result<()>;
}

//! Local content layout
//!
//! Cached bytes of every account live below a single content root:
//! `<content_root>/<account>/<remote path>`. The layout is the one place
//! that turns remote paths into default local locations.

use std::path::{Path, PathBuf};

use super::newtypes::{AccountName, RemotePath};

/// Maps remote paths to their default local location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    content_root: PathBuf,
}

impl ContentLayout {
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
        }
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    /// Directory holding every cached file of `account`
    pub fn account_root(&self, account: &AccountName) -> PathBuf {
        self.content_root.join(account.as_str())
    }

    /// Default local location for `path` in `account`
    pub fn default_local_path(&self, account: &AccountName, path: &RemotePath) -> PathBuf {
        let relative = path.relative().trim_end_matches('/');
        let root = self.account_root(account);
        if relative.is_empty() {
            root
        } else {
            root.join(relative)
        }
    }

    /// Rebase a cached location from one remote subtree to another
    ///
    /// Returns `None` when `local` is not inside the default location of
    /// `from`; such content was placed elsewhere by the user and stays put.
    pub fn rebase_local_path(
        &self,
        account: &AccountName,
        local: &Path,
        from: &RemotePath,
        to: &RemotePath,
    ) -> Option<PathBuf> {
        let old_root = self.default_local_path(account, from);
        let suffix = local.strip_prefix(&old_root).ok()?;
        let new_root = self.default_local_path(account, to);
        if suffix.as_os_str().is_empty() {
            Some(new_root)
        } else {
            Some(new_root.join(suffix))
        }
    }
}

//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for node identifiers,
//! account names and remote paths. Each newtype ensures data validity at
//! construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Node identifiers
// ============================================================================

/// Store-assigned identifier of a node
///
/// Ids are stable across renames. The value `0` is reserved as the parent
/// of the account root ([`NodeId::ROOT_PARENT`]) and never names a real node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    /// Sentinel parent of the root folder
    pub const ROOT_PARENT: NodeId = NodeId(0);

    /// Create a NodeId from a raw value
    ///
    /// # Errors
    /// Returns error for negative values
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if value < 0 {
            return Err(DomainError::InvalidId(format!(
                "Node id must not be negative: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Get the raw value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Returns true for the "no parent" sentinel
    #[must_use]
    pub const fn is_root_parent(&self) -> bool {
        self.0 == 0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .parse::<i64>()
            .map_err(|e| DomainError::InvalidId(format!("Invalid node id '{s}': {e}")))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for NodeId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// ============================================================================
// Account names
// ============================================================================

/// Name of the account owning a node
///
/// Every store query is scoped by an account. The name is also the first
/// component of the account's local content directory, so it may not be
/// empty or contain a path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    /// Create a new AccountName
    ///
    /// # Errors
    /// Returns error if the name is empty, contains '/' or is a dot entry
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::InvalidAccount(
                "Account name cannot be empty".to_string(),
            ));
        }
        if name.contains('/') || name == "." || name == ".." {
            return Err(DomainError::InvalidAccount(format!(
                "Account name cannot be used as a directory: {name}"
            )));
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.0
    }
}

// ============================================================================
// Remote paths
// ============================================================================

/// Path of a node on the remote service
///
/// Paths are absolute (start with `/`). Folder paths end with `/`; the root
/// folder is `/`. The trailing separator makes a folder path a usable prefix
/// for every path below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Path separator
    pub const SEPARATOR: char = '/';

    /// Create a new RemotePath
    ///
    /// # Errors
    /// Returns error if the path doesn't start with '/', contains an empty
    /// component or a `.`/`..` component
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path must start with '/': {path}"
            )));
        }

        if path.len() > 1 && path.contains("//") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains invalid double slashes: {path}"
            )));
        }

        if path.split('/').any(|c| c == "." || c == "..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains invalid traversal: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// The root folder path `/`
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Get the path as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for `/`
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns true when the path names a folder (trailing separator)
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Path of the containing folder, `None` for the root
    pub fn parent(&self) -> Option<RemotePath> {
        if self.is_root() {
            return None;
        }
        let trimmed = self.0.trim_end_matches('/');
        trimmed
            .rfind('/')
            .map(|idx| RemotePath(trimmed[..=idx].to_string()))
    }

    /// Last component without the trailing separator, `None` for the root
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.trim_end_matches('/').rsplit('/').next()
    }

    /// Path of a file named `name` inside this folder
    ///
    /// # Errors
    /// Returns error if this path is not a folder or `name` is not a single
    /// component
    pub fn child_file(&self, name: &str) -> Result<RemotePath, DomainError> {
        self.check_child(name)?;
        Ok(RemotePath(format!("{}{name}", self.0)))
    }

    /// Path of a folder named `name` inside this folder
    ///
    /// # Errors
    /// Same conditions as [`RemotePath::child_file`]
    pub fn child_folder(&self, name: &str) -> Result<RemotePath, DomainError> {
        self.check_child(name)?;
        Ok(RemotePath(format!("{}{name}/", self.0)))
    }

    fn check_child(&self, name: &str) -> Result<(), DomainError> {
        if !self.is_folder() {
            return Err(DomainError::InvalidRemotePath(format!(
                "Cannot add a child to a file path: {}",
                self.0
            )));
        }
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(DomainError::InvalidRemotePath(format!(
                "Invalid path component: {name}"
            )));
        }
        Ok(())
    }

    /// Returns true if `other` lies strictly below this folder
    #[must_use]
    pub fn is_strict_ancestor_of(&self, other: &RemotePath) -> bool {
        self.is_folder() && other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    /// Returns true if `other` is this path or lies below it
    #[must_use]
    pub fn covers(&self, other: &RemotePath) -> bool {
        self == other || self.is_strict_ancestor_of(other)
    }

    /// Replace the `from` prefix of this path with `to`
    ///
    /// Returns `None` when this path is not covered by `from`.
    pub fn rebase(&self, from: &RemotePath, to: &RemotePath) -> Option<RemotePath> {
        if !from.covers(self) {
            return None;
        }
        let suffix = &self.0[from.0.len()..];
        Some(RemotePath(format!("{}{suffix}", to.0)))
    }

    /// Strict ancestors from the direct parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = RemotePath> {
        std::iter::successors(self.parent(), RemotePath::parent)
    }

    /// Path without the leading separator, used to build local paths
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// Remote identifiers
// ============================================================================

/// Identifier assigned to a node by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the id is empty or blank
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

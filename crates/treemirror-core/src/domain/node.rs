//! Node domain entity
//!
//! A [`Node`] mirrors one file or folder of a remote account. The metadata
//! engine splits its fields in two groups:
//!
//! - **Remote-observed** attributes (path, etag, size, timestamps, sharing
//!   flags, ...) which every reconciliation pass overwrites.
//! - **Client-local** state (cached content path, available-offline status,
//!   conflict marker, downloading flag) which only local operations change
//!   and which must survive reconciliation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{AccountName, NodeId, RemoteId, RemotePath};
use super::offline::AvailableOffline;

/// Reserved mime type marking a folder
pub const FOLDER_MIME_TYPE: &str = "DIR";

/// A file or folder entry of the local metadata mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: Option<NodeId>,
    account: AccountName,
    parent_id: NodeId,
    remote_path: RemotePath,
    mime_type: String,
    size: u64,
    etag: Option<String>,
    tree_etag: Option<String>,
    local_path: Option<PathBuf>,
    available_offline: AvailableOffline,
    conflict_marker: Option<String>,
    created_at: Option<DateTime<Utc>>,
    modified_at: Option<DateTime<Utc>>,
    modified_at_last_sync_for_data: Option<DateTime<Utc>>,
    last_sync_for_properties: Option<DateTime<Utc>>,
    last_sync_for_data: Option<DateTime<Utc>>,
    shared_via_link: bool,
    shared_with_sharee: bool,
    permissions: Option<String>,
    remote_id: Option<RemoteId>,
    private_link: Option<String>,
    needs_thumbnail_update: bool,
    is_downloading: bool,
}

impl Node {
    // ------------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------------

    /// Creates a file node that has not been stored yet
    ///
    /// # Errors
    /// Returns error if `remote_path` is a folder path
    pub fn new_file(
        account: AccountName,
        remote_path: RemotePath,
        parent_id: NodeId,
        mime_type: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let mime_type = mime_type.into();
        if remote_path.is_folder() {
            return Err(DomainError::InvalidRemotePath(format!(
                "File path must not end with '/': {remote_path}"
            )));
        }
        if mime_type == FOLDER_MIME_TYPE {
            return Err(DomainError::ValidationFailed(format!(
                "File {remote_path} cannot use the folder mime type"
            )));
        }
        Ok(Self::blank(account, remote_path, parent_id, mime_type))
    }

    /// Creates a folder node that has not been stored yet
    ///
    /// # Errors
    /// Returns error if `remote_path` does not end with '/'
    pub fn new_folder(
        account: AccountName,
        remote_path: RemotePath,
        parent_id: NodeId,
    ) -> Result<Self, DomainError> {
        if !remote_path.is_folder() {
            return Err(DomainError::InvalidRemotePath(format!(
                "Folder path must end with '/': {remote_path}"
            )));
        }
        Ok(Self::blank(
            account,
            remote_path,
            parent_id,
            FOLDER_MIME_TYPE.to_string(),
        ))
    }

    /// Creates the root folder of an account
    #[must_use]
    pub fn root(account: AccountName) -> Self {
        Self::blank(
            account,
            RemotePath::root(),
            NodeId::ROOT_PARENT,
            FOLDER_MIME_TYPE.to_string(),
        )
    }

    fn blank(
        account: AccountName,
        remote_path: RemotePath,
        parent_id: NodeId,
        mime_type: String,
    ) -> Self {
        Self {
            id: None,
            account,
            parent_id,
            remote_path,
            mime_type,
            size: 0,
            etag: None,
            tree_etag: None,
            local_path: None,
            available_offline: AvailableOffline::NotOffline,
            conflict_marker: None,
            created_at: None,
            modified_at: None,
            modified_at_last_sync_for_data: None,
            last_sync_for_properties: None,
            last_sync_for_data: None,
            shared_via_link: false,
            shared_with_sharee: false,
            permissions: None,
            remote_id: None,
            private_link: None,
            needs_thumbnail_update: false,
            is_downloading: false,
        }
    }

    // ------------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------------

    /// Store-assigned id, `None` before the first insert
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub fn account(&self) -> &AccountName {
        &self.account
    }

    pub fn parent_id(&self) -> NodeId {
        self.parent_id
    }

    pub fn remote_path(&self) -> &RemotePath {
        &self.remote_path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns true when the node is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn tree_etag(&self) -> Option<&str> {
        self.tree_etag.as_deref()
    }

    /// Location of the cached bytes, if any
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Returns true when the file content is cached locally
    pub fn has_local_content(&self) -> bool {
        !self.is_folder() && self.local_path.is_some()
    }

    pub fn available_offline(&self) -> AvailableOffline {
        self.available_offline
    }

    pub fn conflict_marker(&self) -> Option<&str> {
        self.conflict_marker.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn modified_at_last_sync_for_data(&self) -> Option<DateTime<Utc>> {
        self.modified_at_last_sync_for_data
    }

    pub fn last_sync_for_properties(&self) -> Option<DateTime<Utc>> {
        self.last_sync_for_properties
    }

    pub fn last_sync_for_data(&self) -> Option<DateTime<Utc>> {
        self.last_sync_for_data
    }

    pub fn shared_via_link(&self) -> bool {
        self.shared_via_link
    }

    pub fn shared_with_sharee(&self) -> bool {
        self.shared_with_sharee
    }

    pub fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn private_link(&self) -> Option<&str> {
        self.private_link.as_deref()
    }

    pub fn needs_thumbnail_update(&self) -> bool {
        self.needs_thumbnail_update
    }

    pub fn is_downloading(&self) -> bool {
        self.is_downloading
    }

    // ------------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------------

    pub fn set_id(&mut self, id: NodeId) {
        self.id = Some(id);
    }

    pub fn set_parent_id(&mut self, parent_id: NodeId) {
        self.parent_id = parent_id;
    }

    /// Changes the remote path, keeping the file/folder kind
    ///
    /// # Errors
    /// Returns error if the new path's kind differs from the node's kind
    pub fn set_remote_path(&mut self, remote_path: RemotePath) -> Result<(), DomainError> {
        if remote_path.is_folder() != self.is_folder() {
            return Err(DomainError::InvalidRemotePath(format!(
                "Path {remote_path} does not match the kind of {}",
                self.remote_path
            )));
        }
        self.remote_path = remote_path;
        Ok(())
    }

    pub fn set_local_path(&mut self, local_path: Option<PathBuf>) {
        self.local_path = local_path;
    }

    pub fn set_available_offline(&mut self, status: AvailableOffline) {
        self.available_offline = status;
    }

    pub fn set_conflict_marker(&mut self, marker: Option<String>) {
        self.conflict_marker = marker;
    }

    pub fn set_etag(&mut self, etag: Option<String>) {
        self.etag = etag;
    }

    pub fn set_tree_etag(&mut self, tree_etag: Option<String>) {
        self.tree_etag = tree_etag;
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_created_at(&mut self, at: Option<DateTime<Utc>>) {
        self.created_at = at;
    }

    pub fn set_modified_at(&mut self, at: Option<DateTime<Utc>>) {
        self.modified_at = at;
    }

    pub fn set_modified_at_last_sync_for_data(&mut self, at: Option<DateTime<Utc>>) {
        self.modified_at_last_sync_for_data = at;
    }

    pub fn set_last_sync_for_properties(&mut self, at: Option<DateTime<Utc>>) {
        self.last_sync_for_properties = at;
    }

    pub fn set_last_sync_for_data(&mut self, at: Option<DateTime<Utc>>) {
        self.last_sync_for_data = at;
    }

    pub fn set_sharing(&mut self, via_link: bool, with_sharee: bool) {
        self.shared_via_link = via_link;
        self.shared_with_sharee = with_sharee;
    }

    pub fn set_permissions(&mut self, permissions: Option<String>) {
        self.permissions = permissions;
    }

    pub fn set_remote_id(&mut self, remote_id: Option<RemoteId>) {
        self.remote_id = remote_id;
    }

    pub fn set_private_link(&mut self, link: Option<String>) {
        self.private_link = link;
    }

    pub fn set_needs_thumbnail_update(&mut self, needs_update: bool) {
        self.needs_thumbnail_update = needs_update;
    }

    pub fn set_downloading(&mut self, downloading: bool) {
        self.is_downloading = downloading;
    }

    // ------------------------------------------------------------------------
    // Chained setters for building listings
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    #[must_use]
    pub fn with_tree_etag(mut self, tree_etag: impl Into<String>) -> Self {
        self.tree_etag = Some(tree_etag.into());
        self
    }

    #[must_use]
    pub fn with_local_path(mut self, local_path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }

    #[must_use]
    pub fn with_available_offline(mut self, status: AvailableOffline) -> Self {
        self.available_offline = status;
        self
    }

    #[must_use]
    pub fn with_remote_id(mut self, remote_id: RemoteId) -> Self {
        self.remote_id = Some(remote_id);
        self
    }

    #[must_use]
    pub fn with_modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.modified_at = Some(at);
        self
    }
}

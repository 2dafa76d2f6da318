//! treemirror Sync - Tree reconciliation and metadata propagation
//!
//! Provides:
//! - Folder reconciliation against a fresh remote listing
//! - Available-offline inheritance and cascades
//! - Conflict marker aggregation on ancestor folders
//! - Move/rename rewriting of whole subtrees
//!
//! Every operation builds one batch of [`NodeOp`]s, submits it through
//! [`INodeStore::apply`], and only then touches cached bytes on disk.
//!
//! ## Modules
//!
//! - [`engine`] - Facade wiring the ports into each component
//! - [`reconciler`] - Folder reconciliation
//! - [`offline`] - Available-offline propagation
//! - [`conflict`] - Conflict marker propagation
//! - [`mover`] - Move/rename rewriting
//! - [`remover`], [`copier`], [`writer`], [`queries`] - Single-node operations
//! - [`effects`] - Local side effects run after commit
//! - [`tree`] - Ancestor and descendant walks
//! - [`filesystem`] - `tokio::fs` adapter for cached content
//! - [`media_index`] - Media index adapter that logs notifications
//!
//! [`NodeOp`]: treemirror_core::ports::NodeOp
//! [`INodeStore::apply`]: treemirror_core::ports::INodeStore::apply

pub mod conflict;
pub mod copier;
pub mod effects;
pub mod engine;
pub mod filesystem;
pub mod media_index;
pub mod mover;
pub mod offline;
pub mod queries;
pub mod reconciler;
pub mod remover;
pub mod tree;
pub mod writer;

pub use effects::LocalIoFailure;
pub use engine::MirrorEngine;

use thiserror::Error;
use treemirror_core::domain::DomainError;

/// Errors returned by engine operations
///
/// A returned error always means the node table was left untouched.
/// Failures of local byte operations after a commit are not errors; they are
/// reported through the `local_failures` field of each outcome.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A store read or batch failed
    #[error("Persistence failure: {0:#}")]
    Persistence(anyhow::Error),

    /// The request was rejected before any mutation
    #[error("Usage error: {0}")]
    Usage(String),

    /// A domain value could not be constructed
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl From<anyhow::Error> for MirrorError {
    fn from(e: anyhow::Error) -> Self {
        MirrorError::Persistence(e)
    }
}

impl MirrorError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        MirrorError::Usage(message.into())
    }
}

//! Domain entities and business rules
//!
//! This module contains the core domain types for treemirror:
//! - Newtypes for node identifiers, account names and remote paths
//! - The [`Node`] entity mirroring one remote file or folder
//! - The available-offline tri-state
//! - The local content layout
//! - Domain-specific error types

pub mod errors;
pub mod layout;
pub mod newtypes;
pub mod node;
pub mod offline;

// Re-export commonly used types
pub use errors::DomainError;
pub use layout::ContentLayout;
pub use newtypes::*;
pub use node::{Node, FOLDER_MIME_TYPE};
pub use offline::AvailableOffline;

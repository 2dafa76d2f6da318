//! Domain error types
//!
//! This module defines error types raised while constructing or
//! manipulating domain values: malformed paths, account names and ids.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid account name
    #[error("Invalid account name: {0}")]
    InvalidAccount(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Stored available-offline value outside the known range
    #[error("Invalid available-offline status: {0}")]
    InvalidOfflineStatus(i64),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

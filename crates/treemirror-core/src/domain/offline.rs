//! Available-offline tri-state

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Whether a node's content must be kept cached locally
///
/// `Offline` is the user's explicit pin. `OfflineByParent` is derived: it
/// holds exactly when some strict ancestor is pinned, and is never set by a
/// direct request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailableOffline {
    /// Neither pinned nor inside a pinned folder
    #[default]
    NotOffline,
    /// Pinned by the user
    Offline,
    /// Inherited from a pinned ancestor
    OfflineByParent,
}

impl AvailableOffline {
    /// Stored integer value
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            AvailableOffline::NotOffline => 0,
            AvailableOffline::Offline => 1,
            AvailableOffline::OfflineByParent => 2,
        }
    }

    /// Parse the stored integer value
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidOfflineStatus`] for unknown values
    pub fn from_i64(value: i64) -> Result<Self, DomainError> {
        match value {
            0 => Ok(AvailableOffline::NotOffline),
            1 => Ok(AvailableOffline::Offline),
            2 => Ok(AvailableOffline::OfflineByParent),
            other => Err(DomainError::InvalidOfflineStatus(other)),
        }
    }

    /// Returns true for both the pinned and the inherited state
    #[must_use]
    pub const fn is_available_offline(self) -> bool {
        !matches!(self, AvailableOffline::NotOffline)
    }

    /// Returns true for the derived-only state
    #[must_use]
    pub const fn is_derived(self) -> bool {
        matches!(self, AvailableOffline::OfflineByParent)
    }
}

impl fmt::Display for AvailableOffline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailableOffline::NotOffline => write!(f, "not_offline"),
            AvailableOffline::Offline => write!(f, "offline"),
            AvailableOffline::OfflineByParent => write!(f, "offline_by_parent"),
        }
    }
}

impl TryFrom<i64> for AvailableOffline {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_i64(value)
    }
}

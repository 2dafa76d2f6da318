//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the metadata engine
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`INodeStore`] - Transactional storage of the mirrored node tree
//! - [`ILocalStorage`] - Cached-content byte operations
//! - [`IMediaIndex`] - Media-index refresh notifications

pub mod local_storage;
pub mod media_index;
pub mod node_store;

pub use local_storage::ILocalStorage;
pub use media_index::IMediaIndex;
pub use node_store::{INodeStore, NodeChanges, NodeOp, NodeTarget, OpResult};

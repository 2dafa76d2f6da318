//! treemirror Core - Domain model and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - [`Node`](domain::Node), the tri-state
//!   [`AvailableOffline`](domain::AvailableOffline) flag and the validated
//!   newtypes used to address nodes
//! - **Port definitions** - Traits for adapters: `INodeStore`, `ILocalStorage`,
//!   `IMediaIndex`
//! - **Configuration** - YAML-backed [`Config`](config::Config)
//!
//! # Architecture
//!
//! The domain module contains pure data and path arithmetic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`treemirror-cache` for the node store, `treemirror-sync` for local storage).
//! The reconciliation and propagation algorithms live in `treemirror-sync`
//! and only talk to the ports declared here.

pub mod config;
pub mod domain;
pub mod ports;

//! Integration tests for treemirror-sync
//!
//! Runs every engine component against an in-memory SQLite node store and
//! a temporary content root, checking both the committed rows and the
//! cached bytes on disk.

mod common;

mod test_move;
mod test_reconcile;
mod test_single_node;

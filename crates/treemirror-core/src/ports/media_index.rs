//! Media-index notification port
//!
//! Informs an OS-level media index that cached files appeared or
//! disappeared. Notifications are fire-and-forget: implementations log
//! their own failures and never report them back to the engine.

use std::path::Path;

/// Port trait for media-index refresh notifications
pub trait IMediaIndex: Send + Sync {
    /// A cached file now exists at `path`
    fn added(&self, path: &Path);

    /// The cached file at `path` is gone
    fn removed(&self, path: &Path);
}

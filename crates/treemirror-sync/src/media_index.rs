//! Media index adapter that records notifications in the log
//!
//! Desktop integrations replace this with a real indexer client; the
//! engine only needs somewhere to send its fire-and-forget notifications.

use std::path::Path;

use tracing::info;
use treemirror_core::ports::IMediaIndex;

/// [`IMediaIndex`] implementation that emits one `info!` event per change
#[derive(Debug, Clone, Default)]
pub struct TracingMediaIndex;

impl TracingMediaIndex {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IMediaIndex for TracingMediaIndex {
    fn added(&self, path: &Path) {
        info!(path = %path.display(), "media added");
    }

    fn removed(&self, path: &Path) {
        info!(path = %path.display(), "media removed");
    }
}

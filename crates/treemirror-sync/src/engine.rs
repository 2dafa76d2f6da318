//! Metadata engine facade
//!
//! [`MirrorEngine`] owns the ports and hands out the components that
//! operate on them. Components are cheap to build: they only clone
//! `Arc`s and the content layout.
//!
//! Operations on one account must not run concurrently; serializing them
//! is the caller's job. Different accounts never share rows.

use std::sync::Arc;

use treemirror_core::domain::ContentLayout;
use treemirror_core::ports::{ILocalStorage, IMediaIndex, INodeStore};

use crate::conflict::ConflictPropagator;
use crate::copier::NodeCopier;
use crate::mover::NodeMover;
use crate::offline::OfflinePropagator;
use crate::queries::MirrorQueries;
use crate::reconciler::TreeReconciler;
use crate::remover::NodeRemover;
use crate::writer::NodeWriter;

/// Entry point wiring the store, local storage and media index together
#[derive(Clone)]
pub struct MirrorEngine {
    store: Arc<dyn INodeStore>,
    storage: Arc<dyn ILocalStorage>,
    media: Arc<dyn IMediaIndex>,
    layout: ContentLayout,
}

impl MirrorEngine {
    pub fn new(
        store: Arc<dyn INodeStore>,
        storage: Arc<dyn ILocalStorage>,
        media: Arc<dyn IMediaIndex>,
        layout: ContentLayout,
    ) -> Self {
        Self {
            store,
            storage,
            media,
            layout,
        }
    }

    pub fn store(&self) -> &Arc<dyn INodeStore> {
        &self.store
    }

    pub fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    pub fn reconciler(&self) -> TreeReconciler {
        TreeReconciler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
            Arc::clone(&self.media),
            self.layout.clone(),
        )
    }

    pub fn offline(&self) -> OfflinePropagator {
        OfflinePropagator::new(Arc::clone(&self.store))
    }

    pub fn conflicts(&self) -> ConflictPropagator {
        ConflictPropagator::new(Arc::clone(&self.store))
    }

    pub fn mover(&self) -> NodeMover {
        NodeMover::new(
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
            Arc::clone(&self.media),
            self.layout.clone(),
        )
    }

    pub fn remover(&self) -> NodeRemover {
        NodeRemover::new(
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
            Arc::clone(&self.media),
            self.layout.clone(),
        )
    }

    pub fn copier(&self) -> NodeCopier {
        NodeCopier::new(
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
            Arc::clone(&self.media),
            self.layout.clone(),
        )
    }

    pub fn writer(&self) -> NodeWriter {
        NodeWriter::new(Arc::clone(&self.store))
    }

    pub fn queries(&self) -> MirrorQueries {
        MirrorQueries::new(
            Arc::clone(&self.store),
            Arc::clone(&self.storage),
            self.layout.clone(),
        )
    }
}

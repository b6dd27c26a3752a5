//! Provider wrapper that counts calls and can inject failures

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use trellis_core::storage::{Catalog, GraphProvider, StorageError, StorageResult};
use trellis_core::types::collection::{CollectionInfo, GraphDefinition};
use trellis_core::types::document::{Document, DocumentId};

/// Provider that delegates to `inner` and records every call
///
/// Catalog lookups are not counted: they are setup, not graph I/O.
/// Set `edges_fail_at` to a call number to make that (and every later)
/// edge lookup fail with an I/O error. 0 disables failure (default).
pub struct CountingProvider<P> {
    inner: P,
    vertex_calls: AtomicU64,
    edge_calls: AtomicU64,
    /// Fail edge lookups from this call number on (0 = never)
    pub edges_fail_at: Arc<AtomicU64>,
}

impl<P> CountingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            vertex_calls: AtomicU64::new(0),
            edge_calls: AtomicU64::new(0),
            edges_fail_at: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Vertex lookups so far
    pub fn vertex_calls(&self) -> u64 {
        self.vertex_calls.load(Ordering::SeqCst)
    }

    /// Edge enumerations so far (both directions)
    pub fn edge_calls(&self) -> u64 {
        self.edge_calls.load(Ordering::SeqCst)
    }

    /// Total graph reads
    pub fn total_calls(&self) -> u64 {
        self.vertex_calls() + self.edge_calls()
    }

    pub fn reset(&self) {
        self.vertex_calls.store(0, Ordering::SeqCst);
        self.edge_calls.store(0, Ordering::SeqCst);
        self.edges_fail_at.store(0, Ordering::SeqCst);
    }

    fn count_edge_call(&self) -> StorageResult<()> {
        let count = self.edge_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let target = self.edges_fail_at.load(Ordering::SeqCst);
        if target != 0 && count >= target {
            return Err(StorageError::Io {
                message: "Injected edge lookup failure".into(),
            });
        }
        Ok(())
    }
}

impl<P: GraphProvider> GraphProvider for CountingProvider<P> {
    fn vertex(&self, id: &DocumentId) -> StorageResult<Option<Arc<Document>>> {
        self.vertex_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.vertex(id)
    }

    fn out_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
        self.count_edge_call()?;
        self.inner.out_edges(collection, vertex)
    }

    fn in_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
        self.count_edge_call()?;
        self.inner.in_edges(collection, vertex)
    }
}

impl<P: Catalog> Catalog for CountingProvider<P> {
    fn collection(&self, name: &str) -> Option<CollectionInfo> {
        self.inner.collection(name)
    }

    fn graph(&self, name: &str) -> Option<GraphDefinition> {
        self.inner.graph(name)
    }
}

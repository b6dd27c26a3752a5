//! Data provider abstraction layer (SBIO)
//!
//! This module defines the traits through which the traversal engine reads
//! graph data. The engine uses these traits without knowing the underlying
//! storage medium.
//!
//! # Contracts
//!
//! - [`GraphProvider`]: vertex lookup by id, edge enumeration per edge
//!   collection and direction. Request/response per candidate.
//! - [`Catalog`]: collection kinds and named-graph definitions, consulted
//!   once at traversal setup.
//!
//! Both traits are `Send + Sync`: independent traversals (one per start
//! vertex) share a provider and read it concurrently.
//!
//! # Implementations
//!
//! - `MemGraph` (trellis-storage): in-memory documents and adjacency lists

use crate::types::collection::{CollectionInfo, GraphDefinition};
use crate::types::document::{Document, DocumentId};
use std::sync::Arc;
use thiserror::Error;

/// Data provider errors
///
/// All errors are explicit - provider operations never silently fail.
/// A missing vertex is NOT an error (`Ok(None)`).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Unknown collection: {name}")]
    UnknownCollection { name: String },

    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },
}

/// Convenience type alias for provider results
pub type StorageResult<T> = Result<T, StorageError>;

/// Read access to vertices and edges
///
/// Edge enumeration order is the provider's stable order for a given data
/// set; the engine preserves it between siblings.
pub trait GraphProvider: Send + Sync {
    /// Fetch a vertex document, `None` if it does not exist
    fn vertex(&self, id: &DocumentId) -> StorageResult<Option<Arc<Document>>>;

    /// Edges of `collection` whose `_from` is `vertex`
    fn out_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>>;

    /// Edges of `collection` whose `_to` is `vertex`
    fn in_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>>;
}

/// Schema lookups used during traversal setup
pub trait Catalog: Send + Sync {
    /// Look up a collection or view by name
    fn collection(&self, name: &str) -> Option<CollectionInfo>;

    /// Look up a named graph
    fn graph(&self, name: &str) -> Option<GraphDefinition>;
}

impl<T: GraphProvider + ?Sized> GraphProvider for Arc<T> {
    fn vertex(&self, id: &DocumentId) -> StorageResult<Option<Arc<Document>>> {
        (**self).vertex(id)
    }

    fn out_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
        (**self).out_edges(collection, vertex)
    }

    fn in_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
        (**self).in_edges(collection, vertex)
    }
}

impl<T: Catalog + ?Sized> Catalog for Arc<T> {
    fn collection(&self, name: &str) -> Option<CollectionInfo> {
        (**self).collection(name)
    }

    fn graph(&self, name: &str) -> Option<GraphDefinition> {
        (**self).graph(name)
    }
}

//! Trellis Core - graph traversal engine with no I/O dependencies
//!
//! This crate implements:
//! - Documents, ids and dynamic values
//! - Lazy bounded-depth DFS/BFS traversal with collection restriction
//! - The AQL traversal subset: parser, planner, filter-condition
//!   optimizer and executor
//!
//! # SBIO Architecture
//!
//! This crate follows strict Separation of Business Logic and I/O (SBIO).
//! Graph data is read through the injected [`GraphProvider`] and
//! [`Catalog`] traits; the crate never touches storage itself.

pub mod aql;
pub mod config;
pub mod error;
pub mod graph;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use aql::{BindVars, DefaultQueryHandler, FunctionRegistry, QueryHandler, QueryResult};
pub use config::{EngineConfig, QueryOptions};
pub use error::{ConfigError, TraversalError, TraversalResult};
pub use graph::{CollectionFilter, Direction, TraversalOptions, TraversalPath, Traverser, Uniqueness};
pub use storage::{Catalog, GraphProvider, StorageError, StorageResult};
pub use types::collection::{CollectionInfo, CollectionKind, EdgeDefinition, GraphDefinition};
pub use types::document::{Document, DocumentId};
pub use types::value::Value;

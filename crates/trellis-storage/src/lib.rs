//! Trellis Storage Implementations
//!
//! This crate provides concrete implementations of the `GraphProvider` and
//! `Catalog` traits.
//!
//! # Available Backends
//!
//! - `MemGraph`: in-memory documents and adjacency lists (for testing and
//!   embedded use)

pub mod mem;

// Re-export the traits from trellis-core
pub use trellis_core::{Catalog, GraphProvider, StorageError, StorageResult};

// Re-export implementations
pub use mem::MemGraph;

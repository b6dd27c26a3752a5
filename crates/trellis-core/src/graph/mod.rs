//! Graph traversal
//!
//! Building blocks of a single traversal, leaf-first:
//!
//! - [`path`]: the vertex/edge sequence exposed to conditions
//! - [`options`]: depth bounds, order, uniqueness, restrictions
//! - [`filter`]: validated collection restriction
//! - [`traversal`]: the lazy DFS/BFS engine

pub mod filter;
pub mod options;
pub mod path;
pub mod traversal;

pub use filter::{CollectionFilter, EdgeCollectionSpec, EdgeScope, TraversalSource};
pub use options::{Direction, TraversalOptions, Uniqueness};
pub use path::TraversalPath;
pub use traversal::{NoConditions, PathConditions, TraversalStats, TraversalStep, Traverser};

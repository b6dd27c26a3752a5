//! Test infrastructure for Trellis traversal tests
//!
//! Provides fixture graphs, an instrumented provider that counts graph
//! reads and injects failures, and query helpers.

pub mod counting_provider;
pub mod fixtures;
pub mod helpers;

pub use counting_provider::CountingProvider;
pub use fixtures::{
    broken_graph, complex_filtering_graph, ladder_graph, multi_direction_graph, prune_graph,
    quantifier_graph, QUANTIFIER_GRAPH,
};
pub use helpers::{bind_vars, init_tracing, query_rows, run_query, sorted_strings, string_rows};

//! Helper functions for query tests

use trellis_core::aql::{BindVars, DefaultQueryHandler, QueryHandler, QueryResult};
use trellis_core::config::{EngineConfig, QueryOptions};
use trellis_core::error::TraversalResult;
use trellis_core::storage::{Catalog, GraphProvider};
use trellis_core::types::value::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a test subscriber honoring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .try_init();
}

/// Bind variables from a JSON object (`{"start": "v/A", "@edges": "e"}`)
pub fn bind_vars(json: serde_json::Value) -> BindVars {
    match json {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(name, value)| (name, Value::from(value)))
            .collect(),
        other => panic!("bind variables must be a JSON object, got {}", other),
    }
}

/// Run a query with the optimizer on or off
pub fn run_query<G: GraphProvider + Catalog>(
    graph: &G,
    query: &str,
    bind_vars: &BindVars,
    optimize: bool,
) -> TraversalResult<QueryResult> {
    let config = EngineConfig {
        optimize_traversals: optimize,
        ..EngineConfig::default()
    };
    DefaultQueryHandler::with_config(config).query(query, bind_vars, &QueryOptions::default(), graph, graph)
}

/// Run a query with default settings and return its rows
pub fn query_rows<G: GraphProvider + Catalog>(graph: &G, query: &str) -> Vec<Value> {
    run_query(graph, query, &BindVars::default(), true)
        .unwrap_or_else(|e| panic!("query failed: {}\n{}", e, query))
        .rows
}

/// String rows, for comparing against expected keys or ids
pub fn string_rows(rows: &[Value]) -> Vec<String> {
    rows.iter().map(Value::to_display_string).collect()
}

/// String rows in sorted order
pub fn sorted_strings(rows: &[Value]) -> Vec<String> {
    let mut strings = string_rows(rows);
    strings.sort();
    strings
}

//! Query executor - executes query plans against a graph provider
//!
//! The executor pulls rows lazily through the logical operation tree.
//! Setup failures (unknown collections, wrong collection kinds) are
//! raised before the first row is produced.

pub(crate) mod context;
pub(crate) mod evaluation;
mod hashing;
mod operations;

pub use context::{ExecutionContext, OutputToggles, Row, TraversalVariables, VariableLayout};
pub use evaluation::{compare, evaluate_binary_op, evaluate_unary_op, quantified_compare, Evaluator};

use crate::aql::planner::{LogicalOp, QueryPlan};
use crate::error::{TraversalError, TraversalResult};
use crate::graph::filter::CollectionFilter;
use crate::graph::traversal::TraversalStats;
use crate::types::value::Value;
use operations::Execution;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

/// Sort key with inline storage for 1-3 keys
pub(crate) type SortKey = SmallVec<[Value; 3]>;

/// Result of query execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names (the RETURN expression)
    pub columns: Vec<String>,
    /// One value per produced row
    pub rows: Vec<Value>,
    /// Execution statistics
    pub stats: QueryStats,
}

impl QueryResult {
    /// Create an empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            stats: QueryStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Query execution statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStats {
    /// Rows returned
    pub rows: u64,
    /// Counters merged over all traversals of the query
    pub traversal: TraversalStats,
    pub execution_time_ms: u64,
}

/// Query executor
pub struct QueryExecutor;

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryExecutor {
    /// Create a new executor
    pub fn new() -> Self {
        Self
    }

    /// Execute a query plan
    pub fn execute(&self, plan: &QueryPlan, ctx: &ExecutionContext) -> TraversalResult<QueryResult> {
        let start = std::time::Instant::now();

        for name in &plan.with_collections {
            if ctx.catalog.collection(name).is_none() {
                return Err(TraversalError::data_source_not_found(name));
            }
        }

        let filter = match plan.root.traversal() {
            Some(node) => Some(CollectionFilter::new(
                ctx.catalog,
                &node.source,
                node.direction,
                &node.options,
            )?),
            None => None,
        };

        let LogicalOp::Return {
            input,
            expr,
            distinct,
        } = &plan.root
        else {
            return Err(TraversalError::internal("query plan root must be a RETURN"));
        };

        let run = Execution {
            ctx,
            layout: &plan.layout,
            functions: &plan.functions,
            filter: filter.as_ref(),
            parallel: ctx.config.parallel_start_vertices && !plan.root.has_limit(),
        };

        let mut rows = Vec::new();
        // Hash buckets of row indices for DISTINCT
        let mut seen: FxHashMap<u64, SmallVec<[usize; 1]>> = FxHashMap::default();
        {
            let stream = self.stream(input, run);
            for row in stream {
                let row = row?;
                let value = Evaluator::new(run.functions, run.layout, &row)
                    .evaluate(expr)?
                    .into_owned();
                if *distinct {
                    let bucket = seen.entry(self.hash_value(&value)).or_default();
                    if bucket.iter().any(|&i| rows[i] == value) {
                        continue;
                    }
                    bucket.push(rows.len());
                }
                rows.push(value);
            }
            // Dropping the stream records the counters of open traversals
        }

        let stats = QueryStats {
            rows: rows.len() as u64,
            traversal: ctx.traversal_stats(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            rows = stats.rows,
            vertices_fetched = stats.traversal.vertices_fetched,
            edges_scanned = stats.traversal.edges_scanned,
            filtered = stats.traversal.filtered,
            elapsed_ms = stats.execution_time_ms,
            "query executed"
        );

        Ok(QueryResult {
            columns: vec![expr.to_string()],
            rows,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aql::functions::FunctionRegistry;
    use crate::aql::parser::AqlParser;
    use crate::aql::planner::{BindVars, QueryPlanner};
    use crate::config::{EngineConfig, QueryOptions};
    use crate::storage::{Catalog, GraphProvider, StorageResult};
    use crate::types::collection::{CollectionInfo, CollectionKind, GraphDefinition};
    use crate::types::document::{Document, DocumentId};
    use std::sync::Arc;

    /// Chain v/A -> v/B -> v/C -> v/D in edge collection `e`
    struct Chain {
        vertices: Vec<Arc<Document>>,
        edges: Vec<Arc<Document>>,
    }

    impl Chain {
        fn new() -> Self {
            let keys = ["A", "B", "C", "D"];
            let vertices = keys
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    Arc::new(Document::vertex(
                        DocumentId::new("v", key),
                        Value::object([("n", Value::Int(i as i64))]),
                    ))
                })
                .collect();
            let edges = keys
                .windows(2)
                .enumerate()
                .map(|(i, pair)| {
                    Arc::new(Document::edge(
                        DocumentId::new("e", &i.to_string()),
                        DocumentId::new("v", pair[0]),
                        DocumentId::new("v", pair[1]),
                        Value::object([("w", Value::Int(i as i64 % 2))]),
                    ))
                })
                .collect();
            Self { vertices, edges }
        }
    }

    impl GraphProvider for Chain {
        fn vertex(&self, id: &DocumentId) -> StorageResult<Option<Arc<Document>>> {
            Ok(self.vertices.iter().find(|v| v.id() == id).cloned())
        }

        fn out_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
            Ok(self
                .edges
                .iter()
                .filter(|e| collection == "e" && e.ends().is_some_and(|ends| &ends.from == vertex))
                .cloned()
                .collect())
        }

        fn in_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
            Ok(self
                .edges
                .iter()
                .filter(|e| collection == "e" && e.ends().is_some_and(|ends| &ends.to == vertex))
                .cloned()
                .collect())
        }
    }

    impl Catalog for Chain {
        fn collection(&self, name: &str) -> Option<CollectionInfo> {
            match name {
                "v" => Some(CollectionInfo::new("v", CollectionKind::Document)),
                "e" => Some(CollectionInfo::new("e", CollectionKind::Edge)),
                _ => None,
            }
        }

        fn graph(&self, _name: &str) -> Option<GraphDefinition> {
            None
        }
    }

    fn run(query: &str, config: &EngineConfig) -> TraversalResult<QueryResult> {
        let chain = Chain::new();
        let registry = FunctionRegistry::init();
        let parsed = AqlParser::new().parse(query)?;
        let plan = QueryPlanner::new(config, &registry).plan(&parsed, &BindVars::default(), &QueryOptions::default())?;
        let ctx = ExecutionContext::new(&chain, &chain, config);
        QueryExecutor::new().execute(&plan, &ctx)
    }

    fn keys(result: &QueryResult) -> Vec<String> {
        result
            .rows
            .iter()
            .map(|row| row.as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_execute_traversal() {
        let result = run(
            "FOR v IN 1..3 OUTBOUND 'v/A' e RETURN v._key",
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(keys(&result), vec!["B", "C", "D"]);
        assert_eq!(result.stats.rows, 3);
        assert_eq!(result.columns, vec!["v._key".to_string()]);
    }

    #[test]
    fn test_execute_limit_and_sort() {
        let result = run(
            "FOR v IN 1..3 OUTBOUND 'v/A' e SORT v.n DESC LIMIT 2 RETURN v._key",
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(keys(&result), vec!["D", "C"]);
    }

    #[test]
    fn test_execute_distinct() {
        let result = run(
            "FOR v, e IN 1..3 OUTBOUND 'v/A' e RETURN DISTINCT e.w",
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(result.rows, vec![Value::Int(0), Value::Int(1)]);
    }

    #[test]
    fn test_execute_parallel_start_vertices() {
        let config = EngineConfig {
            parallel_start_vertices: true,
            ..EngineConfig::default()
        };
        let result = run(
            "FOR s IN ['v/A', 'v/B', 'v/C'] FOR v IN 1..1 OUTBOUND s e RETURN v._key",
            &config,
        )
        .unwrap();
        assert_eq!(keys(&result), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_execute_invalid_start_yields_nothing() {
        let result = run("FOR v IN 1..3 OUTBOUND 42 e RETURN v", &EngineConfig::default()).unwrap();
        assert!(result.is_empty());
        let result = run("FOR v IN 1..3 OUTBOUND 'v/Z' e RETURN v", &EngineConfig::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_execute_setup_errors() {
        let err = run("FOR v IN 1..3 OUTBOUND 'v/A' missing RETURN v", &EngineConfig::default()).unwrap_err();
        assert_eq!(err.code(), 1203);
        let err = run("FOR v IN 1..3 OUTBOUND 'v/A' v RETURN v", &EngineConfig::default()).unwrap_err();
        assert_eq!(err.code(), 1218);
        let err = run("WITH nope FOR v IN 1..3 OUTBOUND 'v/A' e RETURN v", &EngineConfig::default()).unwrap_err();
        assert_eq!(err.code(), 1203);
    }

    #[test]
    fn test_execute_records_traversal_stats() {
        let result = run(
            "FOR v IN 1..3 OUTBOUND 'v/A' e LIMIT 1 RETURN v",
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.stats.traversal.vertices_fetched >= 1);
    }
}

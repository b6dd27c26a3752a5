//! Property tests: the filter optimizer never changes query results or
//! errors, and LIMIT returns a prefix of the unlimited result.

use proptest::prelude::*;
use serde_json::json;

use trellis_core::aql::BindVars;
use trellis_core::types::collection::CollectionKind;
use trellis_core::types::value::Value;
use trellis_storage::MemGraph;
use trellis_test_harness::{run_query, sorted_strings, string_rows};

#[derive(Debug, Clone)]
struct GraphShape {
    /// `(x, flag)` per vertex `v/n{i}`
    vertices: Vec<(i64, bool)>,
    /// `(from, to, w, ok)` with vertex indexes
    edges: Vec<(usize, usize, i64, bool)>,
}

impl GraphShape {
    fn build(&self) -> MemGraph {
        let graph = MemGraph::new();
        graph.create_collection("v", CollectionKind::Document).unwrap();
        graph.create_collection("e", CollectionKind::Edge).unwrap();
        for (i, (x, flag)) in self.vertices.iter().enumerate() {
            graph
                .insert_vertex("v", &format!("n{}", i), Value::from(json!({ "x": x, "flag": flag })))
                .unwrap();
        }
        for (from, to, w, ok) in &self.edges {
            graph
                .insert_edge(
                    "e",
                    &format!("v/n{}", from),
                    &format!("v/n{}", to),
                    Value::from(json!({ "w": w, "ok": ok })),
                )
                .unwrap();
        }
        graph
    }
}

fn graph_shape() -> impl Strategy<Value = GraphShape> {
    (2usize..7).prop_flat_map(|n| {
        (
            prop::collection::vec((0i64..4, any::<bool>()), n),
            prop::collection::vec((0..n, 0..n, 0i64..3, any::<bool>()), 0..15),
        )
            .prop_map(|(vertices, edges)| GraphShape { vertices, edges })
    })
}

fn filter_clause() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u64..5, 0i64..4).prop_map(|(k, c)| format!("p.vertices[{}].x == {}", k, c)),
        (0u64..5, 0i64..4).prop_map(|(k, c)| format!("p.edges[{}].w < {}", k, c)),
        any::<bool>().prop_map(|b| format!("p.vertices[*].flag ALL == {}", b)),
        any::<bool>().prop_map(|b| format!("p.edges[*].ok NONE == {}", b)),
        (0i64..3).prop_map(|c| format!("p.edges[*].w ALL <= {}", c)),
        (0i64..4).prop_map(|c| format!("v.x >= {}", c)),
        (0u64..4, 0i64..4, any::<bool>())
            .prop_map(|(k, c, b)| format!("(p.vertices[{}].x == {} OR v.flag == {})", k, c, b)),
        // x may be 0, so these can fail with a division by zero
        (0u64..4, 0i64..4).prop_map(|(k, c)| format!("1 / p.vertices[{}].x == {}", k, c)),
        (0i64..4).prop_map(|c| format!("1 / v.x >= {}", c)),
    ]
}

fn direction() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("OUTBOUND"), Just("INBOUND"), Just("ANY")]
}

#[derive(Debug, Clone)]
struct TraversalShape {
    min: u64,
    max: u64,
    direction: &'static str,
    bfs: bool,
    unique_vertices: &'static str,
}

impl TraversalShape {
    fn prefix(&self) -> String {
        format!(
            "FOR v, e, p IN {}..{} {} 'v/n0' e OPTIONS {{bfs: {}, uniqueVertices: '{}'}}",
            self.min, self.max, self.direction, self.bfs, self.unique_vertices
        )
    }
}

fn traversal_shape() -> impl Strategy<Value = TraversalShape> {
    (
        0u64..3,
        0u64..3,
        direction(),
        any::<bool>(),
        prop_oneof![Just("path"), Just("none")],
    )
        .prop_map(|(min, extra, direction, bfs, unique_vertices)| TraversalShape {
            min,
            max: min + extra,
            direction,
            bfs,
            unique_vertices,
        })
}

fn rows(graph: &MemGraph, query: &str, optimize: bool) -> Vec<Value> {
    run_query(graph, query, &BindVars::default(), optimize)
        .unwrap_or_else(|e| panic!("query failed: {}\n{}", e, query))
        .rows
}

/// Sorted rows, or the error code the query failed with
fn outcome(graph: &MemGraph, query: &str, optimize: bool) -> Result<Vec<String>, u32> {
    run_query(graph, query, &BindVars::default(), optimize)
        .map(|result| sorted_strings(&result.rows))
        .map_err(|e| e.code())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_optimizer_preserves_results(
        shape in graph_shape(),
        traversal in traversal_shape(),
        clauses in prop::collection::vec(filter_clause(), 1..4),
    ) {
        let graph = shape.build();
        let query = format!(
            "{} FILTER {} RETURN p.vertices[*]._key",
            traversal.prefix(),
            clauses.join(" AND ")
        );

        let optimized = outcome(&graph, &query, true);
        let plain = outcome(&graph, &query, false);
        prop_assert_eq!(optimized, plain, "{}", query);
    }

    #[test]
    fn prop_separate_filters_match_conjunction(
        shape in graph_shape(),
        traversal in traversal_shape(),
        clauses in prop::collection::vec(filter_clause(), 2..4),
    ) {
        let graph = shape.build();
        let joined = format!(
            "{} FILTER {} RETURN p.vertices[*]._key",
            traversal.prefix(),
            clauses.join(" AND ")
        );
        let separate = format!(
            "{} FILTER {} RETURN p.vertices[*]._key",
            traversal.prefix(),
            clauses.join(" FILTER ")
        );

        prop_assert_eq!(
            outcome(&graph, &joined, true),
            outcome(&graph, &separate, true),
            "{}",
            separate
        );
    }

    #[test]
    fn prop_limit_returns_prefix(
        shape in graph_shape(),
        traversal in traversal_shape(),
        offset in 0usize..4,
        count in 0usize..6,
    ) {
        let graph = shape.build();
        let all = format!("{} RETURN p.vertices[*]._key", traversal.prefix());
        let limited = format!(
            "{} LIMIT {}, {} RETURN p.vertices[*]._key",
            traversal.prefix(),
            offset,
            count
        );

        let all = string_rows(&rows(&graph, &all, true));
        let limited = string_rows(&rows(&graph, &limited, true));
        let expected: Vec<String> = all.into_iter().skip(offset).take(count).collect();
        prop_assert_eq!(limited, expected);
    }
}

//! Fixture graphs used across the integration suites
//!
//! Vertex collection `v` and edge collection `e` unless noted otherwise.

use serde_json::json;
use trellis_core::types::collection::{CollectionKind, EdgeDefinition, GraphDefinition};
use trellis_core::types::value::Value;
use trellis_storage::MemGraph;

/// Name of the named graph registered by [`quantifier_graph`]
pub const QUANTIFIER_GRAPH: &str = "g";

fn new_graph(vertex_collections: &[&str], edge_collections: &[&str]) -> MemGraph {
    let graph = MemGraph::new();
    for name in vertex_collections {
        graph
            .create_collection(name, CollectionKind::Document)
            .expect("create vertex collection");
    }
    for name in edge_collections {
        graph
            .create_collection(name, CollectionKind::Edge)
            .expect("create edge collection");
    }
    graph
}

fn vertex(graph: &MemGraph, collection: &str, key: &str, attributes: serde_json::Value) {
    graph
        .insert_vertex(collection, key, Value::from(attributes))
        .expect("insert vertex");
}

fn edge(graph: &MemGraph, collection: &str, from: &str, to: &str, attributes: serde_json::Value) {
    graph
        .insert_edge(collection, from, to, Value::from(attributes))
        .expect("insert edge");
}

/// Two-sided tree with a named graph `g`
///
/// ```text
/// C <-+             +-> F
///     |             |
///     +-B<---A--->E-+
///     |             |
/// D <-+             +-> G
/// ```
///
/// Left side has `foo: true`, right side `foo: false`. Top has
/// `bar: true`, bottom `bar: false`; A, B, E have `bar: true`. Edges carry
/// `foo`/`bar` of their target and keys like `AB`.
pub fn quantifier_graph() -> MemGraph {
    let graph = new_graph(&["v"], &["e"]);
    for (key, foo, bar) in [
        ("A", true, true),
        ("B", true, true),
        ("C", true, true),
        ("D", true, false),
        ("E", false, true),
        ("F", false, true),
        ("G", false, false),
    ] {
        vertex(&graph, "v", key, json!({ "foo": foo, "bar": bar }));
    }
    for (from, to, foo, bar) in [
        ("A", "B", true, true),
        ("B", "C", true, true),
        ("B", "D", true, false),
        ("A", "E", false, true),
        ("E", "F", false, true),
        ("E", "G", false, false),
    ] {
        edge(
            &graph,
            "e",
            &format!("v/{}", from),
            &format!("v/{}", to),
            json!({ "_key": format!("{}{}", from, to), "foo": foo, "bar": bar }),
        );
    }
    graph.add_graph(
        GraphDefinition::new(QUANTIFIER_GRAPH).with_edge_definition(EdgeDefinition::new("e", ["v"], ["v"])),
    );
    graph
}

/// Tree with `left`/`right` flags plus a separate triangle
///
/// ```text
/// C <- B <- A -> D -> E
/// F <--|         |--> G
///
/// Tri1 --> Tri2
///  ^        |
///  |--Tri3<-|
/// ```
pub fn complex_filtering_graph() -> MemGraph {
    let graph = new_graph(&["v"], &["e"]);
    vertex(&graph, "v", "A", json!({ "left": false, "right": false }));
    vertex(&graph, "v", "B", json!({ "left": true, "right": false, "value": 25 }));
    vertex(&graph, "v", "C", json!({ "left": true, "right": false }));
    vertex(&graph, "v", "D", json!({ "left": false, "right": true, "value": 75 }));
    vertex(&graph, "v", "E", json!({ "left": false, "right": true }));
    vertex(&graph, "v", "F", json!({ "left": true, "right": false }));
    vertex(&graph, "v", "G", json!({ "left": false, "right": true }));

    let left = json!({ "left": true, "right": false });
    let right = json!({ "left": false, "right": true });
    edge(&graph, "e", "v/A", "v/B", left.clone());
    edge(&graph, "e", "v/B", "v/C", left.clone());
    edge(&graph, "e", "v/A", "v/D", right.clone());
    edge(&graph, "e", "v/D", "v/E", right.clone());
    edge(&graph, "e", "v/B", "v/F", left);
    edge(&graph, "e", "v/D", "v/G", right);

    for key in ["Tri1", "Tri2", "Tri3"] {
        vertex(&graph, "v", key, json!({ "isLoop": true }));
    }
    edge(&graph, "e", "v/Tri1", "v/Tri2", json!({ "isLoop": true }));
    edge(&graph, "e", "v/Tri2", "v/Tri3", json!({ "isLoop": true }));
    edge(&graph, "e", "v/Tri3", "v/Tri1", json!({ "isLoop": true, "lateLoop": true }));
    graph
}

/// Two directed rails in collections `v1` and `v2` with rungs in both
/// directions, edges in `e`
///
/// ```text
/// v1:  node_5 -> node_6 -> node_7 -> node_8
/// v2:  node_0 -> node_1 -> node_2 -> node_3 -> node_4
/// ```
///
/// Rungs: `v1/node_5 <-> v2/node_1`, `v1/node_6 <-> v2/node_0`,
/// `v1/node_6 <-> v2/node_1`. Exactly three hops from `v1/node_5` reach
/// `v1/node_8` through `v1` only and `v2/node_3` through `v2` only.
pub fn ladder_graph() -> MemGraph {
    let graph = new_graph(&["v1", "v2"], &["e"]);
    for i in 5..=8 {
        vertex(&graph, "v1", &format!("node_{}", i), json!({ "rail": 1, "n": i }));
    }
    for i in 0..=4 {
        vertex(&graph, "v2", &format!("node_{}", i), json!({ "rail": 2, "n": i }));
    }
    for i in 5..8 {
        edge(
            &graph,
            "e",
            &format!("v1/node_{}", i),
            &format!("v1/node_{}", i + 1),
            json!({}),
        );
    }
    for i in 0..4 {
        edge(
            &graph,
            "e",
            &format!("v2/node_{}", i),
            &format!("v2/node_{}", i + 1),
            json!({}),
        );
    }
    for (upper, lower) in [(5, 1), (6, 0), (6, 1)] {
        let upper = format!("v1/node_{}", upper);
        let lower = format!("v2/node_{}", lower);
        edge(&graph, "e", &upper, &lower, json!({ "rung": true }));
        edge(&graph, "e", &lower, &upper, json!({ "rung": true }));
    }
    graph
}

/// Small cyclic graph for PRUNE
///
/// Edges: A->B, B->C, C->D, C->F, E->B, F->E
pub fn prune_graph() -> MemGraph {
    let graph = new_graph(&["v"], &["e"]);
    for key in ["A", "B", "C", "D", "E", "F"] {
        vertex(&graph, "v", key, json!({}));
    }
    for (from, to) in [("A", "B"), ("B", "C"), ("C", "D"), ("C", "F"), ("E", "B"), ("F", "E")] {
        edge(
            &graph,
            "e",
            &format!("v/{}", from),
            &format!("v/{}", to),
            json!({}),
        );
    }
    graph
}

/// Edges through a vertex that does not exist
///
/// Edges: A -> v/missing, v/missing -> B
pub fn broken_graph() -> MemGraph {
    let graph = new_graph(&["v"], &["e"]);
    vertex(&graph, "v", "A", json!({}));
    vertex(&graph, "v", "B", json!({}));
    edge(&graph, "e", "v/A", "v/missing", json!({}));
    edge(&graph, "e", "v/missing", "v/B", json!({}));
    graph
}

/// Two edge collections `e` and `e2`; F is two hops from A and only
/// reachable with alternating collections and directions
///
/// - `e`: A->B, C->A, F->D, E->F
/// - `e2`: A->D, E->A, F->B, C->F
pub fn multi_direction_graph() -> MemGraph {
    let graph = new_graph(&["v"], &["e", "e2"]);
    for key in ["A", "B", "C", "D", "E", "F"] {
        vertex(&graph, "v", key, json!({}));
    }
    for (collection, from, to) in [
        ("e", "A", "B"),
        ("e", "C", "A"),
        ("e2", "A", "D"),
        ("e2", "E", "A"),
        ("e2", "F", "B"),
        ("e2", "C", "F"),
        ("e", "F", "D"),
        ("e", "E", "F"),
    ] {
        edge(
            &graph,
            collection,
            &format!("v/{}", from),
            &format!("v/{}", to),
            json!({}),
        );
    }
    graph
}

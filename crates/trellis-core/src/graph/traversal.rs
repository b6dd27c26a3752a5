//! Traversal engine
//!
//! [`Traverser`] walks the graph from one start vertex, depth-first or
//! breadth-first, and yields a [`TraversalStep`] for every path that reaches
//! `min_depth` and passes the attached [`PathConditions`].
//!
//! # State machine
//!
//! ```text
//!  Idle ──start──▶ Expanding ──frontier empty──▶ Exhausted
//!                   │    ▲
//!             visit │    │ expand (children pushed onto frontier)
//!                   ▼    │
//!                  Yielding
//! ```
//!
//! The traverser is a lazy `Iterator`: each call to `next()` does just
//! enough expansion to produce the next result. Dropping it releases the
//! frontier, which is how an enclosing LIMIT stops a walk early.
//!
//! # Per-candidate order of checks
//!
//! 1. edge collection allowed by the [`CollectionFilter`]
//! 2. edge uniqueness
//! 3. target vertex collection allowed
//! 4. vertex uniqueness (`global` marks the vertex visited on discovery)
//! 5. vertex fetch (dangling edges are skipped)
//! 6. [`PathConditions::admits`] on the extended path (early prune)

use crate::error::TraversalResult;
use crate::graph::filter::CollectionFilter;
use crate::graph::options::{Direction, TraversalOptions, Uniqueness};
use crate::graph::path::TraversalPath;
use crate::storage::GraphProvider;
use crate::types::document::{Document, DocumentId};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hooks through which compiled filter conditions steer the walk
///
/// All methods default to "no restriction".
pub trait PathConditions {
    /// Called right after a path was extended by one hop (and once for the
    /// depth-0 start path). `false` discards the path and its whole subtree.
    fn admits(&self, _path: &TraversalPath) -> TraversalResult<bool> {
        Ok(true)
    }

    /// `true` stops expansion below this path; the path itself may still
    /// be emitted.
    fn prunes(&self, _path: &TraversalPath) -> TraversalResult<bool> {
        Ok(false)
    }

    /// Final check before a path at `depth >= min_depth` is emitted
    fn accepts(&self, _path: &TraversalPath) -> TraversalResult<bool> {
        Ok(true)
    }
}

/// Conditions that accept every path
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConditions;

impl PathConditions for NoConditions {}

impl<C: PathConditions + ?Sized> PathConditions for &C {
    fn admits(&self, path: &TraversalPath) -> TraversalResult<bool> {
        (**self).admits(path)
    }

    fn prunes(&self, path: &TraversalPath) -> TraversalResult<bool> {
        (**self).prunes(path)
    }

    fn accepts(&self, path: &TraversalPath) -> TraversalResult<bool> {
        (**self).accepts(path)
    }
}

/// One traversal result: the reached vertex, the edge that led there (none
/// at depth 0) and the full path
#[derive(Debug, Clone)]
pub struct TraversalStep {
    pub vertex: Arc<Document>,
    pub edge: Option<Arc<Document>>,
    pub path: TraversalPath,
}

impl From<TraversalPath> for TraversalStep {
    fn from(path: TraversalPath) -> Self {
        Self {
            vertex: path.last_vertex().clone(),
            edge: path.last_edge().cloned(),
            path,
        }
    }
}

/// Work counters of one or more traversals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    /// Vertex documents fetched from the provider
    pub vertices_fetched: u64,
    /// Edge enumeration requests sent to the provider
    pub edge_lookups: u64,
    /// Edges inspected as candidates
    pub edges_scanned: u64,
    /// Paths discarded by a condition
    pub filtered: u64,
    /// Paths not expanded because of PRUNE
    pub pruned: u64,
}

impl TraversalStats {
    /// Accumulate another traversal's counters
    pub fn merge(&mut self, other: &TraversalStats) {
        self.vertices_fetched += other.vertices_fetched;
        self.edge_lookups += other.edge_lookups;
        self.edges_scanned += other.edges_scanned;
        self.filtered += other.filtered;
        self.pruned += other.pruned;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Expanding,
    Exhausted,
}

/// Lazy bounded-depth walk from a single start vertex
pub struct Traverser<'a, C> {
    provider: &'a dyn GraphProvider,
    filter: &'a CollectionFilter,
    options: &'a TraversalOptions,
    conditions: C,
    start: Option<DocumentId>,
    state: State,
    /// DFS pops from the back, BFS from the front
    frontier: VecDeque<TraversalPath>,
    /// Emitted path whose children are pushed on the next `next()` call
    pending_expansion: Option<TraversalPath>,
    visited: FxHashSet<DocumentId>,
    stats: TraversalStats,
}

impl<'a, C: PathConditions> Traverser<'a, C> {
    /// Create a traverser in the `Idle` state; no I/O happens until the
    /// first call to `next()`
    pub fn new(
        provider: &'a dyn GraphProvider,
        filter: &'a CollectionFilter,
        options: &'a TraversalOptions,
        conditions: C,
        start: DocumentId,
    ) -> Self {
        Self {
            provider,
            filter,
            options,
            conditions,
            start: Some(start),
            state: State::Idle,
            frontier: VecDeque::new(),
            pending_expansion: None,
            visited: FxHashSet::default(),
            stats: TraversalStats::default(),
        }
    }

    /// Counters collected so far
    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    fn begin(&mut self) -> TraversalResult<()> {
        let Some(start) = self.start.take() else {
            return Ok(());
        };

        debug!(
            start = %start,
            min_depth = self.options.min_depth,
            max_depth = self.options.max_depth,
            bfs = self.options.bfs,
            "starting traversal"
        );

        self.stats.vertices_fetched += 1;
        let Some(vertex) = self.provider.vertex(&start)? else {
            warn!(start = %start, "start vertex not found, traversal yields no results");
            return Ok(());
        };

        if self.options.unique_vertices == Uniqueness::Global {
            self.visited.insert(start);
        }

        let path = TraversalPath::new(vertex);
        if self.conditions.admits(&path)? {
            self.frontier.push_back(path);
        } else {
            self.stats.filtered += 1;
        }
        Ok(())
    }

    /// Decide whether `path` is emitted and whether it is expanded
    fn visit(&mut self, path: TraversalPath) -> TraversalResult<Option<TraversalStep>> {
        let depth = path.depth() as u64;

        let mut expand = depth < self.options.max_depth;
        if expand && self.conditions.prunes(&path)? {
            self.stats.pruned += 1;
            expand = false;
        }

        let emit = depth >= self.options.min_depth && {
            let accepted = self.conditions.accepts(&path)?;
            if !accepted {
                self.stats.filtered += 1;
            }
            accepted
        };

        match (emit, expand) {
            (true, true) => {
                self.pending_expansion = Some(path.clone());
                Ok(Some(TraversalStep::from(path)))
            }
            (true, false) => Ok(Some(TraversalStep::from(path))),
            (false, true) => {
                self.expand(&path)?;
                Ok(None)
            }
            (false, false) => Ok(None),
        }
    }

    /// Push all admissible one-hop extensions of `path` onto the frontier
    fn expand(&mut self, path: &TraversalPath) -> TraversalResult<()> {
        let current = path.last_vertex().id().clone();
        let mut children = Vec::new();

        for scope in self.filter.edge_scopes() {
            if !self.filter.is_edge_allowed(&scope.collection) {
                continue;
            }

            let edges = self.edges_of(&scope.collection, scope.direction, &current)?;
            for edge in edges {
                self.stats.edges_scanned += 1;

                if self.options.unique_edges == Uniqueness::Path && path.contains_edge(edge.id()) {
                    continue;
                }

                let target = match (scope.direction, edge.ends()) {
                    (Direction::Outbound, Some(ends)) => &ends.to,
                    (Direction::Inbound, Some(ends)) => &ends.from,
                    (Direction::Any, Some(_)) => match edge.other_end(&current) {
                        Some(target) => target,
                        None => continue,
                    },
                    (_, None) => continue,
                };

                if !self.filter.is_vertex_allowed(target.collection()) {
                    continue;
                }

                match self.options.unique_vertices {
                    Uniqueness::Path if path.contains_vertex(target) => continue,
                    Uniqueness::Global if self.visited.contains(target) => continue,
                    _ => {}
                }

                self.stats.vertices_fetched += 1;
                let Some(vertex) = self.provider.vertex(target)? else {
                    debug!(edge = %edge.id(), target = %target, "skipping dangling edge");
                    continue;
                };

                if self.options.unique_vertices == Uniqueness::Global {
                    self.visited.insert(target.clone());
                }

                let child = path.extend(edge.clone(), vertex);
                if self.conditions.admits(&child)? {
                    children.push(child);
                } else {
                    self.stats.filtered += 1;
                }
            }
        }

        if self.options.bfs {
            self.frontier.extend(children);
        } else {
            // Reversed so the first enumerated edge is popped first.
            self.frontier.extend(children.into_iter().rev());
        }
        Ok(())
    }

    fn edges_of(
        &mut self,
        collection: &str,
        direction: Direction,
        vertex: &DocumentId,
    ) -> TraversalResult<Vec<Arc<Document>>> {
        match direction {
            Direction::Outbound => {
                self.stats.edge_lookups += 1;
                Ok(self.provider.out_edges(collection, vertex)?)
            }
            Direction::Inbound => {
                self.stats.edge_lookups += 1;
                Ok(self.provider.in_edges(collection, vertex)?)
            }
            Direction::Any => {
                self.stats.edge_lookups += 2;
                let mut edges = self.provider.out_edges(collection, vertex)?;
                let incoming = self.provider.in_edges(collection, vertex)?;
                // Self-loops appear in both lists; keep the outbound copy.
                edges.extend(incoming.into_iter().filter(|e| {
                    e.ends().map_or(true, |ends| ends.from != ends.to)
                }));
                Ok(edges)
            }
        }
    }
}

impl<C: PathConditions> Iterator for Traverser<'_, C> {
    type Item = TraversalResult<TraversalStep>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                State::Exhausted => return None,
                State::Idle => {
                    self.state = State::Expanding;
                    if let Err(e) = self.begin() {
                        self.state = State::Exhausted;
                        return Some(Err(e));
                    }
                }
                State::Expanding => {
                    if let Some(path) = self.pending_expansion.take() {
                        if let Err(e) = self.expand(&path) {
                            self.state = State::Exhausted;
                            return Some(Err(e));
                        }
                    }

                    let next = if self.options.bfs {
                        self.frontier.pop_front()
                    } else {
                        self.frontier.pop_back()
                    };

                    let Some(path) = next else {
                        self.state = State::Exhausted;
                        debug!(stats = ?self.stats, "traversal exhausted");
                        return None;
                    };

                    match self.visit(path) {
                        Ok(Some(step)) => return Some(Ok(step)),
                        Ok(None) => continue,
                        Err(e) => {
                            self.state = State::Exhausted;
                            self.frontier.clear();
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::filter::{EdgeCollectionSpec, TraversalSource};
    use crate::storage::{Catalog, StorageResult};
    use crate::types::collection::{CollectionInfo, CollectionKind, GraphDefinition};
    use crate::types::value::Value;
    use rustc_hash::FxHashMap;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct TestGraph {
        vertices: FxHashMap<DocumentId, Arc<Document>>,
        edges: Vec<Arc<Document>>,
        edge_calls: AtomicU64,
    }

    impl TestGraph {
        fn vertex(mut self, id: &str, attrs: serde_json::Value) -> Self {
            let id = DocumentId::parse(id).unwrap();
            self.vertices
                .insert(id.clone(), Arc::new(Document::vertex(id, Value::from(attrs))));
            self
        }

        fn edge(mut self, from: &str, to: &str) -> Self {
            let key = format!("{}", self.edges.len());
            self.edges.push(Arc::new(Document::edge(
                DocumentId::new("e", &key),
                DocumentId::parse(from).unwrap(),
                DocumentId::parse(to).unwrap(),
                Value::Null,
            )));
            self
        }
    }

    impl GraphProvider for TestGraph {
        fn vertex(&self, id: &DocumentId) -> StorageResult<Option<Arc<Document>>> {
            Ok(self.vertices.get(id).cloned())
        }

        fn out_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
            self.edge_calls.fetch_add(1, Ordering::Relaxed);
            Ok(self
                .edges
                .iter()
                .filter(|e| e.id().collection() == collection)
                .filter(|e| e.ends().map_or(false, |ends| &ends.from == vertex))
                .cloned()
                .collect())
        }

        fn in_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
            self.edge_calls.fetch_add(1, Ordering::Relaxed);
            Ok(self
                .edges
                .iter()
                .filter(|e| e.id().collection() == collection)
                .filter(|e| e.ends().map_or(false, |ends| &ends.to == vertex))
                .cloned()
                .collect())
        }
    }

    struct TestCatalog;

    impl Catalog for TestCatalog {
        fn collection(&self, name: &str) -> Option<CollectionInfo> {
            match name {
                "e" => Some(CollectionInfo::new(name, CollectionKind::Edge)),
                "v" | "w" => Some(CollectionInfo::new(name, CollectionKind::Document)),
                _ => None,
            }
        }

        fn graph(&self, _name: &str) -> Option<GraphDefinition> {
            None
        }
    }

    fn filter(direction: Direction, options: &TraversalOptions) -> CollectionFilter {
        CollectionFilter::new(
            &TestCatalog,
            &TraversalSource::EdgeCollections(vec![EdgeCollectionSpec::new("e")]),
            direction,
            options,
        )
        .unwrap()
    }

    fn depth(min: u64, max: u64) -> TraversalOptions {
        TraversalOptions {
            min_depth: min,
            max_depth: max,
            ..TraversalOptions::default()
        }
    }

    fn keys<C: PathConditions>(traverser: Traverser<'_, C>) -> Vec<String> {
        traverser
            .map(|step| step.unwrap().vertex.id().key().to_string())
            .collect()
    }

    fn run(graph: &TestGraph, direction: Direction, options: &TraversalOptions, start: &str) -> Vec<String> {
        let filter = filter(direction, options);
        let traverser = Traverser::new(
            graph,
            &filter,
            options,
            NoConditions,
            DocumentId::parse(start).unwrap(),
        );
        keys(traverser)
    }

    /// A→B, B→C, B→D, A→E, E→F, E→G
    fn tree() -> TestGraph {
        let mut graph = TestGraph::default();
        for key in ["A", "B", "C", "D", "E", "F", "G"] {
            graph = graph.vertex(&format!("v/{}", key), serde_json::json!({}));
        }
        graph
            .edge("v/A", "v/B")
            .edge("v/B", "v/C")
            .edge("v/B", "v/D")
            .edge("v/A", "v/E")
            .edge("v/E", "v/F")
            .edge("v/E", "v/G")
    }

    #[test]
    fn test_dfs_order_follows_edge_order() {
        let result = run(&tree(), Direction::Outbound, &depth(0, 2), "v/A");
        assert_eq!(result, vec!["A", "B", "C", "D", "E", "F", "G"]);
    }

    #[test]
    fn test_bfs_order_is_level_by_level() {
        let options = TraversalOptions {
            bfs: true,
            ..depth(0, 2)
        };
        let result = run(&tree(), Direction::Outbound, &options, "v/A");
        assert_eq!(result, vec!["A", "B", "E", "C", "D", "F", "G"]);
    }

    #[test]
    fn test_zero_depth_yields_start_only() {
        let graph = tree();
        let result = run(&graph, Direction::Outbound, &depth(0, 0), "v/A");
        assert_eq!(result, vec!["A"]);
        assert_eq!(graph.edge_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_min_depth_skips_shallow_paths() {
        let result = run(&tree(), Direction::Outbound, &depth(2, 2), "v/A");
        assert_eq!(result, vec!["C", "D", "F", "G"]);
    }

    #[test]
    fn test_inbound_and_any() {
        let inbound = run(&tree(), Direction::Inbound, &depth(1, 2), "v/C");
        assert_eq!(inbound, vec!["B", "A"]);

        let any = run(&tree(), Direction::Any, &depth(1, 1), "v/B");
        assert_eq!(any, vec!["C", "D", "A"]);
    }

    #[test]
    fn test_missing_start_yields_nothing() {
        assert!(run(&tree(), Direction::Outbound, &depth(0, 3), "v/nope").is_empty());
    }

    #[test]
    fn test_dangling_edge_is_skipped() {
        let graph = tree().edge("v/A", "v/deleted");
        let result = run(&graph, Direction::Outbound, &depth(1, 1), "v/A");
        assert_eq!(result, vec!["B", "E"]);
    }

    #[test]
    fn test_path_uniqueness_avoids_cycles() {
        let graph = TestGraph::default()
            .vertex("v/A", serde_json::json!({}))
            .vertex("v/B", serde_json::json!({}))
            .vertex("v/C", serde_json::json!({}))
            .edge("v/A", "v/B")
            .edge("v/B", "v/C")
            .edge("v/C", "v/A");
        let result = run(&graph, Direction::Outbound, &depth(1, 10), "v/A");
        assert_eq!(result, vec!["B", "C"]);
    }

    #[test]
    fn test_edge_uniqueness_without_vertex_uniqueness() {
        // s→a, a→b, a→a, b→c, b→a, c→a
        let mut graph = TestGraph::default();
        for key in ["s", "a", "b", "c"] {
            graph = graph.vertex(&format!("v/{}", key), serde_json::json!({}));
        }
        let graph = graph
            .edge("v/s", "v/a")
            .edge("v/a", "v/b")
            .edge("v/a", "v/a")
            .edge("v/b", "v/c")
            .edge("v/b", "v/a")
            .edge("v/c", "v/a");

        let options = TraversalOptions {
            unique_vertices: Uniqueness::None,
            ..depth(1, 3)
        };
        let mut result = run(&graph, Direction::Outbound, &options, "v/s");
        result.sort();
        // depth 1: a; depth 2: b, a (self-loop); depth 3: c, a, b
        assert_eq!(result, vec!["a", "a", "a", "b", "b", "c"]);

        let path_unique = TraversalOptions {
            unique_vertices: Uniqueness::Path,
            ..depth(1, 3)
        };
        let mut result = run(&graph, Direction::Outbound, &path_unique, "v/s");
        result.sort();
        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_global_uniqueness_visits_each_vertex_once() {
        // diamond: A→B, A→C, B→D, C→D
        let mut graph = TestGraph::default();
        for key in ["A", "B", "C", "D"] {
            graph = graph.vertex(&format!("v/{}", key), serde_json::json!({}));
        }
        let graph = graph
            .edge("v/A", "v/B")
            .edge("v/A", "v/C")
            .edge("v/B", "v/D")
            .edge("v/C", "v/D");

        let path_unique = run(&graph, Direction::Outbound, &depth(1, 2), "v/A");
        assert_eq!(path_unique.iter().filter(|k| *k == "D").count(), 2);

        let global = TraversalOptions {
            bfs: true,
            unique_vertices: Uniqueness::Global,
            ..depth(1, 2)
        };
        let result = run(&graph, Direction::Outbound, &global, "v/A");
        assert_eq!(result, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_vertex_restriction_blocks_expansion() {
        let graph = TestGraph::default()
            .vertex("v/A", serde_json::json!({}))
            .vertex("w/B", serde_json::json!({}))
            .vertex("v/C", serde_json::json!({}))
            .edge("v/A", "w/B")
            .edge("w/B", "v/C");

        let options = TraversalOptions {
            vertex_collections: vec!["v".into()],
            ..depth(1, 2)
        };
        assert!(run(&graph, Direction::Outbound, &options, "v/A").is_empty());
        assert_eq!(
            run(&graph, Direction::Outbound, &depth(1, 2), "v/A"),
            vec!["B", "C"]
        );
    }

    struct KeyConditions {
        reject: &'static str,
        prune_at: &'static str,
        admitted: Cell<u64>,
    }

    impl PathConditions for KeyConditions {
        fn admits(&self, path: &TraversalPath) -> TraversalResult<bool> {
            self.admitted.set(self.admitted.get() + 1);
            Ok(path.last_vertex().id().key() != self.reject)
        }

        fn prunes(&self, path: &TraversalPath) -> TraversalResult<bool> {
            Ok(path.last_vertex().id().key() == self.prune_at)
        }
    }

    #[test]
    fn test_conditions_prune_subtrees() {
        let graph = tree();
        let options = depth(1, 2);
        let filter = filter(Direction::Outbound, &options);
        let conditions = KeyConditions {
            reject: "B",
            prune_at: "E",
            admitted: Cell::new(0),
        };
        let mut traverser = Traverser::new(
            &graph,
            &filter,
            &options,
            &conditions,
            DocumentId::new("v", "A"),
        );

        let mut result = Vec::new();
        for step in traverser.by_ref() {
            result.push(step.unwrap().vertex.id().key().to_string());
        }
        // B rejected with its subtree, E emitted but not expanded
        assert_eq!(result, vec!["E"]);
        assert_eq!(traverser.stats().filtered, 1);
        assert_eq!(traverser.stats().pruned, 1);
        // start, B, E
        assert_eq!(conditions.admitted.get(), 3);
    }

    #[test]
    fn test_early_termination_stops_expansion() {
        let graph = tree();
        let options = depth(1, 2);
        let filter = filter(Direction::Outbound, &options);
        let traverser = Traverser::new(
            &graph,
            &filter,
            &options,
            NoConditions,
            DocumentId::new("v", "A"),
        );

        let first: Vec<_> = traverser.take(1).collect();
        assert_eq!(first.len(), 1);
        // only the start vertex was expanded
        assert_eq!(graph.edge_calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_step_exposes_vertex_edge_and_path() {
        let graph = tree();
        let options = depth(0, 1);
        let filter = filter(Direction::Outbound, &options);
        let steps: Vec<_> = Traverser::new(
            &graph,
            &filter,
            &options,
            NoConditions,
            DocumentId::new("v", "A"),
        )
        .collect::<TraversalResult<_>>()
        .unwrap();

        assert!(steps[0].edge.is_none());
        assert_eq!(steps[0].path.depth(), 0);
        let second = &steps[1];
        assert_eq!(second.vertex.id().key(), "B");
        assert_eq!(second.edge.as_ref().map(|e| e.id().key()), Some("0"));
        assert_eq!(second.path.depth(), 1);
    }

    #[test]
    fn test_stats_merge() {
        let mut total = TraversalStats::default();
        let one = TraversalStats {
            vertices_fetched: 2,
            edge_lookups: 1,
            edges_scanned: 3,
            filtered: 1,
            pruned: 0,
        };
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.vertices_fetched, 4);
        assert_eq!(total.edges_scanned, 6);
    }
}

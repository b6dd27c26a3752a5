//! Traversal paths
//!
//! A path of depth `d` holds `d + 1` vertices and `d` edges, where
//! `edges[i]` connects `vertices[i]` to `vertices[i + 1]` in traversal
//! direction. Positions outside the path read as "no value" rather than
//! failing, which lets a condition written for a deeper depth be evaluated
//! safely on a shorter path.

use crate::types::document::{Document, DocumentId};
use crate::types::value::Value;
use std::sync::Arc;

/// A path through the graph, built incrementally during expansion
#[derive(Debug, Clone)]
pub struct TraversalPath {
    vertices: Vec<Arc<Document>>,
    edges: Vec<Arc<Document>>,
}

impl TraversalPath {
    /// Create a depth-0 path holding only the start vertex
    pub fn new(start: Arc<Document>) -> Self {
        Self {
            vertices: vec![start],
            edges: Vec::new(),
        }
    }

    /// Extend the path by one hop
    pub fn extend(&self, edge: Arc<Document>, vertex: Arc<Document>) -> Self {
        let mut vertices = Vec::with_capacity(self.vertices.len() + 1);
        vertices.extend(self.vertices.iter().cloned());
        vertices.push(vertex);

        let mut edges = Vec::with_capacity(self.edges.len() + 1);
        edges.extend(self.edges.iter().cloned());
        edges.push(edge);

        Self { vertices, edges }
    }

    /// Number of edges in the path
    pub fn depth(&self) -> usize {
        self.edges.len()
    }

    /// Vertex at `index`; negative indexes count from the end (`-1` is the
    /// current vertex)
    pub fn vertex(&self, index: i64) -> Option<&Arc<Document>> {
        resolve_index(index, self.vertices.len()).map(|i| &self.vertices[i])
    }

    /// Edge at `index`; negative indexes count from the end
    pub fn edge(&self, index: i64) -> Option<&Arc<Document>> {
        resolve_index(index, self.edges.len()).map(|i| &self.edges[i])
    }

    /// The current (last) vertex
    pub fn last_vertex(&self) -> &Arc<Document> {
        // A path always holds at least its start vertex.
        &self.vertices[self.vertices.len() - 1]
    }

    /// The edge that led to the current vertex (`None` at depth 0)
    pub fn last_edge(&self) -> Option<&Arc<Document>> {
        self.edges.last()
    }

    /// All vertices in order
    pub fn vertices(&self) -> &[Arc<Document>] {
        &self.vertices
    }

    /// All edges in order
    pub fn edges(&self) -> &[Arc<Document>] {
        &self.edges
    }

    pub fn contains_vertex(&self, id: &DocumentId) -> bool {
        self.vertices.iter().any(|v| v.id() == id)
    }

    pub fn contains_edge(&self, id: &DocumentId) -> bool {
        self.edges.iter().any(|e| e.id() == id)
    }

    /// `p.vertices` as an array value
    pub fn vertices_value(&self) -> Value {
        Value::Array(self.vertices.iter().map(|v| v.body().clone()).collect())
    }

    /// `p.edges` as an array value
    pub fn edges_value(&self) -> Value {
        Value::Array(self.edges.iter().map(|e| e.body().clone()).collect())
    }

    /// The whole path as `{ "edges": [...], "vertices": [...] }`
    pub fn to_value(&self) -> Value {
        Value::object([
            ("edges", self.edges_value()),
            ("vertices", self.vertices_value()),
        ])
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(key: &str) -> Arc<Document> {
        Arc::new(Document::vertex(DocumentId::new("v", key), Value::Null))
    }

    fn edge(key: &str, from: &str, to: &str) -> Arc<Document> {
        Arc::new(Document::edge(
            DocumentId::new("e", key),
            DocumentId::new("v", from),
            DocumentId::new("v", to),
            Value::Null,
        ))
    }

    fn sample_path() -> TraversalPath {
        TraversalPath::new(vertex("A"))
            .extend(edge("AB", "A", "B"), vertex("B"))
            .extend(edge("BC", "B", "C"), vertex("C"))
    }

    #[test]
    fn test_path_depth_and_invariant() {
        let path = sample_path();
        assert_eq!(path.depth(), 2);
        assert_eq!(path.vertices().len(), path.edges().len() + 1);
        assert_eq!(path.last_vertex().id().key(), "C");
        assert_eq!(path.last_edge().map(|e| e.id().key()), Some("BC"));
    }

    #[test]
    fn test_positive_and_negative_indexes() {
        let path = sample_path();
        assert_eq!(path.vertex(0).map(|v| v.id().key()), Some("A"));
        assert_eq!(path.vertex(-1).map(|v| v.id().key()), Some("C"));
        assert_eq!(path.vertex(-3).map(|v| v.id().key()), Some("A"));
        assert_eq!(path.edge(-1).map(|e| e.id().key()), Some("BC"));
    }

    #[test]
    fn test_out_of_range_is_none() {
        let path = sample_path();
        assert!(path.vertex(3).is_none());
        assert!(path.vertex(-4).is_none());
        assert!(path.edge(2).is_none());

        let start_only = TraversalPath::new(vertex("A"));
        assert!(start_only.edge(0).is_none());
        assert!(start_only.edge(-1).is_none());
        assert!(start_only.last_edge().is_none());
    }

    #[test]
    fn test_extend_does_not_mutate_parent() {
        let parent = TraversalPath::new(vertex("A"));
        let child = parent.extend(edge("AB", "A", "B"), vertex("B"));
        assert_eq!(parent.depth(), 0);
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn test_contains() {
        let path = sample_path();
        assert!(path.contains_vertex(&DocumentId::new("v", "B")));
        assert!(!path.contains_vertex(&DocumentId::new("v", "D")));
        assert!(path.contains_edge(&DocumentId::new("e", "AB")));
    }

    #[test]
    fn test_path_value_shape() {
        let value = sample_path().to_value();
        let vertices = value.get("vertices").and_then(Value::as_array).unwrap();
        let edges = value.get("edges").and_then(Value::as_array).unwrap();
        assert_eq!(vertices.len(), 3);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].get("_from"), Some(&Value::string("v/A")));
    }
}

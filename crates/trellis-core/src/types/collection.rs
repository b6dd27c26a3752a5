//! Collection and named-graph catalog types
//!
//! The catalog describes which collections exist, what kind they are, and
//! how named graphs group them. Traversal setup validates every collection
//! name against these descriptions before any expansion begins.

use serde::{Deserialize, Serialize};

/// Kind of a named data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Document collection (may hold vertices)
    Document,
    /// Edge collection (documents carry `_from` / `_to`)
    Edge,
    /// View - never traversable
    View,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Edge => "edge",
            Self::View => "view",
        }
    }
}

/// Catalog entry for a collection or view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub kind: CollectionKind,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// One edge definition of a named graph
///
/// Edges in `collection` connect vertices of the `from` collections to
/// vertices of the `to` collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl EdgeDefinition {
    pub fn new(
        collection: impl Into<String>,
        from: impl IntoIterator<Item = impl Into<String>>,
        to: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            collection: collection.into(),
            from: from.into_iter().map(Into::into).collect(),
            to: to.into_iter().map(Into::into).collect(),
        }
    }
}

/// A named graph: edge definitions plus orphan vertex collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub name: String,
    #[serde(default)]
    pub edge_definitions: Vec<EdgeDefinition>,
    #[serde(default)]
    pub orphan_collections: Vec<String>,
}

impl GraphDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            edge_definitions: Vec::new(),
            orphan_collections: Vec::new(),
        }
    }

    /// Add an edge definition
    pub fn with_edge_definition(mut self, definition: EdgeDefinition) -> Self {
        self.edge_definitions.push(definition);
        self
    }

    /// Add an orphan vertex collection
    pub fn with_orphan(mut self, collection: impl Into<String>) -> Self {
        self.orphan_collections.push(collection.into());
        self
    }

    /// Edge collections in definition order
    pub fn edge_collections(&self) -> impl Iterator<Item = &str> {
        self.edge_definitions.iter().map(|d| d.collection.as_str())
    }

    /// Whether `name` is one of the graph's edge collections
    pub fn has_edge_collection(&self, name: &str) -> bool {
        self.edge_collections().any(|c| c == name)
    }

    /// Whether `name` is one of the graph's vertex collections (any side of
    /// an edge definition, or an orphan)
    pub fn has_vertex_collection(&self, name: &str) -> bool {
        self.orphan_collections.iter().any(|c| c == name)
            || self
                .edge_definitions
                .iter()
                .any(|d| d.from.iter().chain(d.to.iter()).any(|c| c == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn social_graph() -> GraphDefinition {
        GraphDefinition::new("social")
            .with_edge_definition(EdgeDefinition::new("knows", ["persons"], ["persons"]))
            .with_edge_definition(EdgeDefinition::new("likes", ["persons"], ["posts"]))
            .with_orphan("tags")
    }

    #[test]
    fn test_graph_membership() {
        let graph = social_graph();
        assert!(graph.has_edge_collection("knows"));
        assert!(!graph.has_edge_collection("persons"));
        assert!(graph.has_vertex_collection("posts"));
        assert!(graph.has_vertex_collection("tags"));
        assert!(!graph.has_vertex_collection("knows"));
        assert_eq!(graph.edge_collections().collect::<Vec<_>>(), vec!["knows", "likes"]);
    }

    #[test]
    fn test_graph_definition_serde() {
        let json = r#"{"name":"g","edge_definitions":[{"collection":"e","from":["v"],"to":["v"]}]}"#;
        let graph: GraphDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(graph.name, "g");
        assert!(graph.orphan_collections.is_empty());
        assert!(graph.has_vertex_collection("v"));
    }

    #[test]
    fn test_collection_kind_names() {
        assert_eq!(CollectionKind::Document.as_str(), "document");
        assert_eq!(CollectionKind::Edge.as_str(), "edge");
        assert_eq!(CollectionKind::View.as_str(), "view");
    }
}

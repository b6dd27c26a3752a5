//! In-memory graph implementation
//!
//! `MemGraph` keeps documents and per-collection adjacency lists in memory.
//! Edge lists preserve insertion order, which makes traversal order
//! deterministic for a given load sequence.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use trellis_core::storage::{Catalog, GraphProvider, StorageError, StorageResult};
use trellis_core::types::collection::{CollectionInfo, CollectionKind, GraphDefinition};
use trellis_core::types::document::{Document, DocumentId};
use trellis_core::types::value::Value;

/// In-memory graph store
///
/// Uses `parking_lot::RwLock` so concurrent traversals read without
/// blocking each other. All data is lost when the instance is dropped.
///
/// # Usage
///
/// ```ignore
/// use trellis_storage::MemGraph;
/// use trellis_core::CollectionKind;
///
/// let graph = MemGraph::new();
/// graph.create_collection("persons", CollectionKind::Document)?;
/// graph.create_collection("knows", CollectionKind::Edge)?;
/// graph.insert_vertex("persons", "alice", Value::object([("age", Value::Int(42))]))?;
/// graph.insert_vertex("persons", "bob", Value::Null)?;
/// graph.insert_edge("knows", "persons/alice", "persons/bob", Value::Null)?;
/// ```
#[derive(Debug, Default)]
pub struct MemGraph {
    data: RwLock<GraphData>,
}

#[derive(Debug, Default)]
struct GraphData {
    collections: FxHashMap<String, CollectionInfo>,
    graphs: FxHashMap<String, GraphDefinition>,
    vertices: FxHashMap<DocumentId, Arc<Document>>,
    edges: FxHashMap<DocumentId, Arc<Document>>,
    /// Edge collection name -> adjacency
    adjacency: FxHashMap<String, Adjacency>,
    next_key: u64,
}

#[derive(Debug, Default)]
struct Adjacency {
    outbound: FxHashMap<DocumentId, Vec<Arc<Document>>>,
    inbound: FxHashMap<DocumentId, Vec<Arc<Document>>>,
}

impl GraphData {
    fn require(&self, name: &str, kind: CollectionKind) -> StorageResult<()> {
        let info = self
            .collections
            .get(name)
            .ok_or_else(|| StorageError::UnknownCollection {
                name: name.to_string(),
            })?;
        if info.kind != kind {
            return Err(StorageError::InvalidDocument {
                message: format!(
                    "collection '{}' is a {} collection, expected {}",
                    name,
                    info.kind.as_str(),
                    kind.as_str()
                ),
            });
        }
        Ok(())
    }

    fn generate_key(&mut self, collection: &str) -> DocumentId {
        loop {
            self.next_key += 1;
            let id = DocumentId::new(collection, &self.next_key.to_string());
            if !self.edges.contains_key(&id) {
                return id;
            }
        }
    }
}

impl MemGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Load collections, documents and graphs from a JSON dump
    ///
    /// ```json
    /// {
    ///   "collections": [
    ///     { "name": "v", "kind": "document", "documents": [{ "_key": "A" }] },
    ///     { "name": "e", "kind": "edge", "documents": [{ "_from": "v/A", "_to": "v/B" }] }
    ///   ],
    ///   "graphs": [
    ///     { "name": "g", "edge_definitions": [{ "collection": "e", "from": ["v"], "to": ["v"] }] }
    ///   ]
    /// }
    /// ```
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let dump: GraphDump = serde_json::from_str(json).map_err(|e| StorageError::Serialization {
            message: e.to_string(),
        })?;
        let graph = Self::new();
        graph.load(dump)?;
        Ok(graph)
    }

    fn load(&self, dump: GraphDump) -> StorageResult<()> {
        for collection in &dump.collections {
            self.create_collection(&collection.name, collection.kind)?;
        }
        for collection in dump.collections {
            let name = collection.name;
            for document in collection.documents {
                match collection.kind {
                    CollectionKind::Document => {
                        let key = system_string(&document, "_key")?;
                        self.insert_vertex(&name, &key, Value::from(serde_json::Value::Object(document)))?;
                    }
                    CollectionKind::Edge => {
                        let from = system_string(&document, "_from")?;
                        let to = system_string(&document, "_to")?;
                        self.insert_edge(&name, &from, &to, Value::from(serde_json::Value::Object(document)))?;
                    }
                    CollectionKind::View => {
                        return Err(StorageError::InvalidDocument {
                            message: format!("view '{}' cannot hold documents", name),
                        })
                    }
                }
            }
        }
        for graph in dump.graphs {
            self.add_graph(graph);
        }
        debug!(
            vertices = self.vertex_count(),
            edges = self.edge_count(),
            "loaded graph dump"
        );
        Ok(())
    }

    /// Create a collection; re-creating one with the same kind is a no-op
    pub fn create_collection(&self, name: &str, kind: CollectionKind) -> StorageResult<()> {
        let mut data = self.data.write();
        if let Some(existing) = data.collections.get(name) {
            if existing.kind == kind {
                return Ok(());
            }
            return Err(StorageError::InvalidDocument {
                message: format!(
                    "collection '{}' already exists as a {} collection",
                    name,
                    existing.kind.as_str()
                ),
            });
        }
        data.collections
            .insert(name.to_string(), CollectionInfo::new(name, kind));
        if kind == CollectionKind::Edge {
            data.adjacency.insert(name.to_string(), Adjacency::default());
        }
        Ok(())
    }

    /// Register (or replace) a named graph definition
    pub fn add_graph(&self, graph: GraphDefinition) {
        self.data.write().graphs.insert(graph.name.clone(), graph);
    }

    /// Insert a vertex; system attributes in `attributes` are ignored
    pub fn insert_vertex(&self, collection: &str, key: &str, attributes: Value) -> StorageResult<DocumentId> {
        let id = DocumentId::parse(&format!("{}/{}", collection, key)).ok_or_else(|| {
            StorageError::InvalidDocument {
                message: format!("invalid key '{}' for collection '{}'", key, collection),
            }
        })?;

        let mut data = self.data.write();
        data.require(collection, CollectionKind::Document)?;
        if data.vertices.contains_key(&id) {
            return Err(StorageError::InvalidDocument {
                message: format!("duplicate document '{}'", id),
            });
        }
        data.vertices
            .insert(id.clone(), Arc::new(Document::vertex(id.clone(), attributes)));
        Ok(id)
    }

    /// Insert an edge between two vertex ids
    ///
    /// The endpoints need not exist; such edges are dangling and skipped by
    /// traversals. A `_key` attribute names the edge, otherwise a key is
    /// generated.
    pub fn insert_edge(
        &self,
        collection: &str,
        from: &str,
        to: &str,
        attributes: Value,
    ) -> StorageResult<DocumentId> {
        let endpoint = |id: &str| {
            DocumentId::parse(id).ok_or_else(|| StorageError::InvalidDocument {
                message: format!("invalid edge endpoint '{}'", id),
            })
        };
        let (from, to) = (endpoint(from)?, endpoint(to)?);

        let mut data = self.data.write();
        data.require(collection, CollectionKind::Edge)?;
        let id = match attributes.get("_key").and_then(Value::as_str) {
            Some(key) => DocumentId::parse(&format!("{}/{}", collection, key)).ok_or_else(|| {
                StorageError::InvalidDocument {
                    message: format!("invalid key '{}' for collection '{}'", key, collection),
                }
            })?,
            None => data.generate_key(collection),
        };
        if data.edges.contains_key(&id) {
            return Err(StorageError::InvalidDocument {
                message: format!("duplicate document '{}'", id),
            });
        }

        let edge = Arc::new(Document::edge(id.clone(), from.clone(), to.clone(), attributes));
        data.edges.insert(id.clone(), Arc::clone(&edge));
        let adjacency = data
            .adjacency
            .get_mut(collection)
            .ok_or_else(|| StorageError::UnknownCollection {
                name: collection.to_string(),
            })?;
        adjacency.outbound.entry(from).or_default().push(Arc::clone(&edge));
        adjacency.inbound.entry(to).or_default().push(edge);
        Ok(id)
    }

    /// Remove a vertex, leaving its edges in place
    pub fn remove_vertex(&self, id: &DocumentId) -> bool {
        self.data.write().vertices.remove(id).is_some()
    }

    /// Number of stored vertices
    pub fn vertex_count(&self) -> usize {
        self.data.read().vertices.len()
    }

    /// Number of stored edges
    pub fn edge_count(&self) -> usize {
        self.data.read().edges.len()
    }

    fn adjacent(
        &self,
        collection: &str,
        vertex: &DocumentId,
        pick: impl Fn(&Adjacency) -> &FxHashMap<DocumentId, Vec<Arc<Document>>>,
    ) -> StorageResult<Vec<Arc<Document>>> {
        let data = self.data.read();
        let adjacency = data
            .adjacency
            .get(collection)
            .ok_or_else(|| StorageError::UnknownCollection {
                name: collection.to_string(),
            })?;
        Ok(pick(adjacency).get(vertex).cloned().unwrap_or_default())
    }
}

impl GraphProvider for MemGraph {
    fn vertex(&self, id: &DocumentId) -> StorageResult<Option<Arc<Document>>> {
        Ok(self.data.read().vertices.get(id).cloned())
    }

    fn out_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
        self.adjacent(collection, vertex, |adjacency| &adjacency.outbound)
    }

    fn in_edges(&self, collection: &str, vertex: &DocumentId) -> StorageResult<Vec<Arc<Document>>> {
        self.adjacent(collection, vertex, |adjacency| &adjacency.inbound)
    }
}

impl Catalog for MemGraph {
    fn collection(&self, name: &str) -> Option<CollectionInfo> {
        self.data.read().collections.get(name).cloned()
    }

    fn graph(&self, name: &str) -> Option<GraphDefinition> {
        self.data.read().graphs.get(name).cloned()
    }
}

#[derive(Deserialize)]
struct GraphDump {
    #[serde(default)]
    collections: Vec<CollectionDump>,
    #[serde(default)]
    graphs: Vec<GraphDefinition>,
}

#[derive(Deserialize)]
struct CollectionDump {
    name: String,
    kind: CollectionKind,
    #[serde(default)]
    documents: Vec<serde_json::Map<String, serde_json::Value>>,
}

fn system_string(document: &serde_json::Map<String, serde_json::Value>, attribute: &str) -> StorageResult<String> {
    document
        .get(attribute)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StorageError::InvalidDocument {
            message: format!("missing string attribute '{}'", attribute),
        })
}

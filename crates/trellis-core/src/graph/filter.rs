//! Collection restriction for traversals
//!
//! A [`CollectionFilter`] is built once per traversal from the traversal
//! source (named graph or edge collection list) and the
//! `vertexCollections` / `edgeCollections` options. Construction validates
//! every name against the [`Catalog`]; afterwards the filter is purely
//! advisory: candidates from disallowed collections are skipped during
//! expansion, never reported as errors.
//!
//! # Validation
//!
//! | Problem | Error |
//! |---------|-------|
//! | name does not exist | `DataSourceNotFound` |
//! | view, or wrong collection kind | `CollectionTypeInvalid` |
//! | exists, but not part of the named graph | `GraphVertexCollectionDoesNotExist` / `GraphEdgeCollectionDoesNotExist` |
//! | named graph unknown | `GraphNotFound` |
//! | named graph without edge definitions | `GraphEmpty` |

use crate::error::{TraversalError, TraversalResult};
use crate::graph::options::{Direction, TraversalOptions};
use crate::storage::Catalog;
use crate::types::collection::{CollectionKind, GraphDefinition};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// An edge collection named in an anonymous traversal, with an optional
/// direction override (`FOR v IN 1..2 ANY 'x' ec1, INBOUND ec2`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCollectionSpec {
    pub name: String,
    pub direction: Option<Direction>,
}

impl EdgeCollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: None,
        }
    }

    pub fn with_direction(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction: Some(direction),
        }
    }
}

/// Where a traversal takes its edges from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraversalSource {
    /// `GRAPH 'name'`
    Graph(String),
    /// `ec1, INBOUND ec2, ...`
    EdgeCollections(Vec<EdgeCollectionSpec>),
}

/// One edge collection to expand, with its effective direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeScope {
    pub collection: String,
    pub direction: Direction,
}

/// Validated vertex/edge collection restriction of one traversal
#[derive(Debug, Clone)]
pub struct CollectionFilter {
    vertex_collections: FxHashSet<String>,
    edge_collections: FxHashSet<String>,
    scopes: Vec<EdgeScope>,
}

impl CollectionFilter {
    /// Validate the source and restriction sets and build the filter
    pub fn new(
        catalog: &dyn Catalog,
        source: &TraversalSource,
        direction: Direction,
        options: &TraversalOptions,
    ) -> TraversalResult<Self> {
        let (scopes, graph) = match source {
            TraversalSource::Graph(name) => {
                let graph = catalog
                    .graph(name)
                    .ok_or_else(|| TraversalError::GraphNotFound { name: name.clone() })?;
                (graph_scopes(catalog, &graph, direction)?, Some(graph))
            }
            TraversalSource::EdgeCollections(specs) => {
                (anonymous_scopes(catalog, specs, direction)?, None)
            }
        };

        let mut vertex_collections = FxHashSet::default();
        for name in &options.vertex_collections {
            require_kind(catalog, name, CollectionKind::Document)?;
            if let Some(graph) = &graph {
                if !graph.has_vertex_collection(name) {
                    return Err(TraversalError::GraphVertexCollectionDoesNotExist {
                        graph: graph.name.clone(),
                        collection: name.clone(),
                    });
                }
            }
            vertex_collections.insert(name.clone());
        }

        let mut edge_collections = FxHashSet::default();
        for name in &options.edge_collections {
            require_kind(catalog, name, CollectionKind::Edge)?;
            if let Some(graph) = &graph {
                if !graph.has_edge_collection(name) {
                    return Err(TraversalError::GraphEdgeCollectionDoesNotExist {
                        graph: graph.name.clone(),
                        collection: name.clone(),
                    });
                }
            }
            edge_collections.insert(name.clone());
        }

        Ok(Self {
            vertex_collections,
            edge_collections,
            scopes,
        })
    }

    /// Whether vertices of `collection` may be visited
    pub fn is_vertex_allowed(&self, collection: &str) -> bool {
        self.vertex_collections.is_empty() || self.vertex_collections.contains(collection)
    }

    /// Whether edges of `collection` may be followed
    pub fn is_edge_allowed(&self, collection: &str) -> bool {
        self.edge_collections.is_empty() || self.edge_collections.contains(collection)
    }

    /// Edge collections to expand, in declaration order
    pub fn edge_scopes(&self) -> &[EdgeScope] {
        &self.scopes
    }
}

fn require_kind(catalog: &dyn Catalog, name: &str, expected: CollectionKind) -> TraversalResult<()> {
    let info = catalog
        .collection(name)
        .ok_or_else(|| TraversalError::data_source_not_found(name))?;

    if info.kind == CollectionKind::View {
        return Err(TraversalError::collection_type_invalid(
            name,
            "is a view and cannot be used in a traversal",
        ));
    }
    if info.kind != expected {
        return Err(TraversalError::collection_type_invalid(
            name,
            format!(
                "is a {} collection, expected a {} collection",
                info.kind.as_str(),
                expected.as_str()
            ),
        ));
    }
    Ok(())
}

fn graph_scopes(
    catalog: &dyn Catalog,
    graph: &GraphDefinition,
    direction: Direction,
) -> TraversalResult<Vec<EdgeScope>> {
    if graph.edge_definitions.is_empty() {
        return Err(TraversalError::GraphEmpty {
            name: graph.name.clone(),
        });
    }

    let mut scopes: Vec<EdgeScope> = Vec::new();
    for collection in graph.edge_collections() {
        require_kind(catalog, collection, CollectionKind::Edge)?;
        if !scopes.iter().any(|s| s.collection == collection) {
            scopes.push(EdgeScope {
                collection: collection.to_string(),
                direction,
            });
        }
    }
    Ok(scopes)
}

fn anonymous_scopes(
    catalog: &dyn Catalog,
    specs: &[EdgeCollectionSpec],
    default_direction: Direction,
) -> TraversalResult<Vec<EdgeScope>> {
    let mut scopes: Vec<EdgeScope> = Vec::with_capacity(specs.len());
    for spec in specs {
        require_kind(catalog, &spec.name, CollectionKind::Edge)?;
        let direction = spec.direction.unwrap_or(default_direction);

        match scopes.iter().find(|s| s.collection == spec.name) {
            Some(existing) if existing.direction != direction => {
                return Err(TraversalError::collection_type_invalid(
                    &spec.name,
                    "is used multiple times with conflicting directions",
                ));
            }
            Some(_) => {}
            None => scopes.push(EdgeScope {
                collection: spec.name.clone(),
                direction,
            }),
        }
    }
    Ok(scopes)
}

//! Traversal options
//!
//! Depth bounds, direction, expansion order, uniqueness and collection
//! restrictions for a single traversal. Options arrive as an `OPTIONS {..}`
//! object in the query and are validated here before any expansion.

use crate::config::EngineConfig;
use crate::error::{TraversalError, TraversalResult};
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Edge direction relative to the current vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Follow `_from → _to`
    Outbound,
    /// Follow `_to → _from`
    Inbound,
    /// Follow both
    Any,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outbound => "OUTBOUND",
            Self::Inbound => "INBOUND",
            Self::Any => "ANY",
        }
    }
}

/// Uniqueness scope for vertices or edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Uniqueness {
    /// No uniqueness check
    None,
    /// Unique within one path (cycle avoidance)
    Path,
    /// Unique across the whole traversal
    Global,
}

impl Uniqueness {
    fn parse(option: &str, value: &Value) -> TraversalResult<Self> {
        match value.as_str() {
            Some("none") => Ok(Self::None),
            Some("path") => Ok(Self::Path),
            Some("global") => Ok(Self::Global),
            _ => Err(TraversalError::bad_parameter(format!(
                "option '{}' must be one of \"none\", \"path\", \"global\"",
                option
            ))),
        }
    }
}

/// Fully resolved options of one traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalOptions {
    pub min_depth: u64,
    pub max_depth: u64,
    /// Breadth-first (`true`) or depth-first order
    pub bfs: bool,
    pub unique_vertices: Uniqueness,
    pub unique_edges: Uniqueness,
    /// Allowed vertex collections (empty = unrestricted)
    pub vertex_collections: Vec<String>,
    /// Allowed edge collections (empty = unrestricted)
    pub edge_collections: Vec<String>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            min_depth: 1,
            max_depth: 1,
            bfs: false,
            unique_vertices: Uniqueness::Path,
            unique_edges: Uniqueness::Path,
            vertex_collections: Vec::new(),
            edge_collections: Vec::new(),
        }
    }
}

impl TraversalOptions {
    /// Options with explicit depth bounds and engine defaults otherwise
    pub fn with_depth(min_depth: u64, max_depth: u64, config: &EngineConfig) -> Self {
        Self {
            min_depth,
            max_depth,
            bfs: config.default_bfs,
            ..Self::default()
        }
    }

    /// Apply an `OPTIONS { ... }` object
    ///
    /// Unknown keys are ignored with a warning; wrongly typed values are
    /// rejected.
    pub fn apply_object(&mut self, options: &Value) -> TraversalResult<()> {
        let pairs = match options {
            Value::Object(pairs) => pairs,
            Value::Null => return Ok(()),
            other => {
                return Err(TraversalError::bad_parameter(format!(
                    "traversal OPTIONS must be an object, got {}",
                    other.type_name()
                )))
            }
        };

        for (key, value) in pairs {
            match key.as_str() {
                "bfs" => {
                    self.bfs = value.as_bool().ok_or_else(|| {
                        TraversalError::bad_parameter("option 'bfs' must be a boolean")
                    })?;
                }
                "uniqueVertices" => self.unique_vertices = Uniqueness::parse(key, value)?,
                "uniqueEdges" => self.unique_edges = Uniqueness::parse(key, value)?,
                "vertexCollections" => self.vertex_collections = collection_names(key, value)?,
                "edgeCollections" => self.edge_collections = collection_names(key, value)?,
                other => warn!(option = other, "ignoring unknown traversal option"),
            }
        }
        Ok(())
    }

    /// Check option combinations and engine limits
    pub fn validate(&self, config: &EngineConfig) -> TraversalResult<()> {
        if self.min_depth > self.max_depth {
            return Err(TraversalError::bad_parameter(format!(
                "minimum depth {} exceeds maximum depth {}",
                self.min_depth, self.max_depth
            )));
        }
        if self.max_depth > config.max_traversal_depth {
            return Err(TraversalError::MaxDepthExceeded {
                limit: config.max_traversal_depth,
                actual: self.max_depth,
            });
        }
        if self.unique_vertices == Uniqueness::Global && !self.bfs {
            return Err(TraversalError::bad_parameter(
                "uniqueVertices: 'global' is only supported with bfs: true",
            ));
        }
        if self.unique_edges == Uniqueness::Global {
            return Err(TraversalError::bad_parameter(
                "uniqueEdges: 'global' is not supported",
            ));
        }
        Ok(())
    }
}

fn collection_names(option: &str, value: &Value) -> TraversalResult<Vec<String>> {
    let invalid = || {
        TraversalError::bad_parameter(format!(
            "option '{}' must be a collection name or an array of names",
            option
        ))
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(name) => Ok(vec![name.to_string()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(json: serde_json::Value) -> TraversalResult<TraversalOptions> {
        let mut opts = TraversalOptions::default();
        opts.apply_object(&Value::from(json))?;
        Ok(opts)
    }

    #[test]
    fn test_defaults() {
        let opts = TraversalOptions::default();
        assert_eq!((opts.min_depth, opts.max_depth), (1, 1));
        assert_eq!(opts.unique_vertices, Uniqueness::Path);
        assert_eq!(opts.unique_edges, Uniqueness::Path);
        assert!(opts.vertex_collections.is_empty());
        assert!(opts.validate(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_apply_object() {
        let opts = options(serde_json::json!({
            "bfs": true,
            "uniqueVertices": "global",
            "uniqueEdges": "none",
            "vertexCollections": ["v1", "v2"],
            "edgeCollections": "e"
        }))
        .unwrap();
        assert!(opts.bfs);
        assert_eq!(opts.unique_vertices, Uniqueness::Global);
        assert_eq!(opts.unique_edges, Uniqueness::None);
        assert_eq!(opts.vertex_collections, vec!["v1", "v2"]);
        assert_eq!(opts.edge_collections, vec!["e"]);
    }

    #[test]
    fn test_unknown_option_ignored() {
        let opts = options(serde_json::json!({"weightAttribute": "w"})).unwrap();
        assert_eq!(opts, TraversalOptions::default());
    }

    #[test]
    fn test_wrong_types_rejected() {
        assert_eq!(options(serde_json::json!({"bfs": "yes"})).unwrap_err().code(), 10);
        assert_eq!(
            options(serde_json::json!({"uniqueVertices": "sometimes"})).unwrap_err().code(),
            10
        );
        assert_eq!(
            options(serde_json::json!({"vertexCollections": [1]})).unwrap_err().code(),
            10
        );
    }

    #[test]
    fn test_global_uniqueness_rules() {
        let config = EngineConfig::default();

        let dfs_global = options(serde_json::json!({"uniqueVertices": "global"})).unwrap();
        assert!(matches!(
            dfs_global.validate(&config),
            Err(TraversalError::BadParameter { .. })
        ));

        let bfs_global =
            options(serde_json::json!({"uniqueVertices": "global", "bfs": true})).unwrap();
        assert!(bfs_global.validate(&config).is_ok());

        let edges_global = options(serde_json::json!({"uniqueEdges": "global"})).unwrap();
        assert!(matches!(
            edges_global.validate(&config),
            Err(TraversalError::BadParameter { .. })
        ));
    }

    #[test]
    fn test_depth_validation() {
        let config = EngineConfig {
            max_traversal_depth: 10,
            ..EngineConfig::default()
        };
        let inverted = TraversalOptions::with_depth(3, 2, &config);
        assert!(matches!(
            inverted.validate(&config),
            Err(TraversalError::BadParameter { .. })
        ));

        let too_deep = TraversalOptions::with_depth(1, 11, &config);
        assert!(matches!(
            too_deep.validate(&config),
            Err(TraversalError::MaxDepthExceeded { limit: 10, actual: 11 })
        ));
    }
}

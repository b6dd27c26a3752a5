//! Engine configuration
//!
//! Defaults are tuned for interactive queries. Every field can be
//! overridden from the environment:
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `TRELLIS_MAX_TRAVERSAL_DEPTH` | `max_traversal_depth` | 1024 |
//! | `TRELLIS_OPTIMIZE_TRAVERSALS` | `optimize_traversals` | true |
//! | `TRELLIS_PARALLEL_START_VERTICES` | `parallel_start_vertices` | true |
//! | `TRELLIS_DEFAULT_BFS` | `default_bfs` | false |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default upper bound for `maxDepth` (DoS protection)
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: u64 = 1024;

/// Engine-wide settings shared by all queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest `maxDepth` a traversal may request
    pub max_traversal_depth: u64,

    /// Extract per-depth conditions from FILTERs and prune during expansion
    pub optimize_traversals: bool,

    /// Run traversals for different start vertices of an outer loop on the
    /// rayon pool (only when the query has no LIMIT)
    pub parallel_start_vertices: bool,

    /// Breadth-first order when a query does not set `bfs`
    pub default_bfs: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
            optimize_traversals: true,
            parallel_start_vertices: true,
            default_bfs: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `TRELLIS_*` environment variables
    ///
    /// Unset variables keep their defaults; unparsable values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_traversal_depth: env_parse("TRELLIS_MAX_TRAVERSAL_DEPTH")
                .unwrap_or(defaults.max_traversal_depth),
            optimize_traversals: env_parse("TRELLIS_OPTIMIZE_TRAVERSALS")
                .unwrap_or(defaults.optimize_traversals),
            parallel_start_vertices: env_parse("TRELLIS_PARALLEL_START_VERTICES")
                .unwrap_or(defaults.parallel_start_vertices),
            default_bfs: env_parse("TRELLIS_DEFAULT_BFS").unwrap_or(defaults.default_bfs),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_traversal_depth == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_traversal_depth",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

/// Per-query overrides of [`EngineConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Override `optimize_traversals` for this query
    pub optimize: Option<bool>,
}

impl QueryOptions {
    /// Disable traversal condition extraction for this query
    pub fn unoptimized() -> Self {
        Self {
            optimize: Some(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.optimize_traversals);
        assert!(!config.default_bfs);
    }

    #[test]
    fn test_zero_depth_limit_rejected() {
        let config = EngineConfig {
            max_traversal_depth: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "max_traversal_depth",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"default_bfs": true}"#).unwrap();
        assert!(config.default_bfs);
        assert_eq!(config.max_traversal_depth, DEFAULT_MAX_TRAVERSAL_DEPTH);
    }

    #[test]
    fn test_unoptimized_query_options() {
        assert_eq!(QueryOptions::unoptimized().optimize, Some(false));
        assert_eq!(QueryOptions::default().optimize, None);
    }
}

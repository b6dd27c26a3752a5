//! Execution context, row layout and variable bindings

use crate::config::EngineConfig;
use crate::graph::traversal::TraversalStats;
use crate::storage::{Catalog, GraphProvider};
use crate::types::value::Value;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One row of variable values, indexed by [`VariableLayout`] slot
///
/// Queries bind at most four variables (outer loop, `v`, `e`, `p`), so rows
/// stay inline.
pub type Row = SmallVec<[Value; 4]>;

/// Maps variable names to row slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableLayout {
    names: Vec<String>,
    slots: FxHashMap<String, usize>,
}

impl VariableLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next slot to `name` (existing names keep their slot)
    pub fn add(&mut self, name: &str) -> usize {
        if let Some(&slot) = self.slots.get(name) {
            return slot;
        }
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.slots.insert(name.to_string(), slot);
        slot
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Variable names in slot order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// A row of nulls matching this layout
    pub fn empty_row(&self) -> Row {
        std::iter::repeat(Value::Null).take(self.len()).collect()
    }
}

/// Variable names bound by one traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalVariables {
    pub vertex: String,
    pub edge: Option<String>,
    pub path: Option<String>,
}

impl TraversalVariables {
    pub fn is_path(&self, name: &str) -> bool {
        self.path.as_deref() == Some(name)
    }
}

/// Which traversal outputs are materialized into rows
///
/// Disabled outputs are bound to null. Expansion is not affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputToggles {
    pub vertex: bool,
    pub edge: bool,
    pub path: bool,
}

impl OutputToggles {
    pub fn all() -> Self {
        Self {
            vertex: true,
            edge: true,
            path: true,
        }
    }
}

/// Context for query execution
///
/// Borrowed data sources plus counters that parallel traversals merge into.
pub struct ExecutionContext<'a> {
    /// Vertex and edge reads
    pub provider: &'a dyn GraphProvider,
    /// Collection and graph metadata
    pub catalog: &'a dyn Catalog,
    pub config: &'a EngineConfig,
    traversal_stats: Mutex<TraversalStats>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        provider: &'a dyn GraphProvider,
        catalog: &'a dyn Catalog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            provider,
            catalog,
            config,
            traversal_stats: Mutex::new(TraversalStats::default()),
        }
    }

    /// Add the counters of a finished (or abandoned) traversal
    pub fn record_traversal(&self, stats: &TraversalStats) {
        self.traversal_stats.lock().merge(stats);
    }

    /// Counters of all traversals run so far
    pub fn traversal_stats(&self) -> TraversalStats {
        *self.traversal_stats.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_assigns_slots_in_order() {
        let mut layout = VariableLayout::new();
        assert_eq!(layout.add("s"), 0);
        assert_eq!(layout.add("v"), 1);
        assert_eq!(layout.add("s"), 0);
        assert_eq!(layout.slot("v"), Some(1));
        assert_eq!(layout.slot("p"), None);
        assert_eq!(layout.names(), &["s".to_string(), "v".to_string()]);
    }

    #[test]
    fn test_empty_row_matches_layout() {
        let mut layout = VariableLayout::new();
        layout.add("v");
        layout.add("e");
        let row = layout.empty_row();
        assert_eq!(row.len(), 2);
        assert!(row.iter().all(Value::is_null));
    }

    #[test]
    fn test_traversal_variables() {
        let vars = TraversalVariables {
            vertex: "v".into(),
            edge: None,
            path: Some("p".into()),
        };
        assert!(vars.is_path("p"));
        assert!(!vars.is_path("v"));
    }
}

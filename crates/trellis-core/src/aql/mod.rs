//! AQL graph traversal queries
//!
//! Supports the traversal subset of AQL: an optional outer `FOR` loop, one
//! `FOR v, e, p IN min..max DIR start ...` traversal, then `FILTER`,
//! `SORT`, `LIMIT` and `RETURN`.
//!
//! # Architecture
//!
//! ```text
//! Query String
//!     │
//!     ▼
//! ┌─────────────┐
//! │   Parser    │  pest grammar → AST
//! └─────────────┘
//!     │
//!     ▼
//! ┌─────────────┐
//! │  Planner    │  bind parameters, scoping, functions → LogicalOp tree
//! └─────────────┘
//!     │  optimizer: FILTER → per-depth and per-hop checks
//!     ▼
//! ┌─────────────┐
//! │  Executor   │  lazy row streams over the traversal engine
//! └─────────────┘
//!     │
//!     ▼
//!   Results
//! ```
//!
//! # Example
//!
//! ```ignore
//! use trellis_core::aql::{BindVars, DefaultQueryHandler, QueryHandler};
//! use trellis_core::QueryOptions;
//!
//! let handler = DefaultQueryHandler::new();
//! let result = handler.query(
//!     "FOR v, e, p IN 1..3 OUTBOUND 'persons/alice' GRAPH 'social'
//!        FILTER p.edges[*].since ALL < 2020
//!        RETURN v.name",
//!     &BindVars::default(),
//!     &QueryOptions::default(),
//!     &graph,
//!     &graph,
//! )?;
//! ```

pub mod ast;
pub mod executor;
pub mod functions;
pub mod handler;
pub mod optimizer;
pub mod parser;
pub mod planner;

// Re-export commonly used types
pub use ast::{BinaryOp, Expr, Quantifier, Query, UnaryOp};
pub use executor::{ExecutionContext, QueryExecutor, QueryResult, QueryStats};
pub use functions::{FunctionDef, FunctionRegistry, FunctionTable};
pub use handler::{DefaultQueryHandler, QueryHandler};
pub use optimizer::{ConditionExtractor, Extraction, TraversalConditions};
pub use parser::AqlParser;
pub use planner::{BindVars, LogicalOp, QueryPlan, QueryPlanner, TraversalNode};

//! AQL query handler - main entry point for query execution
//!
//! The handler wires parsing, planning and execution together and owns
//! the engine configuration and function registry.

use crate::aql::ast::Query;
use crate::aql::executor::{ExecutionContext, QueryExecutor, QueryResult};
use crate::aql::functions::FunctionRegistry;
use crate::aql::parser::AqlParser;
use crate::aql::planner::{BindVars, QueryPlan, QueryPlanner};
use crate::config::{EngineConfig, QueryOptions};
use crate::error::TraversalResult;
use crate::storage::{Catalog, GraphProvider};
use std::sync::Arc;
use tracing::debug;

/// Core query handler trait
///
/// Implement this trait to customize the query pipeline.
pub trait QueryHandler: Send + Sync {
    /// Parse an AQL query string into an AST
    fn parse(&self, query: &str) -> TraversalResult<Query>;

    /// Plan a parsed query
    fn plan(&self, query: &Query, bind_vars: &BindVars, options: &QueryOptions) -> TraversalResult<QueryPlan>;

    /// Execute a plan against a graph
    fn execute(
        &self,
        plan: &QueryPlan,
        provider: &dyn GraphProvider,
        catalog: &dyn Catalog,
    ) -> TraversalResult<QueryResult>;

    /// Convenience method: parse, plan, and execute a query
    fn query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        options: &QueryOptions,
        provider: &dyn GraphProvider,
        catalog: &dyn Catalog,
    ) -> TraversalResult<QueryResult> {
        let parsed = self.parse(query)?;
        let plan = self.plan(&parsed, bind_vars, options)?;
        self.execute(&plan, provider, catalog)
    }
}

/// Default AQL handler implementation
///
/// # Example
///
/// ```ignore
/// use trellis_core::aql::{BindVars, DefaultQueryHandler, QueryHandler};
/// use trellis_core::QueryOptions;
///
/// let handler = DefaultQueryHandler::new();
/// let result = handler.query(
///     "FOR v IN 1..2 OUTBOUND 'persons/alice' knows RETURN v.name",
///     &BindVars::default(),
///     &QueryOptions::default(),
///     &graph,
///     &graph,
/// )?;
/// ```
pub struct DefaultQueryHandler {
    config: EngineConfig,
    functions: Arc<FunctionRegistry>,
    parser: AqlParser,
    executor: QueryExecutor,
}

impl Default for DefaultQueryHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultQueryHandler {
    /// Create a handler with the default configuration and built-in functions
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(config, Arc::new(FunctionRegistry::init()))
    }

    /// Create a handler sharing a function registry
    pub fn with_registry(config: EngineConfig, functions: Arc<FunctionRegistry>) -> Self {
        Self {
            config,
            functions,
            parser: AqlParser::new(),
            executor: QueryExecutor::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The function registry; `reload()` on it affects queries planned later
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Validate a query without executing it
    ///
    /// Returns the plan if the query is valid.
    pub fn validate(&self, query: &str, bind_vars: &BindVars) -> TraversalResult<QueryPlan> {
        let parsed = self.parser.parse(query)?;
        self.plan(&parsed, bind_vars, &QueryOptions::default())
    }

    /// Explain a query plan
    ///
    /// Returns a human-readable description of the plan.
    pub fn explain(&self, query: &str, bind_vars: &BindVars, options: &QueryOptions) -> TraversalResult<String> {
        let parsed = self.parser.parse(query)?;
        let plan = self.plan(&parsed, bind_vars, options)?;
        Ok(plan.explain())
    }
}

impl QueryHandler for DefaultQueryHandler {
    fn parse(&self, query: &str) -> TraversalResult<Query> {
        self.parser.parse(query)
    }

    fn plan(&self, query: &Query, bind_vars: &BindVars, options: &QueryOptions) -> TraversalResult<QueryPlan> {
        let plan = QueryPlanner::new(&self.config, &self.functions).plan(query, bind_vars, options)?;
        debug!(statically_empty = plan.root.is_statically_empty(), "query planned");
        Ok(plan)
    }

    fn execute(
        &self,
        plan: &QueryPlan,
        provider: &dyn GraphProvider,
        catalog: &dyn Catalog,
    ) -> TraversalResult<QueryResult> {
        let ctx = ExecutionContext::new(provider, catalog, &self.config);
        self.executor.execute(plan, &ctx)
    }
}

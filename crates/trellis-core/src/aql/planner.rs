//! Query planner - converts the AQL AST into a logical plan
//!
//! Planning resolves everything that does not depend on graph data:
//!
//! - bind parameters are substituted (`@value`, `@@collection`, depth bounds)
//! - variables and function names are checked, functions are resolved once
//!   into the plan's [`FunctionTable`]
//! - `OPTIONS` are evaluated and validated
//! - FILTER clauses are split by the [`ConditionExtractor`] into traversal
//!   conditions and residual post-filters
//! - traversal outputs nobody reads are switched off
//!
//! Collection names are validated later, at traversal setup, because that
//! needs the catalog.

use crate::aql::ast::{
    Accessor, Expr, IntegerRef, NameRef, Operation, Query, SortItem, SourceClause,
};
use crate::aql::executor::context::{OutputToggles, TraversalVariables, VariableLayout};
use crate::aql::executor::evaluation::Evaluator;
use crate::aql::functions::{FunctionRegistry, FunctionTable};
use crate::aql::optimizer::{ConditionExtractor, Extraction, TraversalConditions};
use crate::config::{EngineConfig, QueryOptions};
use crate::error::{TraversalError, TraversalResult};
use crate::graph::filter::{EdgeCollectionSpec, TraversalSource};
use crate::graph::options::{Direction, TraversalOptions};
use crate::types::value::Value;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::debug;

/// Bind parameter values by name (collection parameters keep one `@`)
pub type BindVars = FxHashMap<String, Value>;

/// Everything the executor needs to run one traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalNode {
    pub variables: TraversalVariables,
    pub direction: Direction,
    /// Start vertex: an id string or a document with `_id`
    pub start: Expr,
    pub source: TraversalSource,
    /// Depth bounds, order, uniqueness and restriction sets
    pub options: TraversalOptions,
    pub conditions: TraversalConditions,
    pub prune: Option<Expr>,
    pub outputs: OutputToggles,
}

/// Logical operation in the query plan
///
/// Every operation except the leaves wraps its input, so the tree reads
/// from the RETURN at the root down to the row source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// One empty row
    SingleRow,

    /// Zero rows; replaces a traversal that can never produce results
    NoResults,

    /// `FOR x IN <array>`
    Enumerate {
        input: Box<LogicalOp>,
        variable: String,
        expr: Expr,
    },

    /// Graph traversal, one walk per input row
    Traversal {
        input: Box<LogicalOp>,
        node: Box<TraversalNode>,
    },

    /// Filter rows based on a predicate
    Filter {
        input: Box<LogicalOp>,
        predicate: Expr,
    },

    /// Stable sort on one or more keys
    Sort {
        input: Box<LogicalOp>,
        items: Vec<SortItem>,
    },

    /// Skip `offset` rows, then pass at most `count`
    Limit {
        input: Box<LogicalOp>,
        offset: u64,
        count: u64,
    },

    /// Produce one value per row
    Return {
        input: Box<LogicalOp>,
        expr: Expr,
        distinct: bool,
    },
}

impl LogicalOp {
    /// Whether a LIMIT appears anywhere in this subtree
    pub fn has_limit(&self) -> bool {
        match self {
            LogicalOp::Limit { .. } => true,
            LogicalOp::SingleRow | LogicalOp::NoResults => false,
            LogicalOp::Enumerate { input, .. }
            | LogicalOp::Traversal { input, .. }
            | LogicalOp::Filter { input, .. }
            | LogicalOp::Sort { input, .. }
            | LogicalOp::Return { input, .. } => input.has_limit(),
        }
    }

    /// The traversal node, if the plan still has one
    pub fn traversal(&self) -> Option<&TraversalNode> {
        match self {
            LogicalOp::Traversal { node, .. } => Some(node),
            LogicalOp::SingleRow | LogicalOp::NoResults => None,
            LogicalOp::Enumerate { input, .. }
            | LogicalOp::Filter { input, .. }
            | LogicalOp::Sort { input, .. }
            | LogicalOp::Limit { input, .. }
            | LogicalOp::Return { input, .. } => input.traversal(),
        }
    }

    /// Whether the plan degenerated to a zero-row producer
    pub fn is_statically_empty(&self) -> bool {
        match self {
            LogicalOp::NoResults => true,
            LogicalOp::SingleRow | LogicalOp::Traversal { .. } => false,
            LogicalOp::Enumerate { input, .. }
            | LogicalOp::Filter { input, .. }
            | LogicalOp::Sort { input, .. }
            | LogicalOp::Limit { input, .. }
            | LogicalOp::Return { input, .. } => input.is_statically_empty(),
        }
    }
}

/// A planned query, ready to execute
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub root: LogicalOp,
    /// Row slots of all variables
    pub layout: VariableLayout,
    /// Functions resolved at plan time
    pub functions: FunctionTable,
    /// Collections declared with `WITH`
    pub with_collections: Vec<String>,
}

impl QueryPlan {
    /// Readable rendering of the plan, root first
    pub fn explain(&self) -> String {
        format_op(&self.root, 0)
    }
}

/// Query planner
pub struct QueryPlanner<'a> {
    config: &'a EngineConfig,
    registry: &'a FunctionRegistry,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(config: &'a EngineConfig, registry: &'a FunctionRegistry) -> Self {
        Self { config, registry }
    }

    /// Plan a parsed query
    pub fn plan(
        &self,
        query: &Query,
        bind_vars: &BindVars,
        options: &QueryOptions,
    ) -> TraversalResult<QueryPlan> {
        let binder = Binder { bind_vars };
        let traversal = &query.traversal;

        // Variables: outer loop first, then v, e, p
        let mut layout = VariableLayout::new();
        let outer_var = query.outer_loop.as_ref().map(|outer| outer.variable.as_str());
        for name in outer_var.into_iter().chain(traversal.variables()) {
            if layout.contains(name) {
                return Err(TraversalError::bad_parameter(format!(
                    "variable '{}' is assigned multiple times",
                    name
                )));
            }
            layout.add(name);
        }
        let variables = TraversalVariables {
            vertex: traversal.vertex_var.clone(),
            edge: traversal.edge_var.clone(),
            path: traversal.path_var.clone(),
        };

        let outer = match &query.outer_loop {
            Some(outer) => Some((outer.variable.clone(), binder.expr(&outer.expr)?)),
            None => None,
        };
        let start = binder.expr(&traversal.start)?;
        let prune = traversal.prune.as_ref().map(|e| binder.expr(e)).transpose()?;
        let options_expr = traversal.options.as_ref().map(|e| binder.expr(e)).transpose()?;
        let operations = query
            .operations
            .iter()
            .map(|op| binder.operation(op))
            .collect::<TraversalResult<Vec<_>>>()?;
        let return_expr = binder.expr(&query.return_clause.expr)?;

        // Scope checks
        let all_vars: Vec<&str> = layout.names().iter().map(String::as_str).collect();
        if let Some((_, expr)) = &outer {
            check_variables(expr, &[])?;
        }
        check_variables(&start, &outer_var.into_iter().collect::<Vec<_>>())?;
        for expr in prune.iter().chain(options_expr.iter()) {
            check_variables(expr, &all_vars)?;
        }
        for op in &operations {
            for expr in operation_exprs(op) {
                check_variables(expr, &all_vars)?;
            }
        }
        check_variables(&return_expr, &all_vars)?;

        // Functions
        let mut functions = FunctionTable::default();
        {
            let mut resolve = |expr: &Expr| self.resolve_functions(expr, &mut functions);
            if let Some((_, expr)) = &outer {
                resolve(expr)?;
            }
            resolve(&start)?;
            for expr in prune.iter().chain(options_expr.iter()) {
                resolve(expr)?;
            }
            for op in &operations {
                for expr in operation_exprs(op) {
                    resolve(expr)?;
                }
            }
            resolve(&return_expr)?;
        }

        // Traversal options
        let min_depth = binder.integer(&traversal.min_depth)?;
        let max_depth = binder.integer(&traversal.max_depth)?;
        let mut traversal_options = TraversalOptions::with_depth(min_depth, max_depth, self.config);
        if let Some(expr) = &options_expr {
            let value = constant(expr, &functions).map_err(|_| {
                TraversalError::bad_parameter("traversal OPTIONS must be a constant object")
            })?;
            traversal_options.apply_object(&value)?;
        }
        traversal_options.validate(self.config)?;

        let source = match &traversal.source {
            SourceClause::Graph(name) => TraversalSource::Graph(binder.name(name)?),
            SourceClause::EdgeCollections(clauses) => TraversalSource::EdgeCollections(
                clauses
                    .iter()
                    .map(|clause| {
                        Ok(EdgeCollectionSpec {
                            name: binder.name(&clause.name)?,
                            direction: clause.direction,
                        })
                    })
                    .collect::<TraversalResult<Vec<_>>>()?,
            ),
        };

        // Condition extraction
        let optimize = options.optimize.unwrap_or(self.config.optimize_traversals);
        let (extraction, operations) = if optimize {
            let (candidates, rest) = split_candidate_filters(operations);
            let extraction =
                ConditionExtractor::new(traversal.path_var.as_deref(), max_depth, &functions)
                    .extract(candidates);
            (extraction, rest)
        } else {
            (Extraction::default(), operations)
        };
        let residual = Expr::conjunction(extraction.residual);

        let outputs = if optimize {
            let mut readers: Vec<&Expr> = residual.iter().collect();
            readers.extend(operations.iter().flat_map(operation_exprs));
            readers.push(&return_expr);
            let used = |name: Option<&str>| {
                name.map_or(false, |name| readers.iter().any(|expr| expr.references(name)))
            };
            OutputToggles {
                vertex: used(Some(traversal.vertex_var.as_str())),
                edge: used(traversal.edge_var.as_deref()),
                path: used(traversal.path_var.as_deref()),
            }
        } else {
            OutputToggles::all()
        };

        // Assemble bottom-up
        let mut root = LogicalOp::SingleRow;
        if let Some((variable, expr)) = outer {
            root = LogicalOp::Enumerate {
                input: Box::new(root),
                variable,
                expr,
            };
        }
        root = if extraction.statically_empty {
            debug!("traversal can never match, planning no results");
            LogicalOp::NoResults
        } else {
            LogicalOp::Traversal {
                input: Box::new(root),
                node: Box::new(TraversalNode {
                    variables,
                    direction: traversal.direction,
                    start,
                    source,
                    options: traversal_options,
                    conditions: extraction.conditions,
                    prune,
                    outputs,
                }),
            }
        };
        if let Some(predicate) = residual {
            root = LogicalOp::Filter {
                input: Box::new(root),
                predicate,
            };
        }
        for op in operations {
            root = match op {
                Operation::Filter(predicate) => LogicalOp::Filter {
                    input: Box::new(root),
                    predicate,
                },
                Operation::Sort(items) => LogicalOp::Sort {
                    input: Box::new(root),
                    items,
                },
                Operation::Limit { offset, count } => LogicalOp::Limit {
                    input: Box::new(root),
                    offset: binder.integer(&offset)?,
                    count: binder.integer(&count)?,
                },
            };
        }
        root = LogicalOp::Return {
            input: Box::new(root),
            expr: return_expr,
            distinct: query.return_clause.distinct,
        };

        let with_collections = query
            .with_collections
            .iter()
            .map(|name| binder.name(name))
            .collect::<TraversalResult<Vec<_>>>()?;

        Ok(QueryPlan {
            root,
            layout,
            functions,
            with_collections,
        })
    }

    fn resolve_functions(&self, expr: &Expr, table: &mut FunctionTable) -> TraversalResult<()> {
        let mut result = Ok(());
        expr.walk(&mut |e| {
            if result.is_err() {
                return;
            }
            if let Expr::FunctionCall { name, args } = e {
                result = match self.registry.lookup(name) {
                    Some(function) => function.check_arity(args.len()).map(|_| {
                        table.insert(name.clone(), function);
                    }),
                    None => Err(TraversalError::FunctionNameUnknown { name: name.clone() }),
                };
            }
        });
        result
    }
}

/// Substitutes bind parameters
struct Binder<'b> {
    bind_vars: &'b BindVars,
}

impl Binder<'_> {
    fn value(&self, name: &str) -> TraversalResult<&Value> {
        self.bind_vars
            .get(name)
            .ok_or_else(|| TraversalError::BindParameterMissing {
                name: name.to_string(),
            })
    }

    fn integer(&self, reference: &IntegerRef) -> TraversalResult<u64> {
        match reference {
            IntegerRef::Literal(value) => Ok(*value),
            IntegerRef::Parameter(name) => {
                let value = self.value(name)?;
                match value {
                    Value::Int(i) if *i >= 0 => Ok(*i as u64),
                    Value::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Ok(*f as u64),
                    other => Err(TraversalError::bad_parameter(format!(
                        "bind parameter '{}' must be a non-negative integer, got {}",
                        name,
                        other.type_name()
                    ))),
                }
            }
        }
    }

    fn name(&self, reference: &NameRef) -> TraversalResult<String> {
        match reference {
            NameRef::Literal(name) => Ok(name.clone()),
            NameRef::Parameter(name) => self
                .value(name)?
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    TraversalError::bad_parameter(format!(
                        "bind parameter '{}' must be a collection or graph name",
                        name
                    ))
                }),
        }
    }

    fn operation(&self, op: &Operation) -> TraversalResult<Operation> {
        Ok(match op {
            Operation::Filter(expr) => Operation::Filter(self.expr(expr)?),
            Operation::Sort(items) => Operation::Sort(
                items
                    .iter()
                    .map(|item| {
                        Ok(SortItem {
                            expr: self.expr(&item.expr)?,
                            ascending: item.ascending,
                        })
                    })
                    .collect::<TraversalResult<Vec<_>>>()?,
            ),
            Operation::Limit { offset, count } => Operation::Limit {
                offset: IntegerRef::Literal(self.integer(offset)?),
                count: IntegerRef::Literal(self.integer(count)?),
            },
        })
    }

    fn expr(&self, expr: &Expr) -> TraversalResult<Expr> {
        let boxed = |e: &Expr| self.expr(e).map(Box::new);
        Ok(match expr {
            Expr::Parameter(name) => Expr::Literal(self.value(name)?.clone()),
            Expr::Literal(_) | Expr::Variable(_) => expr.clone(),
            Expr::Attribute { expr, name } => Expr::Attribute {
                expr: boxed(expr)?,
                name: name.clone(),
            },
            Expr::Index { expr, index } => Expr::Index {
                expr: boxed(expr)?,
                index: boxed(index)?,
            },
            Expr::Expansion { expr, projection } => Expr::Expansion {
                expr: boxed(expr)?,
                projection: projection
                    .iter()
                    .map(|accessor| match accessor {
                        Accessor::Index(index) => self.expr(index).map(Accessor::Index),
                        Accessor::Attribute(name) => Ok(Accessor::Attribute(name.clone())),
                    })
                    .collect::<TraversalResult<Vec<_>>>()?,
            },
            Expr::Array(items) => Expr::Array(
                items
                    .iter()
                    .map(|item| self.expr(item))
                    .collect::<TraversalResult<Vec<_>>>()?,
            ),
            Expr::Object(entries) => Expr::Object(
                entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.expr(value)?)))
                    .collect::<TraversalResult<Vec<_>>>()?,
            ),
            Expr::Binary { left, op, right } => Expr::Binary {
                left: boxed(left)?,
                op: *op,
                right: boxed(right)?,
            },
            Expr::Unary { op, expr } => Expr::Unary {
                op: *op,
                expr: boxed(expr)?,
            },
            Expr::Quantified {
                quantifier,
                left,
                op,
                right,
            } => Expr::Quantified {
                quantifier: *quantifier,
                left: boxed(left)?,
                op: *op,
                right: boxed(right)?,
            },
            Expr::FunctionCall { name, args } => Expr::FunctionCall {
                name: name.clone(),
                args: args
                    .iter()
                    .map(|arg| self.expr(arg))
                    .collect::<TraversalResult<Vec<_>>>()?,
            },
        })
    }
}

/// Evaluate a variable-free expression
fn constant(expr: &Expr, functions: &FunctionTable) -> TraversalResult<Value> {
    let layout = VariableLayout::new();
    Evaluator::new(functions, &layout, &[])
        .evaluate(expr)
        .map(Cow::into_owned)
}

fn check_variables(expr: &Expr, scope: &[&str]) -> TraversalResult<()> {
    let mut unknown = None;
    expr.walk(&mut |e| {
        if let Expr::Variable(name) = e {
            if unknown.is_none() && !scope.contains(&name.as_str()) {
                unknown = Some(name.clone());
            }
        }
    });
    match unknown {
        Some(name) => Err(TraversalError::unknown_variable(name)),
        None => Ok(()),
    }
}

fn operation_exprs(op: &Operation) -> Vec<&Expr> {
    match op {
        Operation::Filter(expr) => vec![expr],
        Operation::Sort(items) => items.iter().map(|item| &item.expr).collect(),
        Operation::Limit { .. } => Vec::new(),
    }
}

/// FILTERs before the first LIMIT, and the remaining operations in order
fn split_candidate_filters(operations: Vec<Operation>) -> (Vec<Expr>, Vec<Operation>) {
    let mut candidates = Vec::new();
    let mut rest = Vec::new();
    let mut limited = false;
    for op in operations {
        match op {
            Operation::Filter(expr) if !limited => candidates.push(expr),
            other => {
                limited |= matches!(other, Operation::Limit { .. });
                rest.push(other);
            }
        }
    }
    (candidates, rest)
}

fn format_op(op: &LogicalOp, indent: usize) -> String {
    let prefix = "  ".repeat(indent);
    match op {
        LogicalOp::SingleRow => format!("{}SingleRow\n", prefix),
        LogicalOp::NoResults => format!("{}NoResults\n", prefix),
        LogicalOp::Enumerate {
            input,
            variable,
            expr,
        } => format!(
            "{}Enumerate({} IN {})\n{}",
            prefix,
            variable,
            expr,
            format_op(input, indent + 1)
        ),
        LogicalOp::Traversal { input, node } => format!(
            "{}{}",
            format_traversal(node, &prefix),
            format_op(input, indent + 1)
        ),
        LogicalOp::Filter { input, predicate } => format!(
            "{}Filter({})\n{}",
            prefix,
            predicate,
            format_op(input, indent + 1)
        ),
        LogicalOp::Sort { input, items } => {
            let keys: Vec<String> = items
                .iter()
                .map(|item| format!("{} {}", item.expr, if item.ascending { "ASC" } else { "DESC" }))
                .collect();
            format!(
                "{}Sort({})\n{}",
                prefix,
                keys.join(", "),
                format_op(input, indent + 1)
            )
        }
        LogicalOp::Limit {
            input,
            offset,
            count,
        } => format!(
            "{}Limit({}, {})\n{}",
            prefix,
            offset,
            count,
            format_op(input, indent + 1)
        ),
        LogicalOp::Return {
            input,
            expr,
            distinct,
        } => format!(
            "{}Return({}{})\n{}",
            prefix,
            if *distinct { "DISTINCT " } else { "" },
            expr,
            format_op(input, indent + 1)
        ),
    }
}

fn format_traversal(node: &TraversalNode, prefix: &str) -> String {
    let vars = &node.variables;
    let names: Vec<&str> = std::iter::once(vars.vertex.as_str())
        .chain(vars.edge.as_deref())
        .chain(vars.path.as_deref())
        .collect();
    let source = match &node.source {
        TraversalSource::Graph(name) => format!("GRAPH {:?}", name),
        TraversalSource::EdgeCollections(specs) => specs
            .iter()
            .map(|spec| match spec.direction {
                Some(direction) => format!("{} {}", direction.as_str(), spec.name),
                None => spec.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
    };
    let options = &node.options;

    let mut lines = vec![format!(
        "{}Traversal({} IN {}..{} {} {} {})",
        prefix,
        names.join(", "),
        options.min_depth,
        options.max_depth,
        node.direction.as_str(),
        node.start,
        source
    )];

    let outputs: Vec<&str> = [
        (node.outputs.vertex, "vertex"),
        (node.outputs.edge, "edge"),
        (node.outputs.path, "path"),
    ]
    .into_iter()
    .filter_map(|(enabled, name)| enabled.then_some(name))
    .collect();
    lines.push(format!("{}  outputs: [{}]", prefix, outputs.join(", ")));
    lines.push(format!(
        "{}  options: bfs={} uniqueVertices={:?} uniqueEdges={:?}",
        prefix, options.bfs, options.unique_vertices, options.unique_edges
    ));
    if !options.vertex_collections.is_empty() {
        lines.push(format!("{}  vertexCollections: {:?}", prefix, options.vertex_collections));
    }
    if !options.edge_collections.is_empty() {
        lines.push(format!("{}  edgeCollections: {:?}", prefix, options.edge_collections));
    }
    for check in &node.conditions.depth_checks {
        lines.push(format!("{}  depth {}: {}", prefix, check.depth, check.expr));
    }
    for check in &node.conditions.quantifier_checks {
        lines.push(format!("{}  per hop: {}", prefix, check));
    }
    if let Some(prune) = &node.prune {
        lines.push(format!("{}  prune: {}", prefix, prune));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aql::parser::AqlParser;
    use crate::graph::options::Uniqueness;

    fn plan_with(query: &str, bind_vars: BindVars, options: QueryOptions) -> TraversalResult<QueryPlan> {
        let config = EngineConfig::default();
        let registry = FunctionRegistry::init();
        let query = AqlParser::new().parse(query)?;
        QueryPlanner::new(&config, &registry).plan(&query, &bind_vars, &options)
    }

    fn plan(query: &str) -> TraversalResult<QueryPlan> {
        plan_with(query, BindVars::default(), QueryOptions::default())
    }

    fn bind(pairs: &[(&str, Value)]) -> BindVars {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_plan_shape() {
        let planned = plan(
            "FOR v, e, p IN 1..2 OUTBOUND 'v/A' GRAPH 'g' \
             FILTER p.vertices[1].left == true SORT v._key LIMIT 2 RETURN v._key",
        )
        .unwrap();

        let LogicalOp::Return { input, distinct, .. } = &planned.root else {
            panic!("expected Return at the root");
        };
        assert!(!distinct);
        let LogicalOp::Limit { input, offset: 0, count: 2 } = input.as_ref() else {
            panic!("expected Limit");
        };
        let LogicalOp::Sort { input, .. } = input.as_ref() else {
            panic!("expected Sort");
        };
        let LogicalOp::Traversal { input, node } = input.as_ref() else {
            panic!("extracted filter should leave no Filter node");
        };
        assert_eq!(input.as_ref(), &LogicalOp::SingleRow);
        assert_eq!(node.conditions.depth_checks.len(), 1);
        assert_eq!(node.source, TraversalSource::Graph("g".into()));
        assert!(planned.root.has_limit());
    }

    #[test]
    fn test_output_toggles_follow_usage() {
        let planned = plan("FOR v, e, p IN 1..2 OUTBOUND 'v/A' GRAPH 'g' RETURN v").unwrap();
        let node = planned.root.traversal().unwrap();
        assert_eq!(
            node.outputs,
            OutputToggles {
                vertex: true,
                edge: false,
                path: false
            }
        );

        // Path read only by an extracted condition stays off
        let planned = plan(
            "FOR v, e, p IN 1..2 OUTBOUND 'v/A' GRAPH 'g' \
             FILTER p.edges[0].w > 1 RETURN e",
        )
        .unwrap();
        let node = planned.root.traversal().unwrap();
        assert!(!node.outputs.vertex);
        assert!(node.outputs.edge);
        assert!(!node.outputs.path);
    }

    #[test]
    fn test_unoptimized_keeps_filters_and_outputs() {
        let planned = plan_with(
            "FOR v, e, p IN 1..2 OUTBOUND 'v/A' GRAPH 'g' \
             FILTER p.vertices[1].left == true RETURN v",
            BindVars::default(),
            QueryOptions::unoptimized(),
        )
        .unwrap();
        let node = planned.root.traversal().unwrap();
        assert!(node.conditions.is_empty());
        assert_eq!(node.outputs, OutputToggles::all());
        assert!(planned.explain().contains("Filter(p.vertices[1].left == true)"));
    }

    #[test]
    fn test_filters_after_limit_stay_in_place() {
        let planned = plan(
            "FOR v, e, p IN 1..2 OUTBOUND 'v/A' GRAPH 'g' \
             LIMIT 5 FILTER p.vertices[1].x == 1 RETURN v",
        )
        .unwrap();
        let LogicalOp::Return { input, .. } = &planned.root else {
            panic!("expected Return");
        };
        assert!(matches!(input.as_ref(), LogicalOp::Filter { .. }));
        assert!(planned.root.traversal().unwrap().conditions.is_empty());
    }

    #[test]
    fn test_statically_empty_plan() {
        let planned = plan(
            "FOR v, e, p IN 1..2 OUTBOUND 'v/A' GRAPH 'g' \
             FILTER p.edges[2].foo == true SORT v._key RETURN v",
        )
        .unwrap();
        assert!(planned.root.is_statically_empty());
        assert!(planned.root.traversal().is_none());
        assert!(planned.explain().contains("NoResults"));
    }

    #[test]
    fn test_bind_parameters() {
        let planned = plan_with(
            "FOR v IN @min..@max OUTBOUND @start @@edges FILTER v.x == @x LIMIT @n RETURN v",
            bind(&[
                ("min", Value::Int(1)),
                ("max", Value::Int(3)),
                ("start", Value::string("v/A")),
                ("@edges", Value::string("e")),
                ("x", Value::Int(7)),
                ("n", Value::Int(4)),
            ]),
            QueryOptions::default(),
        )
        .unwrap();
        let node = planned.root.traversal().unwrap();
        assert_eq!((node.options.min_depth, node.options.max_depth), (1, 3));
        assert_eq!(node.start, Expr::literal("v/A"));
        assert_eq!(
            node.source,
            TraversalSource::EdgeCollections(vec![EdgeCollectionSpec::new("e")])
        );
        assert!(planned.explain().contains("v.x == 7"));
        assert!(planned.explain().contains("Limit(0, 4)"));
    }

    #[test]
    fn test_missing_bind_parameter() {
        let err = plan("FOR v IN 1..2 OUTBOUND @start e RETURN v").unwrap_err();
        assert_eq!(err.code(), 1551);
        let err = plan("FOR v IN 1..2 OUTBOUND 'v/A' @@edges RETURN v").unwrap_err();
        assert!(matches!(err, TraversalError::BindParameterMissing { ref name } if name == "@edges"));
    }

    #[test]
    fn test_unknown_variables() {
        assert_eq!(plan("FOR v IN 1..2 OUTBOUND 'v/A' e RETURN w").unwrap_err().code(), 1512);
        // Traversal variables are not visible in the start expression
        assert_eq!(plan("FOR v IN 1..2 OUTBOUND v e RETURN v").unwrap_err().code(), 1512);
        assert!(plan("FOR s IN ['v/A'] FOR v IN 1..2 OUTBOUND s e RETURN [s, v]").is_ok());
    }

    #[test]
    fn test_function_resolution() {
        let planned = plan("FOR v IN 1..2 OUTBOUND 'v/A' e RETURN LENGTH(v)").unwrap();
        assert!(planned.functions.contains_key("LENGTH"));

        let err = plan("FOR v IN 1..2 OUTBOUND 'v/A' e RETURN NOPE(v)").unwrap_err();
        assert_eq!(err.code(), 1540);
        let err = plan("FOR v IN 1..2 OUTBOUND 'v/A' e RETURN LENGTH(v, v)").unwrap_err();
        assert_eq!(err.code(), 1541);
    }

    #[test]
    fn test_options_are_applied_and_validated() {
        let planned = plan(
            "FOR v IN 1..2 OUTBOUND 'v/A' e \
             OPTIONS {bfs: true, uniqueVertices: 'global', vertexCollections: 'v'} RETURN v",
        )
        .unwrap();
        let options = &planned.root.traversal().unwrap().options;
        assert!(options.bfs);
        assert_eq!(options.unique_vertices, Uniqueness::Global);
        assert_eq!(options.vertex_collections, vec!["v".to_string()]);

        let err = plan(
            "FOR v IN 1..2 OUTBOUND 'v/A' e OPTIONS {uniqueVertices: 'global'} RETURN v",
        )
        .unwrap_err();
        assert_eq!(err.code(), 10);
        let err = plan("FOR v IN 3..2 OUTBOUND 'v/A' e RETURN v").unwrap_err();
        assert_eq!(err.code(), 10);
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        assert_eq!(plan("FOR v, v IN 1..2 OUTBOUND 'v/A' e RETURN v").unwrap_err().code(), 10);
    }

    #[test]
    fn test_explain_lists_checks() {
        let text = plan(
            "FOR v, e, p IN 0..2 OUTBOUND 'v/A' GRAPH 'g' \
             FILTER p.edges[*].foo ALL == true FILTER p.vertices[2].x == 1 RETURN v._id",
        )
        .unwrap()
        .explain();
        assert!(text.starts_with("Return(v._id)"));
        assert!(text.contains("depth 2: p.vertices[2].x == 1"));
        assert!(text.contains("per hop: edges[*].foo ALL == true"));
        assert!(text.contains("outputs: [vertex]"));
        assert!(text.trim_end().ends_with("SingleRow"));
    }
}

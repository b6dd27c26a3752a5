//! Query operation execution
//!
//! Operations are lazy row streams pulled from the RETURN at the root.
//! Nothing upstream of a LIMIT does more work than the LIMIT asks for:
//! once it is satisfied, the stream is dropped and with it every open
//! traverser.

use super::context::{ExecutionContext, Row, TraversalVariables, VariableLayout};
use super::evaluation::Evaluator;
use super::{QueryExecutor, SortKey};
use crate::aql::ast::{Expr, SortItem};
use crate::aql::functions::FunctionTable;
use crate::aql::optimizer::PathList;
use crate::aql::planner::{LogicalOp, TraversalNode};
use crate::error::{TraversalError, TraversalResult};
use crate::graph::filter::CollectionFilter;
use crate::graph::path::TraversalPath;
use crate::graph::traversal::{PathConditions, TraversalStep, Traverser};
use crate::types::document::DocumentId;
use crate::types::value::Value;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::iter;
use tracing::{debug, warn};

/// Lazy stream of rows
pub(crate) type RowStream<'e> = Box<dyn Iterator<Item = TraversalResult<Row>> + 'e>;

/// Shared, read-only state of one query execution
#[derive(Clone, Copy)]
pub(crate) struct Execution<'e> {
    pub ctx: &'e ExecutionContext<'e>,
    pub layout: &'e VariableLayout,
    pub functions: &'e FunctionTable,
    /// Built once at setup; `None` when the plan has no traversal
    pub filter: Option<&'e CollectionFilter>,
    /// Run per-start traversals on the rayon pool
    pub parallel: bool,
}

impl QueryExecutor {
    /// Build the row stream of a single logical operation
    pub(crate) fn stream<'e>(&self, op: &'e LogicalOp, run: Execution<'e>) -> RowStream<'e> {
        match op {
            LogicalOp::SingleRow => Box::new(iter::once(Ok(run.layout.empty_row()))),
            LogicalOp::NoResults => Box::new(iter::empty()),
            LogicalOp::Enumerate {
                input,
                variable,
                expr,
            } => self.stream_enumerate(self.stream(input, run), variable, expr, run),
            LogicalOp::Traversal { input, node } => {
                let rows = self.stream(input, run);
                if run.parallel && matches!(input.as_ref(), LogicalOp::Enumerate { .. }) {
                    self.stream_traversal_parallel(rows, node, run)
                } else {
                    self.stream_traversal(rows, node, run)
                }
            }
            LogicalOp::Filter { input, predicate } => {
                self.stream_filter(self.stream(input, run), predicate, run)
            }
            LogicalOp::Sort { input, items } => self.stream_sort(self.stream(input, run), items, run),
            LogicalOp::Limit {
                input,
                offset,
                count,
            } => self.stream_limit(self.stream(input, run), *offset, *count),
            // RETURN is consumed by `execute`
            LogicalOp::Return { input, .. } => self.stream(input, run),
        }
    }

    fn stream_enumerate<'e>(
        &self,
        input: RowStream<'e>,
        variable: &'e str,
        expr: &'e Expr,
        run: Execution<'e>,
    ) -> RowStream<'e> {
        let slot = run.layout.slot(variable);
        Box::new(input.flat_map(move |row| -> Vec<TraversalResult<Row>> {
            let row = match row {
                Ok(row) => row,
                Err(e) => return vec![Err(e)],
            };
            let Some(slot) = slot else {
                return vec![Err(TraversalError::unknown_variable(variable))];
            };
            let value = match Evaluator::new(run.functions, run.layout, &row).evaluate(expr) {
                Ok(value) => value.into_owned(),
                Err(e) => return vec![Err(e)],
            };
            match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| {
                        let mut next = row.clone();
                        next[slot] = item;
                        Ok(next)
                    })
                    .collect(),
                other => vec![Err(TraversalError::evaluation(format!(
                    "FOR loop over '{}' expects an array, got {}",
                    variable,
                    other.type_name()
                )))],
            }
        }))
    }

    fn stream_traversal<'e>(
        &self,
        input: RowStream<'e>,
        node: &'e TraversalNode,
        run: Execution<'e>,
    ) -> RowStream<'e> {
        Box::new(input.flat_map(move |row| -> RowStream<'e> {
            match row {
                Ok(row) => Box::new(Self::traverse(run, node, row)),
                Err(e) => Box::new(iter::once(Err(e))),
            }
        }))
    }

    /// Walk from every start vertex on the rayon pool; results keep the
    /// order of the input rows
    fn stream_traversal_parallel<'e>(
        &self,
        input: RowStream<'e>,
        node: &'e TraversalNode,
        run: Execution<'e>,
    ) -> RowStream<'e> {
        let batch = move || -> Vec<TraversalResult<Row>> {
            let rows = match input.collect::<TraversalResult<Vec<Row>>>() {
                Ok(rows) => rows,
                Err(e) => return vec![Err(e)],
            };
            debug!(start_rows = rows.len(), "running traversals in parallel");
            let results: TraversalResult<Vec<Vec<Row>>> = rows
                .into_par_iter()
                .map(|row| Self::traverse(run, node, row).collect())
                .collect();
            match results {
                Ok(chunks) => chunks.into_iter().flatten().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            }
        };
        Box::new(iter::once_with(batch).flatten())
    }

    /// Start one traversal for `row`
    fn traverse<'e>(run: Execution<'e>, node: &'e TraversalNode, row: Row) -> TraversalRows<'e> {
        let mut rows = TraversalRows {
            traverser: None,
            error: None,
            ctx: run.ctx,
            slots: OutputSlots::new(node, run.layout),
            row: row.clone(),
        };

        let Some(filter) = run.filter else {
            rows.error = Some(TraversalError::internal("traversal executed without a collection filter"));
            return rows;
        };

        let start = match Evaluator::new(run.functions, run.layout, &row).evaluate(&node.start) {
            Ok(value) => value.into_owned(),
            Err(e) => {
                rows.error = Some(e);
                return rows;
            }
        };
        let Some(start) = start_vertex(&start) else {
            warn!(
                value_type = start.type_name(),
                value = %start.to_display_string(),
                "invalid start vertex, traversal yields no results"
            );
            return rows;
        };

        let conditions = AqlPathConditions {
            node,
            functions: run.functions,
            layout: run.layout,
            row,
        };
        rows.traverser = Some(Traverser::new(
            run.ctx.provider,
            filter,
            &node.options,
            conditions,
            start,
        ));
        rows
    }

    fn stream_filter<'e>(
        &self,
        input: RowStream<'e>,
        predicate: &'e Expr,
        run: Execution<'e>,
    ) -> RowStream<'e> {
        Box::new(input.filter_map(move |row| match row {
            Ok(row) => match Evaluator::new(run.functions, run.layout, &row).is_true(predicate) {
                Ok(true) => Some(Ok(row)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }))
    }

    fn stream_sort<'e>(
        &self,
        input: RowStream<'e>,
        items: &'e [SortItem],
        run: Execution<'e>,
    ) -> RowStream<'e> {
        let sorted = move || -> Vec<TraversalResult<Row>> {
            let mut keyed: Vec<(SortKey, Row)> = Vec::new();
            for row in input {
                let row = match row {
                    Ok(row) => row,
                    Err(e) => return vec![Err(e)],
                };
                let key = {
                    let evaluator = Evaluator::new(run.functions, run.layout, &row);
                    items
                        .iter()
                        .map(|item| evaluator.evaluate(&item.expr).map(|v| v.into_owned()))
                        .collect::<TraversalResult<SortKey>>()
                };
                match key {
                    Ok(key) => keyed.push((key, row)),
                    Err(e) => return vec![Err(e)],
                }
            }

            // Stable: equal keys keep their input order
            keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, items));
            keyed.into_iter().map(|(_, row)| Ok(row)).collect()
        };
        Box::new(iter::once_with(sorted).flatten())
    }

    fn stream_limit<'e>(&self, mut input: RowStream<'e>, offset: u64, count: u64) -> RowStream<'e> {
        let mut to_skip = offset;
        let mut remaining = count;
        Box::new(iter::from_fn(move || {
            while remaining > 0 {
                match input.next()? {
                    Err(e) => {
                        remaining = 0;
                        return Some(Err(e));
                    }
                    Ok(_) if to_skip > 0 => to_skip -= 1,
                    Ok(row) => {
                        remaining -= 1;
                        return Some(Ok(row));
                    }
                }
            }
            None
        }))
    }
}

fn compare_keys(a: &SortKey, b: &SortKey, items: &[SortItem]) -> Ordering {
    for ((left, right), item) in a.iter().zip(b.iter()).zip(items) {
        let ordering = left.compare(right);
        let ordering = if item.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Start vertex from an id string or a document with `_id`
fn start_vertex(value: &Value) -> Option<DocumentId> {
    let id = match value {
        Value::String(id) => id.as_ref(),
        Value::Object(_) => value.get("_id")?.as_str()?,
        _ => return None,
    };
    DocumentId::parse(id)
}

/// Row slots that receive traversal outputs (disabled outputs stay null)
struct OutputSlots {
    vertex: Option<usize>,
    edge: Option<usize>,
    path: Option<usize>,
}

impl OutputSlots {
    fn new(node: &TraversalNode, layout: &VariableLayout) -> Self {
        let vars = &node.variables;
        let outputs = node.outputs;
        Self {
            vertex: outputs.vertex.then(|| layout.slot(&vars.vertex)).flatten(),
            edge: vars
                .edge
                .as_deref()
                .filter(|_| outputs.edge)
                .and_then(|name| layout.slot(name)),
            path: vars
                .path
                .as_deref()
                .filter(|_| outputs.path)
                .and_then(|name| layout.slot(name)),
        }
    }
}

/// Rows of one traversal; records the traversal's counters when dropped
pub(crate) struct TraversalRows<'e> {
    traverser: Option<Traverser<'e, AqlPathConditions<'e>>>,
    /// Setup failure reported as the first item
    error: Option<TraversalError>,
    ctx: &'e ExecutionContext<'e>,
    slots: OutputSlots,
    row: Row,
}

impl TraversalRows<'_> {
    fn output_row(&self, step: TraversalStep) -> Row {
        let mut row = self.row.clone();
        if let Some(slot) = self.slots.vertex {
            row[slot] = step.vertex.body().clone();
        }
        if let Some(slot) = self.slots.edge {
            row[slot] = step
                .edge
                .as_ref()
                .map(|edge| edge.body().clone())
                .unwrap_or(Value::Null);
        }
        if let Some(slot) = self.slots.path {
            row[slot] = step.path.to_value();
        }
        row
    }
}

impl Iterator for TraversalRows<'_> {
    type Item = TraversalResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            return Some(Err(e));
        }
        match self.traverser.as_mut()?.next()? {
            Ok(step) => Some(Ok(self.output_row(step))),
            Err(e) => Some(Err(e)),
        }
    }
}

impl Drop for TraversalRows<'_> {
    fn drop(&mut self) {
        if let Some(traverser) = &self.traverser {
            self.ctx.record_traversal(&traverser.stats());
        }
    }
}

/// Extracted FILTER conditions and PRUNE, evaluated during expansion
pub(crate) struct AqlPathConditions<'e> {
    node: &'e TraversalNode,
    functions: &'e FunctionTable,
    layout: &'e VariableLayout,
    /// Row of the enclosing loop (outer variable for PRUNE)
    row: Row,
}

impl<'e> AqlPathConditions<'e> {
    fn evaluator<'s>(&'s self, path: &'s TraversalPath) -> Evaluator<'s> {
        let variables: &'s TraversalVariables = &self.node.variables;
        Evaluator::new(self.functions, self.layout, &self.row).with_path(variables, path)
    }
}

impl PathConditions for AqlPathConditions<'_> {
    fn admits(&self, path: &TraversalPath) -> TraversalResult<bool> {
        let conditions = &self.node.conditions;
        if conditions.is_empty() {
            return Ok(true);
        }
        let depth = path.depth() as u64;
        let evaluator = self.evaluator(path);

        // Only the newest element needs checking; its ancestors passed
        // when they were added.
        for check in &conditions.quantifier_checks {
            let element = match check.list {
                PathList::Vertices => Some(path.last_vertex()),
                PathList::Edges => path.last_edge(),
            };
            if let Some(element) = element {
                let value = evaluator.project(element.body(), &check.projection)?;
                if !check.holds_for(&value) {
                    return Ok(false);
                }
            }
        }

        for check in conditions.depth_checks.iter().filter(|check| check.depth == depth) {
            if !evaluator.is_true(&check.expr)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn prunes(&self, path: &TraversalPath) -> TraversalResult<bool> {
        match &self.node.prune {
            Some(prune) => self.evaluator(path).is_true(prune),
            None => Ok(false),
        }
    }

    /// Checks whose positions lie beyond a short path read null there
    fn accepts(&self, path: &TraversalPath) -> TraversalResult<bool> {
        let depth = path.depth() as u64;
        let evaluator = self.evaluator(path);
        for check in self
            .node
            .conditions
            .depth_checks
            .iter()
            .filter(|check| check.depth > depth)
        {
            if !evaluator.is_true(&check.expr)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_vertex_forms() {
        assert_eq!(
            start_vertex(&Value::string("v/A")),
            Some(DocumentId::new("v", "A"))
        );
        assert_eq!(
            start_vertex(&Value::object([("_id", Value::string("v/B"))])),
            Some(DocumentId::new("v", "B"))
        );
        assert_eq!(start_vertex(&Value::string("no-slash")), None);
        assert_eq!(start_vertex(&Value::Null), None);
        assert_eq!(start_vertex(&Value::Int(3)), None);
        assert_eq!(start_vertex(&Value::object([("_key", Value::string("A"))])), None);
    }

    #[test]
    fn test_compare_keys_mixed_directions() {
        let items = [
            SortItem {
                expr: Expr::variable("a"),
                ascending: true,
            },
            SortItem {
                expr: Expr::variable("b"),
                ascending: false,
            },
        ];
        let key = |a: i64, b: i64| -> SortKey { [Value::Int(a), Value::Int(b)].into_iter().collect() };
        assert_eq!(compare_keys(&key(1, 5), &key(2, 0), &items), Ordering::Less);
        assert_eq!(compare_keys(&key(1, 5), &key(1, 6), &items), Ordering::Greater);
        assert_eq!(compare_keys(&key(1, 5), &key(1, 5), &items), Ordering::Equal);
    }

    #[test]
    fn test_limit_stops_pulling() {
        let executor = QueryExecutor::new();
        let pulled = std::cell::Cell::new(0);
        let input: RowStream<'_> = Box::new((0..100).map(|i| {
            pulled.set(pulled.get() + 1);
            Ok(Row::from_iter([Value::Int(i)]))
        }));
        let rows: Vec<Row> = executor
            .stream_limit(input, 2, 3)
            .collect::<TraversalResult<_>>()
            .unwrap();
        assert_eq!(
            rows.iter().map(|row| row[0].clone()).collect::<Vec<_>>(),
            vec![Value::Int(2), Value::Int(3), Value::Int(4)]
        );
        assert_eq!(pulled.get(), 5);
    }

    #[test]
    fn test_limit_surfaces_errors_in_skipped_range() {
        let executor = QueryExecutor::new();
        let input: RowStream<'_> = Box::new(
            vec![
                Ok(Row::from_iter([Value::Int(0)])),
                Err(TraversalError::DivisionByZero),
                Ok(Row::from_iter([Value::Int(1)])),
            ]
            .into_iter(),
        );
        let result: TraversalResult<Vec<Row>> = executor.stream_limit(input, 5, 1).collect();
        assert_eq!(result.unwrap_err().code(), 1562);
    }
}

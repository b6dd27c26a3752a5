//! Expression evaluation
//!
//! [`Evaluator`] evaluates expressions against a row and, while a traversal
//! is running, against the current path. Path positions are read directly
//! from the path (`p.vertices[2].x` never materializes `p`), and results
//! borrow from documents where possible.
//!
//! # Semantics
//!
//! - attribute or index access on a non-container yields null
//! - `AND`/`OR` short-circuit and return the deciding operand
//! - arithmetic accepts numbers only
//! - quantified comparisons over a non-array are false

use super::context::{TraversalVariables, VariableLayout};
use crate::aql::ast::{Accessor, BinaryOp, Expr, Quantifier, UnaryOp};
use crate::aql::functions::FunctionTable;
use crate::error::{TraversalError, TraversalResult};
use crate::graph::path::TraversalPath;
use crate::types::value::Value;
use smallvec::SmallVec;
use std::borrow::Cow;

/// Evaluates expressions in one variable scope
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    functions: &'a FunctionTable,
    layout: &'a VariableLayout,
    row: &'a [Value],
    step: Option<PathScope<'a>>,
}

#[derive(Clone, Copy)]
struct PathScope<'a> {
    variables: &'a TraversalVariables,
    path: &'a TraversalPath,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionTable, layout: &'a VariableLayout, row: &'a [Value]) -> Self {
        Self {
            functions,
            layout,
            row,
            step: None,
        }
    }

    /// Bind the traversal variables to a (possibly partial) path
    pub fn with_path(mut self, variables: &'a TraversalVariables, path: &'a TraversalPath) -> Self {
        self.step = Some(PathScope { variables, path });
        self
    }

    /// Evaluate a predicate expression
    pub fn is_true(&self, expr: &'a Expr) -> TraversalResult<bool> {
        Ok(self.evaluate(expr)?.is_truthy())
    }

    /// Evaluate an expression
    pub fn evaluate(&self, expr: &'a Expr) -> TraversalResult<Cow<'a, Value>> {
        match expr {
            Expr::Literal(value) => Ok(Cow::Borrowed(value)),

            Expr::Variable(name) => self.variable(name),

            // Bind parameters are substituted at plan time
            Expr::Parameter(name) => Err(TraversalError::BindParameterMissing { name: name.clone() }),

            Expr::Attribute { expr, name } => {
                let base = self.evaluate(expr)?;
                Ok(attribute_of(base, name))
            }

            Expr::Index { expr, index } => {
                let index = self.evaluate(index)?;
                if let Some(element) = self.path_element(expr, &index) {
                    return Ok(element);
                }
                let base = self.evaluate(expr)?;
                Ok(index_of(base, &index))
            }

            Expr::Expansion { expr, projection } => {
                let base = self.evaluate(expr)?;
                let items = match base.as_array() {
                    Some(items) => items
                        .iter()
                        .map(|item| self.project(item, projection))
                        .collect::<TraversalResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                Ok(Cow::Owned(Value::Array(items)))
            }

            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item).map(Cow::into_owned))
                    .collect::<TraversalResult<Vec<_>>>()?;
                Ok(Cow::Owned(Value::Array(values)))
            }

            Expr::Object(entries) => {
                let pairs = entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), self.evaluate(value)?.into_owned())))
                    .collect::<TraversalResult<Vec<_>>>()?;
                Ok(Cow::Owned(Value::Object(pairs)))
            }

            Expr::Binary { left, op, right } => match op {
                // Short-circuit evaluation for AND and OR
                BinaryOp::And => {
                    let left = self.evaluate(left)?;
                    if !left.is_truthy() {
                        return Ok(left);
                    }
                    self.evaluate(right)
                }
                BinaryOp::Or => {
                    let left = self.evaluate(left)?;
                    if left.is_truthy() {
                        return Ok(left);
                    }
                    self.evaluate(right)
                }
                _ => {
                    let left = self.evaluate(left)?;
                    let right = self.evaluate(right)?;
                    evaluate_binary_op(*op, &left, &right).map(Cow::Owned)
                }
            },

            Expr::Unary { op, expr } => {
                let value = self.evaluate(expr)?;
                evaluate_unary_op(*op, &value).map(Cow::Owned)
            }

            Expr::Quantified {
                quantifier,
                left,
                op,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                let result = match left.as_array() {
                    Some(items) => quantified_compare(*quantifier, items, *op, &right)?,
                    None => false,
                };
                Ok(Cow::Owned(Value::Bool(result)))
            }

            Expr::FunctionCall { name, args } => {
                let function = self
                    .functions
                    .get(name)
                    .ok_or_else(|| TraversalError::FunctionNameUnknown { name: name.clone() })?;
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg).map(Cow::into_owned))
                    .collect::<TraversalResult<SmallVec<[Value; 4]>>>()?;
                function.call(&values).map(Cow::Owned)
            }
        }
    }

    /// Apply expansion accessors to one array element
    pub fn project(&self, item: &Value, projection: &'a [Accessor]) -> TraversalResult<Value> {
        let mut current = Some(item);
        for accessor in projection {
            current = match accessor {
                Accessor::Attribute(name) => current.and_then(|value| value.get(name)),
                Accessor::Index(index) => {
                    let index = self.evaluate(index)?;
                    current.and_then(|value| index_ref(value, &index))
                }
            };
        }
        Ok(current.cloned().unwrap_or(Value::Null))
    }

    fn variable(&self, name: &str) -> TraversalResult<Cow<'a, Value>> {
        if let Some(PathScope { variables, path }) = self.step {
            if variables.vertex == name {
                return Ok(Cow::Borrowed(path.last_vertex().body()));
            }
            if variables.edge.as_deref() == Some(name) {
                return Ok(path
                    .last_edge()
                    .map(|edge| Cow::Borrowed(edge.body()))
                    .unwrap_or(Cow::Owned(Value::Null)));
            }
            if variables.is_path(name) {
                return Ok(Cow::Owned(path.to_value()));
            }
        }

        self.layout
            .slot(name)
            .and_then(|slot| self.row.get(slot))
            .map(Cow::Borrowed)
            .ok_or_else(|| TraversalError::unknown_variable(name))
    }

    /// `p.vertices[i]` / `p.edges[i]` read straight from the bound path
    fn path_element(&self, base: &Expr, index: &Value) -> Option<Cow<'a, Value>> {
        let PathScope { variables, path } = self.step?;
        let Expr::Attribute { expr, name } = base else {
            return None;
        };
        if !matches!(expr.as_ref(), Expr::Variable(var) if variables.is_path(var)) {
            return None;
        }

        let position = match index {
            Value::Int(i) => Some(*i),
            _ => None,
        };
        let document = match name.as_str() {
            "vertices" => position.and_then(|i| path.vertex(i)),
            "edges" => position.and_then(|i| path.edge(i)),
            _ => return None,
        };
        Some(
            document
                .map(|doc| Cow::Borrowed(doc.body()))
                .unwrap_or(Cow::Owned(Value::Null)),
        )
    }
}

fn attribute_of<'a>(base: Cow<'a, Value>, name: &str) -> Cow<'a, Value> {
    match base {
        Cow::Borrowed(value) => value
            .get(name)
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Owned(Value::Null)),
        Cow::Owned(value) => Cow::Owned(value.get(name).cloned().unwrap_or(Value::Null)),
    }
}

fn index_of<'a>(base: Cow<'a, Value>, index: &Value) -> Cow<'a, Value> {
    match base {
        Cow::Borrowed(value) => index_ref(value, index)
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Owned(Value::Null)),
        Cow::Owned(value) => Cow::Owned(index_ref(&value, index).cloned().unwrap_or(Value::Null)),
    }
}

/// Array position (negative counts from the end) or object key
fn index_ref<'v>(value: &'v Value, index: &Value) -> Option<&'v Value> {
    match (value, index) {
        (Value::Array(items), Value::Int(i)) => {
            let len = i64::try_from(items.len()).ok()?;
            let position = if *i < 0 { len + i } else { *i };
            usize::try_from(position).ok().and_then(|p| items.get(p))
        }
        (Value::Object(_), Value::String(key)) => value.get(key),
        _ => None,
    }
}

/// Evaluate a comparison between two values
pub fn compare(left: &Value, op: BinaryOp, right: &Value) -> bool {
    match op {
        BinaryOp::Eq => left == right,
        BinaryOp::Neq => left != right,
        BinaryOp::Lt => left.compare(right).is_lt(),
        BinaryOp::Lte => left.compare(right).is_le(),
        BinaryOp::Gt => left.compare(right).is_gt(),
        BinaryOp::Gte => left.compare(right).is_ge(),
        BinaryOp::In => right.as_array().map_or(false, |items| items.contains(left)),
        BinaryOp::NotIn => !right.as_array().map_or(false, |items| items.contains(left)),
        _ => false,
    }
}

/// `items QUANTIFIER op right`
pub fn quantified_compare(
    quantifier: Quantifier,
    items: &[Value],
    op: BinaryOp,
    right: &Value,
) -> TraversalResult<bool> {
    if !op.is_comparison() {
        return Err(TraversalError::evaluation(format!(
            "operator {} cannot be quantified",
            op.symbol()
        )));
    }
    Ok(match quantifier {
        Quantifier::All => items.iter().all(|item| compare(item, op, right)),
        Quantifier::Any => items.iter().any(|item| compare(item, op, right)),
        Quantifier::None => !items.iter().any(|item| compare(item, op, right)),
    })
}

/// Evaluate a non-logical binary operation
pub fn evaluate_binary_op(op: BinaryOp, left: &Value, right: &Value) -> TraversalResult<Value> {
    match op {
        BinaryOp::Add => arithmetic("addition", left, right, i64::checked_add, |a, b| a + b),
        BinaryOp::Sub => arithmetic("subtraction", left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic("multiplication", left, right, i64::checked_mul, |a, b| a * b),
        BinaryOp::Div => {
            check_number("division", left)?;
            check_divisor("division", right)?;
            match (left, right) {
                // checked_rem is None for i64::MIN / -1, which falls back to float
                (Value::Int(a), Value::Int(b)) if a.checked_rem(*b) == Some(0) => Ok(a
                    .checked_div(*b)
                    .map(Value::Int)
                    .unwrap_or_else(|| Value::float(*a as f64 / *b as f64))),
                _ => Ok(Value::float(left.to_number() / right.to_number())),
            }
        }
        BinaryOp::Mod => {
            check_number("modulo", left)?;
            check_divisor("modulo", right)?;
            match (left, right) {
                (Value::Int(a), Value::Int(b)) => Ok(a
                    .checked_rem(*b)
                    .map(Value::Int)
                    .unwrap_or(Value::Int(0))),
                _ => Ok(Value::float(left.to_number() % right.to_number())),
            }
        }
        BinaryOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinaryOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
        comparison => Ok(Value::Bool(compare(left, comparison, right))),
    }
}

/// Evaluate a unary operation
pub fn evaluate_unary_op(op: UnaryOp, value: &Value) -> TraversalResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Int(i) => Ok(i
                .checked_neg()
                .map(Value::Int)
                .unwrap_or_else(|| Value::float(-(*i as f64)))),
            Value::Float(f) => Ok(Value::float(-f)),
            other => Err(invalid_arithmetic("negation", other)),
        },
        UnaryOp::Pos => {
            check_number("unary plus", value)?;
            Ok(value.clone())
        }
    }
}

fn arithmetic(
    operation: &'static str,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> TraversalResult<Value> {
    check_number(operation, left)?;
    check_number(operation, right)?;
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(int_op(*a, *b)
            .map(Value::Int)
            .unwrap_or_else(|| Value::float(float_op(*a as f64, *b as f64)))),
        _ => Ok(Value::float(float_op(left.to_number(), right.to_number()))),
    }
}

fn check_number(operation: &'static str, value: &Value) -> TraversalResult<()> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(()),
        other => Err(invalid_arithmetic(operation, other)),
    }
}

fn check_divisor(operation: &'static str, value: &Value) -> TraversalResult<()> {
    check_number(operation, value)?;
    if value.to_number() == 0.0 {
        return Err(TraversalError::DivisionByZero);
    }
    Ok(())
}

fn invalid_arithmetic(operation: &'static str, value: &Value) -> TraversalError {
    TraversalError::InvalidArithmeticValue {
        operation,
        value_type: value.type_name(),
    }
}

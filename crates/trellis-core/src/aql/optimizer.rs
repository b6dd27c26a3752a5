//! Traversal condition extraction
//!
//! Moves FILTER clauses that only read fixed path positions into the
//! traversal, where they are checked as soon as the path is long enough
//! and discard whole subtrees instead of finished paths.
//!
//! Each top-level conjunct ends up in exactly one bucket:
//!
//! | Clause | Outcome |
//! |--------|---------|
//! | constant true | dropped |
//! | constant false | traversal is statically empty |
//! | `p.vertices[*].x ALL/NONE op c` (or `p.edges`) | [`QuantifierCheck`], one element per hop |
//! | only `p.vertices[k]` / `p.edges[k]` with literal `k >= 0` | [`DepthCheck`] at `max(k_vertex, k_edge + 1)` |
//! | anything else | residual post-filter |
//!
//! Positions past the maximum depth can never exist and are folded to
//! `null` first, which is how `p.edges[5].x == true` under `1..2` becomes
//! constant false.
//!
//! Extracted checks also run on paths the post-filter never sees: paths
//! shallower than the minimum depth, and rows an earlier FILTER drops. So a
//! clause is only extracted when it cannot raise an error, and only while no
//! clause that can fail precedes it in query order. Otherwise an error would
//! appear or disappear depending on whether the optimizer ran.

use crate::aql::ast::{Accessor, BinaryOp, Expr, Quantifier, UnaryOp};
use crate::aql::executor::context::VariableLayout;
use crate::aql::executor::evaluation::{compare, Evaluator};
use crate::aql::functions::FunctionTable;
use crate::error::TraversalResult;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::debug;

/// `p.vertices` or `p.edges`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathList {
    Vertices,
    Edges,
}

impl PathList {
    fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "vertices" => Some(Self::Vertices),
            "edges" => Some(Self::Edges),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vertices => "vertices",
            Self::Edges => "edges",
        }
    }

    /// Path depth at which position `index` exists
    fn depth_of(&self, index: u64) -> u64 {
        match self {
            Self::Vertices => index,
            Self::Edges => index + 1,
        }
    }

    fn out_of_range(&self, index: u64, max_depth: u64) -> bool {
        self.depth_of(index) > max_depth
    }
}

/// A clause decidable once the path reaches `depth`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthCheck {
    pub depth: u64,
    pub expr: Expr,
}

/// `p.<list>[*]<projection> ALL|NONE op value`, checked hop by hop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantifierCheck {
    pub list: PathList,
    pub quantifier: Quantifier,
    pub projection: Vec<Accessor>,
    pub op: BinaryOp,
    pub value: Value,
}

impl QuantifierCheck {
    /// Whether one element keeps the path alive
    pub fn holds_for(&self, element: &Value) -> bool {
        let matched = compare(element, self.op, &self.value);
        match self.quantifier {
            Quantifier::None => !matched,
            _ => matched,
        }
    }
}

impl fmt::Display for QuantifierCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let projection = Expr::Expansion {
            expr: Box::new(Expr::variable(self.list.as_str())),
            projection: self.projection.clone(),
        };
        write!(
            f,
            "{} {} {} {}",
            projection,
            self.quantifier.as_str(),
            self.op.symbol(),
            serde_json::Value::from(self.value.clone())
        )
    }
}

/// Conditions evaluated inside the traversal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraversalConditions {
    pub depth_checks: Vec<DepthCheck>,
    pub quantifier_checks: Vec<QuantifierCheck>,
}

impl TraversalConditions {
    pub fn is_empty(&self) -> bool {
        self.depth_checks.is_empty() && self.quantifier_checks.is_empty()
    }
}

/// Result of splitting FILTER clauses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub conditions: TraversalConditions,
    /// Clauses left for post-filtering, in query order
    pub residual: Vec<Expr>,
    /// A clause is constant false: the traversal yields no rows
    pub statically_empty: bool,
}

/// Splits FILTER clauses of one traversal
pub struct ConditionExtractor<'a> {
    path_var: Option<&'a str>,
    max_depth: u64,
    functions: &'a FunctionTable,
}

impl<'a> ConditionExtractor<'a> {
    pub fn new(path_var: Option<&'a str>, max_depth: u64, functions: &'a FunctionTable) -> Self {
        Self {
            path_var,
            max_depth,
            functions,
        }
    }

    /// Classify every top-level conjunct of `filters`
    pub fn extract(&self, filters: impl IntoIterator<Item = Expr>) -> Extraction {
        let mut extraction = Extraction::default();
        // set once a post-filter that can fail has been kept
        let mut fallible_before = false;

        for clause in filters.into_iter().flat_map(Expr::into_conjuncts) {
            let clause = self.fold_out_of_range(clause);

            if self.is_constant(&clause) {
                match self.constant_value(&clause) {
                    Ok(value) if value.is_truthy() => {
                        debug!(clause = %clause, "dropping constant true filter");
                    }
                    Ok(_) if fallible_before => {
                        debug!(clause = %clause, "constant false filter follows one that may fail, keeping");
                        extraction.residual.push(clause);
                    }
                    Ok(_) => {
                        debug!(clause = %clause, "filter is constant false, traversal is empty");
                        extraction.statically_empty = true;
                    }
                    Err(e) => {
                        debug!(clause = %clause, error = %e, "constant filter fails, keeping as post-filter");
                        fallible_before = true;
                        extraction.residual.push(clause);
                    }
                }
                continue;
            }

            if fallible_before || self.may_fail(&clause) {
                debug!(clause = %clause, "clause may fail or follows one that may, keeping post-filter");
                fallible_before = true;
                extraction.residual.push(clause);
                continue;
            }

            if let Some(check) = self.quantifier_check(&clause) {
                debug!(check = %check, "extracted quantifier check");
                extraction.conditions.quantifier_checks.push(check);
                continue;
            }

            let mut depth = 0;
            if self.positional_depth(&clause, &mut depth) {
                debug!(clause = %clause, depth, "extracted depth check");
                extraction
                    .conditions
                    .depth_checks
                    .push(DepthCheck { depth, expr: clause });
                continue;
            }

            debug!(clause = %clause, "keeping post-filter");
            extraction.residual.push(clause);
        }

        extraction
    }

    /// `p.vertices` / `p.edges` on the traversal's path variable
    fn path_list(&self, expr: &Expr) -> Option<PathList> {
        let path_var = self.path_var?;
        match expr {
            Expr::Attribute { expr, name } if matches!(expr.as_ref(), Expr::Variable(v) if v == path_var) => {
                PathList::from_attribute(name)
            }
            _ => None,
        }
    }

    /// Replace positions beyond `max_depth` with null and collapse access
    /// on null
    fn fold_out_of_range(&self, expr: Expr) -> Expr {
        match expr {
            Expr::Index { expr, index } => {
                let base = self.fold_out_of_range(*expr);
                let index = self.fold_out_of_range(*index);
                if let (Some(list), Expr::Literal(Value::Int(k))) = (self.path_list(&base), &index) {
                    if let Ok(k) = u64::try_from(*k) {
                        if list.out_of_range(k, self.max_depth) {
                            return Expr::Literal(Value::Null);
                        }
                    }
                }
                if is_null_literal(&base) && matches!(index, Expr::Literal(_)) {
                    return Expr::Literal(Value::Null);
                }
                Expr::Index {
                    expr: Box::new(base),
                    index: Box::new(index),
                }
            }
            Expr::Attribute { expr, name } => {
                let base = self.fold_out_of_range(*expr);
                if is_null_literal(&base) {
                    return Expr::Literal(Value::Null);
                }
                Expr::Attribute {
                    expr: Box::new(base),
                    name,
                }
            }
            Expr::Expansion { expr, projection } => Expr::Expansion {
                expr: Box::new(self.fold_out_of_range(*expr)),
                projection: projection
                    .into_iter()
                    .map(|accessor| match accessor {
                        Accessor::Index(index) => Accessor::Index(self.fold_out_of_range(index)),
                        other => other,
                    })
                    .collect(),
            },
            Expr::Array(items) => {
                Expr::Array(items.into_iter().map(|item| self.fold_out_of_range(item)).collect())
            }
            Expr::Object(entries) => Expr::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, self.fold_out_of_range(value)))
                    .collect(),
            ),
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(self.fold_out_of_range(*left)),
                op,
                right: Box::new(self.fold_out_of_range(*right)),
            },
            Expr::Unary { op, expr } => Expr::Unary {
                op,
                expr: Box::new(self.fold_out_of_range(*expr)),
            },
            Expr::Quantified {
                quantifier,
                left,
                op,
                right,
            } => Expr::Quantified {
                quantifier,
                left: Box::new(self.fold_out_of_range(*left)),
                op,
                right: Box::new(self.fold_out_of_range(*right)),
            },
            Expr::FunctionCall { name, args } => Expr::FunctionCall {
                name,
                args: args.into_iter().map(|arg| self.fold_out_of_range(arg)).collect(),
            },
            leaf @ (Expr::Literal(_) | Expr::Variable(_) | Expr::Parameter(_)) => leaf,
        }
    }

    fn is_deterministic(&self, name: &str) -> bool {
        self.functions
            .get(name)
            .map_or(false, |function| function.is_deterministic())
    }

    /// No variables, no parameters, only deterministic functions
    fn is_constant(&self, expr: &Expr) -> bool {
        let mut constant = true;
        expr.walk(&mut |e| match e {
            Expr::Variable(_) | Expr::Parameter(_) => constant = false,
            Expr::FunctionCall { name, .. } if !self.is_deterministic(name) => constant = false,
            _ => {}
        });
        constant
    }

    /// Constant and evaluates without error
    fn evaluates_cleanly(&self, expr: &Expr) -> bool {
        self.is_constant(expr) && self.constant_value(expr).is_ok()
    }

    fn constant_value(&self, expr: &Expr) -> TraversalResult<Value> {
        let layout = VariableLayout::new();
        Evaluator::new(self.functions, &layout, &[])
            .evaluate(expr)
            .map(Cow::into_owned)
    }

    fn quantifier_check(&self, clause: &Expr) -> Option<QuantifierCheck> {
        let Expr::Quantified {
            quantifier,
            left,
            op,
            right,
        } = clause
        else {
            return None;
        };
        if !matches!(quantifier, Quantifier::All | Quantifier::None) || !op.is_comparison() {
            return None;
        }
        let Expr::Expansion { expr, projection } = left.as_ref() else {
            return None;
        };
        let list = self.path_list(expr)?;

        let constant_projection = projection.iter().all(|accessor| match accessor {
            Accessor::Attribute(_) => true,
            Accessor::Index(index) => self.is_constant(index),
        });
        if !constant_projection || !self.is_constant(right) {
            return None;
        }
        let value = self.constant_value(right).ok()?;

        Some(QuantifierCheck {
            list,
            quantifier: *quantifier,
            projection: projection.clone(),
            op: *op,
            value,
        })
    }

    /// Whether `expr` reads the path only at literal non-negative positions;
    /// raises `depth` to the deepest position read
    fn positional_depth(&self, expr: &Expr, depth: &mut u64) -> bool {
        if let Expr::Index { expr: base, index } = expr {
            if let Some(list) = self.path_list(base) {
                return match index.as_ref() {
                    Expr::Literal(Value::Int(k)) if *k >= 0 => {
                        *depth = (*depth).max(list.depth_of(*k as u64));
                        true
                    }
                    _ => false,
                };
            }
        }

        match expr {
            Expr::Literal(_) => true,
            // Whole-path, v/e, outer loop and unresolved parameters
            Expr::Variable(_) | Expr::Parameter(_) => false,
            Expr::Attribute { expr, .. } | Expr::Unary { expr, .. } => {
                self.positional_depth(expr, depth)
            }
            Expr::Index { expr, index } => {
                self.positional_depth(expr, depth) && self.positional_depth(index, depth)
            }
            Expr::Expansion { expr, projection } => {
                self.positional_depth(expr, depth)
                    && projection.iter().all(|accessor| match accessor {
                        Accessor::Attribute(_) => true,
                        Accessor::Index(index) => self.positional_depth(index, depth),
                    })
            }
            Expr::Array(items) => items.iter().all(|item| self.positional_depth(item, depth)),
            Expr::Object(entries) => entries
                .iter()
                .all(|(_, value)| self.positional_depth(value, depth)),
            Expr::Binary { left, right, .. } | Expr::Quantified { left, right, .. } => {
                self.positional_depth(left, depth) && self.positional_depth(right, depth)
            }
            Expr::FunctionCall { name, args } => {
                self.is_deterministic(name) && args.iter().all(|arg| self.positional_depth(arg, depth))
            }
        }
    }

    /// Whether evaluating `expr` can raise an error
    ///
    /// Comparisons, logical operators and access never fail. Arithmetic,
    /// unary `-`/`+` and function calls may, unless they are constant and
    /// evaluate cleanly.
    fn may_fail(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Literal(_) | Expr::Variable(_) | Expr::Parameter(_) => false,
            Expr::Attribute { expr, .. }
            | Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => self.may_fail(expr),
            Expr::Index { expr, index } => self.may_fail(expr) || self.may_fail(index),
            Expr::Expansion { expr, projection } => {
                self.may_fail(expr)
                    || projection.iter().any(|accessor| match accessor {
                        Accessor::Attribute(_) => false,
                        Accessor::Index(index) => self.may_fail(index),
                    })
            }
            Expr::Array(items) => items.iter().any(|item| self.may_fail(item)),
            Expr::Object(entries) => entries.iter().any(|(_, value)| self.may_fail(value)),
            Expr::Binary { left, op, right } if is_infallible(*op) => {
                self.may_fail(left) || self.may_fail(right)
            }
            Expr::Quantified { left, op, right, .. } if op.is_comparison() => {
                self.may_fail(left) || self.may_fail(right)
            }
            Expr::Binary { .. } | Expr::Quantified { .. } | Expr::Unary { .. } | Expr::FunctionCall { .. } => {
                !self.evaluates_cleanly(expr)
            }
        }
    }
}

/// Comparisons and logical operators never raise errors
fn is_infallible(op: BinaryOp) -> bool {
    op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or)
}

fn is_null_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Value::Null))
}

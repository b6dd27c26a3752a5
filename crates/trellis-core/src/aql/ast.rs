//! AQL Abstract Syntax Tree (AST) types
//!
//! These types represent the parsed structure of a traversal query.
//! They are produced by the parser and consumed by the planner.

use crate::graph::options::Direction;
use crate::types::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A traversal query
///
/// ```text
/// [WITH c1, c2]
/// [FOR x IN <expr>]
/// FOR v, e, p IN min..max DIR start (GRAPH g | ec1, ec2) [PRUNE ..] [OPTIONS {..}]
/// (FILTER .. | SORT .. | LIMIT ..)*
/// RETURN [DISTINCT] <expr>
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Collections declared with `WITH`
    pub with_collections: Vec<NameRef>,
    /// Optional enclosing loop that feeds start vertices
    pub outer_loop: Option<OuterLoop>,
    pub traversal: TraversalClause,
    /// FILTER / SORT / LIMIT in query order
    pub operations: Vec<Operation>,
    pub return_clause: ReturnClause,
}

/// `FOR x IN <expr>` preceding the traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterLoop {
    pub variable: String,
    pub expr: Expr,
}

/// `FOR v, e, p IN ...` traversal clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraversalClause {
    pub vertex_var: String,
    pub edge_var: Option<String>,
    pub path_var: Option<String>,
    pub min_depth: IntegerRef,
    pub max_depth: IntegerRef,
    pub direction: Direction,
    pub start: Expr,
    pub source: SourceClause,
    pub prune: Option<Expr>,
    /// `OPTIONS { ... }` object expression
    pub options: Option<Expr>,
}

impl TraversalClause {
    /// Variables the traversal binds, in `v, e, p` order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.vertex_var.as_str())
            .chain(self.edge_var.as_deref())
            .chain(self.path_var.as_deref())
    }
}

/// A non-negative integer given literally or as a bind parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerRef {
    Literal(u64),
    Parameter(String),
}

/// A collection or graph name given literally or as a bind parameter
///
/// Collection parameters keep their leading `@` (`@@coll` binds `"@coll"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NameRef {
    Literal(String),
    Parameter(String),
}

/// Edge source of a traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceClause {
    Graph(NameRef),
    EdgeCollections(Vec<EdgeCollectionClause>),
}

/// One entry of an edge collection list, with an optional direction override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCollectionClause {
    pub name: NameRef,
    pub direction: Option<Direction>,
}

/// Statement following the traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Filter(Expr),
    Sort(Vec<SortItem>),
    Limit { offset: IntegerRef, count: IntegerRef },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortItem {
    pub expr: Expr,
    pub ascending: bool,
}

/// RETURN clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnClause {
    /// Whether RETURN DISTINCT was used
    pub distinct: bool,
    pub expr: Expr,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Literal(Value),

    /// Variable reference
    Variable(String),

    /// Value bind parameter: `@name`
    Parameter(String),

    /// Attribute access: `doc.name`
    Attribute { expr: Box<Expr>, name: String },

    /// Index access: `list[0]`, `doc["name"]`
    Index { expr: Box<Expr>, index: Box<Expr> },

    /// Array expansion: `list[*].a.b` applies `projection` to each element
    Expansion {
        expr: Box<Expr>,
        projection: Vec<Accessor>,
    },

    /// Array literal: `[1, 2, 3]`
    Array(Vec<Expr>),

    /// Object literal: `{a: 1, b: 2}`
    Object(Vec<(String, Expr)>),

    /// Binary operation: `a + b`, `a > b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation: `NOT a`, `-x`
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// Quantified comparison: `list ALL == x`
    Quantified {
        quantifier: Quantifier,
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Function call: `LENGTH(x)`, `MY::FUNC(a, b)`
    FunctionCall { name: String, args: Vec<Expr> },
}

/// Accessor applied to each element of an expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Accessor {
    Attribute(String),
    Index(Expr),
}

impl Expr {
    /// Create a literal expression
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Create a variable reference
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Create an attribute access expression
    pub fn attribute(expr: Expr, name: impl Into<String>) -> Self {
        Self::Attribute {
            expr: Box::new(expr),
            name: name.into(),
        }
    }

    /// Create an index access expression
    pub fn index(expr: Expr, index: Expr) -> Self {
        Self::Index {
            expr: Box::new(expr),
            index: Box::new(index),
        }
    }

    /// Create a binary operation
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a unary operation
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    /// Comparison shortcuts
    pub fn eq(self, other: Expr) -> Self {
        Self::binary(self, BinaryOp::Eq, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Self::binary(self, BinaryOp::Lt, other)
    }

    /// Logical shortcuts
    pub fn and(self, other: Expr) -> Self {
        Self::binary(self, BinaryOp::And, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Self::binary(self, BinaryOp::Or, other)
    }

    /// Split a conjunction into its top-level clauses
    pub fn into_conjuncts(self) -> Vec<Expr> {
        let mut clauses = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Binary {
                    left,
                    op: BinaryOp::And,
                    right,
                } => {
                    stack.push(*right);
                    stack.push(*left);
                }
                other => clauses.push(other),
            }
        }
        clauses
    }

    /// Join clauses back into one conjunction (`None` for no clauses)
    pub fn conjunction(clauses: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        clauses.into_iter().reduce(Expr::and)
    }

    /// Visit this expression and all sub-expressions, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Literal(_) | Expr::Variable(_) | Expr::Parameter(_) => {}
            Expr::Attribute { expr, .. } | Expr::Unary { expr, .. } => expr.walk(visit),
            Expr::Index { expr, index } => {
                expr.walk(visit);
                index.walk(visit);
            }
            Expr::Expansion { expr, projection } => {
                expr.walk(visit);
                for accessor in projection {
                    if let Accessor::Index(index) = accessor {
                        index.walk(visit);
                    }
                }
            }
            Expr::Array(items) => items.iter().for_each(|item| item.walk(visit)),
            Expr::Object(entries) => entries.iter().for_each(|(_, value)| value.walk(visit)),
            Expr::Binary { left, right, .. } | Expr::Quantified { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            Expr::FunctionCall { args, .. } => args.iter().for_each(|arg| arg.walk(visit)),
        }
    }

    /// Whether the expression references variable `name`
    pub fn references(&self, name: &str) -> bool {
        let mut found = false;
        self.walk(&mut |expr| {
            if matches!(expr, Expr::Variable(v) if v == name) {
                found = true;
            }
        });
        found
    }
}

/// Renders the expression back as query text (used by `explain()` and logs)
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", serde_json::Value::from(value.clone())),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Parameter(name) => write!(f, "@{}", name),
            Expr::Attribute { expr, name } => write!(f, "{}.{}", expr, name),
            Expr::Index { expr, index } => write!(f, "{}[{}]", expr, index),
            Expr::Expansion { expr, projection } => {
                write!(f, "{}[*]", expr)?;
                for accessor in projection {
                    match accessor {
                        Accessor::Attribute(name) => write!(f, ".{}", name)?,
                        Accessor::Index(index) => write!(f, "[{}]", index)?,
                    }
                }
                Ok(())
            }
            Expr::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", serde_json::Value::from(key.as_str()), value)?;
                }
                write!(f, "}}")
            }
            Expr::Binary { left, op, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, right)
            }
            Expr::Unary { op, expr } => {
                match op {
                    UnaryOp::Not => write!(f, "NOT ")?,
                    UnaryOp::Neg => write!(f, "-")?,
                    UnaryOp::Pos => write!(f, "+")?,
                }
                write_operand(f, expr)
            }
            Expr::Quantified {
                quantifier,
                left,
                op,
                right,
            } => {
                write_operand(f, left)?;
                write!(f, " {} {} ", quantifier.as_str(), op.symbol())?;
                write_operand(f, right)
            }
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Binary { .. } | Expr::Quantified { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// Whether this is a comparison operator (usable after a quantifier)
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Neq | Self::Lt | Self::Lte | Self::Gt | Self::Gte | Self::In | Self::NotIn
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

/// Array comparison quantifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    All,
    Any,
    None,
}

impl Quantifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Any => "ANY",
            Self::None => "NONE",
        }
    }
}

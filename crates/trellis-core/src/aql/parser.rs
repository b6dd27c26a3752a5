//! AQL query parser using pest grammar
//!
//! Converts traversal query strings into AST structures. Syntax errors carry
//! the line and column reported by pest.

use crate::aql::ast::*;
use crate::error::{TraversalError, TraversalResult};
use crate::graph::options::Direction;
use crate::types::value::Value;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "aql/aql.pest"]
struct AqlPestParser;

/// AQL query parser
///
/// Parses query strings into AST structures for planning.
pub struct AqlParser;

impl AqlParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self
    }

    /// Parse a traversal query
    pub fn parse(&self, input: &str) -> TraversalResult<Query> {
        let mut pairs = AqlPestParser::parse(Rule::query, input)
            .map_err(|e| self.pest_error_to_traversal(e))?;

        let query = pairs
            .next()
            .ok_or_else(|| TraversalError::parse(1, 1, "empty query"))?;
        self.parse_query(query)
    }

    fn parse_query(&self, pair: Pair<Rule>) -> TraversalResult<Query> {
        let position = syntax_position(&pair);
        let mut with_collections = Vec::new();
        let mut outer_loop = None;
        let mut traversal = None;
        let mut operations = Vec::new();
        let mut return_clause = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::with_clause => {
                    for name in inner.into_inner() {
                        if name.as_rule() == Rule::collection_name {
                            with_collections.push(self.parse_collection_name(name)?);
                        }
                    }
                }
                Rule::outer_loop => outer_loop = Some(self.parse_outer_loop(inner)?),
                Rule::traversal => traversal = Some(self.parse_traversal(inner)?),
                Rule::filter_clause => {
                    let expr = self.first_expression(inner)?;
                    operations.push(Operation::Filter(expr));
                }
                Rule::sort_clause => operations.push(self.parse_sort_clause(inner)?),
                Rule::limit_clause => operations.push(self.parse_limit_clause(inner)?),
                Rule::return_clause => return_clause = Some(self.parse_return_clause(inner)?),
                _ => {}
            }
        }

        let (line, column) = position;
        let traversal =
            traversal.ok_or_else(|| TraversalError::parse(line, column, "missing traversal"))?;
        let return_clause = return_clause
            .ok_or_else(|| TraversalError::parse(line, column, "missing RETURN clause"))?;

        Ok(Query {
            with_collections,
            outer_loop,
            traversal,
            operations,
            return_clause,
        })
    }

    /// Parse `FOR x IN <expr>` preceding the traversal
    fn parse_outer_loop(&self, pair: Pair<Rule>) -> TraversalResult<OuterLoop> {
        let (line, column) = syntax_position(&pair);
        let mut variable = None;
        let mut expr = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::identifier => variable = Some(inner.as_str().to_string()),
                Rule::expression => expr = Some(self.parse_expression(inner)?),
                _ => {}
            }
        }

        match (variable, expr) {
            (Some(variable), Some(expr)) => Ok(OuterLoop { variable, expr }),
            _ => Err(TraversalError::parse(line, column, "incomplete FOR loop")),
        }
    }

    /// Parse the traversal clause
    fn parse_traversal(&self, pair: Pair<Rule>) -> TraversalResult<TraversalClause> {
        let (line, column) = syntax_position(&pair);
        let mut variables = Vec::new();
        let mut depth = (IntegerRef::Literal(1), IntegerRef::Literal(1));
        let mut direction = None;
        let mut start = None;
        let mut source = None;
        let mut prune = None;
        let mut options = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::traversal_variables => {
                    variables = inner
                        .into_inner()
                        .filter(|p| p.as_rule() == Rule::identifier)
                        .map(|p| p.as_str().to_string())
                        .collect();
                }
                Rule::depth_range => depth = self.parse_depth_range(inner)?,
                Rule::direction => direction = Some(self.parse_direction(inner)?),
                Rule::expression => start = Some(self.parse_expression(inner)?),
                Rule::traversal_source => source = Some(self.parse_traversal_source(inner)?),
                Rule::prune_clause => prune = Some(self.first_expression(inner)?),
                Rule::options_clause => {
                    for object in inner.into_inner() {
                        if object.as_rule() == Rule::object_literal {
                            options = Some(self.parse_object_literal(object)?);
                        }
                    }
                }
                _ => {}
            }
        }

        let incomplete = |what: &str| TraversalError::parse(line, column, format!("traversal is missing {}", what));
        let mut variables = variables.into_iter();
        let vertex_var = variables.next().ok_or_else(|| incomplete("a vertex variable"))?;

        Ok(TraversalClause {
            vertex_var,
            edge_var: variables.next(),
            path_var: variables.next(),
            min_depth: depth.0,
            max_depth: depth.1,
            direction: direction.ok_or_else(|| incomplete("a direction"))?,
            start: start.ok_or_else(|| incomplete("a start vertex"))?,
            source: source.ok_or_else(|| incomplete("a graph or edge collections"))?,
            prune,
            options,
        })
    }

    /// Parse `min..max` or a single depth (used as both bounds)
    fn parse_depth_range(&self, pair: Pair<Rule>) -> TraversalResult<(IntegerRef, IntegerRef)> {
        let bounds = pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::integer_ref)
            .map(|p| self.parse_integer_ref(p))
            .collect::<TraversalResult<Vec<_>>>()?;

        let mut bounds = bounds.into_iter();
        match (bounds.next(), bounds.next()) {
            (Some(min), Some(max)) => Ok((min, max)),
            (Some(single), None) => Ok((single.clone(), single)),
            _ => Err(TraversalError::parse(0, 0, "empty depth range")),
        }
    }

    fn parse_integer_ref(&self, pair: Pair<Rule>) -> TraversalResult<IntegerRef> {
        let (line, column) = syntax_position(&pair);
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::integer => {
                    return inner.as_str().parse::<u64>().map(IntegerRef::Literal).map_err(|_| {
                        TraversalError::parse(line, column, format!("integer out of range: {}", inner.as_str()))
                    })
                }
                Rule::value_parameter => {
                    return Ok(IntegerRef::Parameter(inner.as_str()[1..].to_string()));
                }
                _ => {}
            }
        }
        Err(TraversalError::parse(line, column, "expected an integer or bind parameter"))
    }

    fn parse_direction(&self, pair: Pair<Rule>) -> TraversalResult<Direction> {
        let (line, column) = syntax_position(&pair);
        match pair.into_inner().next().map(|p| p.as_rule()) {
            Some(Rule::kw_outbound) => Ok(Direction::Outbound),
            Some(Rule::kw_inbound) => Ok(Direction::Inbound),
            Some(Rule::kw_any) => Ok(Direction::Any),
            _ => Err(TraversalError::parse(line, column, "expected OUTBOUND, INBOUND or ANY")),
        }
    }

    fn parse_traversal_source(&self, pair: Pair<Rule>) -> TraversalResult<SourceClause> {
        let (line, column) = syntax_position(&pair);
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::graph_source => {
                    for name in inner.into_inner() {
                        match name.as_rule() {
                            Rule::string_literal => {
                                return Ok(SourceClause::Graph(NameRef::Literal(
                                    self.parse_string_literal(name)?,
                                )))
                            }
                            Rule::value_parameter => {
                                return Ok(SourceClause::Graph(NameRef::Parameter(
                                    name.as_str()[1..].to_string(),
                                )))
                            }
                            Rule::identifier => {
                                return Ok(SourceClause::Graph(NameRef::Literal(
                                    name.as_str().to_string(),
                                )))
                            }
                            _ => {}
                        }
                    }
                }
                Rule::edge_collection_list => {
                    let mut collections = Vec::new();
                    for entry in inner.into_inner() {
                        collections.push(self.parse_edge_collection(entry)?);
                    }
                    return Ok(SourceClause::EdgeCollections(collections));
                }
                _ => {}
            }
        }
        Err(TraversalError::parse(line, column, "expected GRAPH or edge collections"))
    }

    fn parse_edge_collection(&self, pair: Pair<Rule>) -> TraversalResult<EdgeCollectionClause> {
        let (line, column) = syntax_position(&pair);
        let mut direction = None;
        let mut name = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::direction => direction = Some(self.parse_direction(inner)?),
                Rule::collection_name => name = Some(self.parse_collection_name(inner)?),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| TraversalError::parse(line, column, "expected edge collection"))?;
        Ok(EdgeCollectionClause { name, direction })
    }

    /// Collection names: identifiers, quoted strings or `@@param`
    fn parse_collection_name(&self, pair: Pair<Rule>) -> TraversalResult<NameRef> {
        let (line, column) = syntax_position(&pair);
        for inner in pair.into_inner() {
            match inner.as_rule() {
                // `@@coll` binds the parameter named "@coll"
                Rule::collection_parameter => {
                    return Ok(NameRef::Parameter(inner.as_str()[1..].to_string()))
                }
                Rule::string_literal => return Ok(NameRef::Literal(self.parse_string_literal(inner)?)),
                Rule::identifier => return Ok(NameRef::Literal(inner.as_str().to_string())),
                _ => {}
            }
        }
        Err(TraversalError::parse(line, column, "expected collection name"))
    }

    fn parse_sort_clause(&self, pair: Pair<Rule>) -> TraversalResult<Operation> {
        let mut items = Vec::new();

        for item in pair.into_inner() {
            if item.as_rule() != Rule::sort_item {
                continue;
            }
            let (line, column) = syntax_position(&item);
            let mut expr = None;
            let mut ascending = true;
            for inner in item.into_inner() {
                match inner.as_rule() {
                    Rule::expression => expr = Some(self.parse_expression(inner)?),
                    Rule::sort_direction => {
                        ascending = !matches!(
                            inner.into_inner().next().map(|p| p.as_rule()),
                            Some(Rule::kw_desc)
                        );
                    }
                    _ => {}
                }
            }
            let expr = expr.ok_or_else(|| TraversalError::parse(line, column, "missing sort expression"))?;
            items.push(SortItem { expr, ascending });
        }

        Ok(Operation::Sort(items))
    }

    /// `LIMIT count` or `LIMIT offset, count`
    fn parse_limit_clause(&self, pair: Pair<Rule>) -> TraversalResult<Operation> {
        let (line, column) = syntax_position(&pair);
        let values = pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::integer_ref)
            .map(|p| self.parse_integer_ref(p))
            .collect::<TraversalResult<Vec<_>>>()?;

        let mut values = values.into_iter();
        match (values.next(), values.next()) {
            (Some(offset), Some(count)) => Ok(Operation::Limit { offset, count }),
            (Some(count), None) => Ok(Operation::Limit {
                offset: IntegerRef::Literal(0),
                count,
            }),
            _ => Err(TraversalError::parse(line, column, "LIMIT requires a count")),
        }
    }

    fn parse_return_clause(&self, pair: Pair<Rule>) -> TraversalResult<ReturnClause> {
        let (line, column) = syntax_position(&pair);
        let mut distinct = false;
        let mut expr = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::distinct => distinct = true,
                Rule::expression => expr = Some(self.parse_expression(inner)?),
                _ => {}
            }
        }

        let expr = expr.ok_or_else(|| TraversalError::parse(line, column, "RETURN requires an expression"))?;
        Ok(ReturnClause { distinct, expr })
    }

    /// Parse the first `expression` child of a clause
    fn first_expression(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::expression {
                return self.parse_expression(inner);
            }
        }
        Err(TraversalError::parse(line, column, "expected expression"))
    }

    /// Parse expression
    fn parse_expression(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        // expression = { or_expr }
        let (line, column) = syntax_position(&pair);
        for inner in pair.into_inner() {
            if inner.as_rule() == Rule::or_expr {
                return self.parse_or_expr(inner);
            }
        }
        Err(TraversalError::parse(line, column, "empty expression"))
    }

    /// Parse OR expression
    fn parse_or_expr(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        pair.into_inner()
            .filter(|p| p.as_rule() == Rule::and_expr)
            .map(|p| self.parse_and_expr(p))
            .reduce(|left, right| Ok(Expr::binary(left?, BinaryOp::Or, right?)))
            .unwrap_or_else(|| Err(TraversalError::parse(line, column, "empty OR expression")))
    }

    /// Parse AND expression
    fn parse_and_expr(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        pair.into_inner()
            .filter(|p| p.as_rule() == Rule::not_expr)
            .map(|p| self.parse_not_expr(p))
            .reduce(|left, right| Ok(Expr::binary(left?, BinaryOp::And, right?)))
            .unwrap_or_else(|| Err(TraversalError::parse(line, column, "empty AND expression")))
    }

    /// Parse NOT expression
    fn parse_not_expr(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut not_count = 0;
        let mut comparison = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::not_op => not_count += 1,
                Rule::comparison => comparison = Some(self.parse_comparison(inner)?),
                _ => {}
            }
        }

        let mut result =
            comparison.ok_or_else(|| TraversalError::parse(line, column, "missing comparison"))?;
        for _ in 0..not_count {
            result = Expr::unary(UnaryOp::Not, result);
        }
        Ok(result)
    }

    /// Parse comparison, optionally quantified (`list ALL == x`)
    fn parse_comparison(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut inner = pair.into_inner();

        let left = match inner.next() {
            Some(first) if first.as_rule() == Rule::additive => self.parse_additive(first)?,
            _ => return Err(TraversalError::parse(line, column, "empty comparison")),
        };

        let Some(tail) = inner.next() else {
            return Ok(left);
        };

        let mut quantifier = None;
        let mut op = None;
        let mut right = None;
        for part in tail.into_inner() {
            match part.as_rule() {
                Rule::quantifier => quantifier = Some(self.parse_quantifier(part)?),
                Rule::comparison_op => op = Some(self.parse_comparison_op(part)?),
                Rule::additive => right = Some(self.parse_additive(part)?),
                _ => {}
            }
        }

        let (Some(op), Some(right)) = (op, right) else {
            return Err(TraversalError::parse(line, column, "incomplete comparison"));
        };

        Ok(match quantifier {
            Some(quantifier) => Expr::Quantified {
                quantifier,
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            None => Expr::binary(left, op, right),
        })
    }

    fn parse_quantifier(&self, pair: Pair<Rule>) -> TraversalResult<Quantifier> {
        let (line, column) = syntax_position(&pair);
        match pair.into_inner().next().map(|p| p.as_rule()) {
            Some(Rule::kw_all) => Ok(Quantifier::All),
            Some(Rule::kw_any) => Ok(Quantifier::Any),
            Some(Rule::kw_none) => Ok(Quantifier::None),
            _ => Err(TraversalError::parse(line, column, "expected ALL, ANY or NONE")),
        }
    }

    /// Parse comparison operator
    fn parse_comparison_op(&self, pair: Pair<Rule>) -> TraversalResult<BinaryOp> {
        let (line, column) = syntax_position(&pair);
        let text = pair.as_str();
        match pair.into_inner().next().map(|p| p.as_rule()) {
            Some(Rule::not_in) => return Ok(BinaryOp::NotIn),
            Some(Rule::kw_in) => return Ok(BinaryOp::In),
            _ => {}
        }
        match text {
            "==" => Ok(BinaryOp::Eq),
            "!=" => Ok(BinaryOp::Neq),
            "<" => Ok(BinaryOp::Lt),
            "<=" => Ok(BinaryOp::Lte),
            ">" => Ok(BinaryOp::Gt),
            ">=" => Ok(BinaryOp::Gte),
            other => Err(TraversalError::parse(
                line,
                column,
                format!("unknown comparison operator: {}", other),
            )),
        }
    }

    /// Parse addition / subtraction chain
    fn parse_additive(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut result = None;
        let mut pending_op = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::add_op => {
                    pending_op = Some(if inner.as_str() == "+" {
                        BinaryOp::Add
                    } else {
                        BinaryOp::Sub
                    });
                }
                Rule::multiplicative => {
                    let right = self.parse_multiplicative(inner)?;
                    result = Some(match (result, pending_op.take()) {
                        (Some(left), Some(op)) => Expr::binary(left, op, right),
                        _ => right,
                    });
                }
                _ => {}
            }
        }

        result.ok_or_else(|| TraversalError::parse(line, column, "empty addition"))
    }

    /// Parse multiplication / division / modulo chain
    fn parse_multiplicative(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut result = None;
        let mut pending_op = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::mul_op => {
                    pending_op = Some(match inner.as_str() {
                        "*" => BinaryOp::Mul,
                        "/" => BinaryOp::Div,
                        _ => BinaryOp::Mod,
                    });
                }
                Rule::unary => {
                    let right = self.parse_unary(inner)?;
                    result = Some(match (result, pending_op.take()) {
                        (Some(left), Some(op)) => Expr::binary(left, op, right),
                        _ => right,
                    });
                }
                _ => {}
            }
        }

        result.ok_or_else(|| TraversalError::parse(line, column, "empty multiplication"))
    }

    /// Parse unary expression; `-<number>` folds into a negative literal
    fn parse_unary(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut ops = Vec::new();
        let mut operand = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::unary_op => ops.push(if inner.as_str() == "-" {
                    UnaryOp::Neg
                } else {
                    UnaryOp::Pos
                }),
                Rule::postfix => operand = Some(self.parse_postfix(inner)?),
                _ => {}
            }
        }

        let mut result = operand.ok_or_else(|| TraversalError::parse(line, column, "missing operand"))?;
        for op in ops.into_iter().rev() {
            result = match (op, result) {
                (UnaryOp::Neg, Expr::Literal(Value::Int(i))) if i != i64::MIN => Expr::Literal(Value::Int(-i)),
                (UnaryOp::Neg, Expr::Literal(Value::Float(f))) => Expr::Literal(Value::Float(-f)),
                (op, expr) => Expr::unary(op, expr),
            };
        }
        Ok(result)
    }

    /// Parse a primary with its attribute, index and expansion accessors
    fn parse_postfix(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut result: Option<Expr> = None;
        // Accessors after `[*]` apply to each element
        let mut projection: Option<Vec<Accessor>> = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::primary => result = Some(self.parse_primary(inner)?),
                Rule::attribute_access => {
                    let name = self.accessor_name(inner)?;
                    match projection.as_mut() {
                        Some(accessors) => accessors.push(Accessor::Attribute(name)),
                        None => {
                            let base = result.take().ok_or_else(|| {
                                TraversalError::parse(line, column, "attribute access without operand")
                            })?;
                            result = Some(Expr::attribute(base, name));
                        }
                    }
                }
                Rule::index_access => {
                    let index = self.first_expression(inner)?;
                    match projection.as_mut() {
                        Some(accessors) => accessors.push(Accessor::Index(index)),
                        None => {
                            let base = result.take().ok_or_else(|| {
                                TraversalError::parse(line, column, "index access without operand")
                            })?;
                            result = Some(Expr::index(base, index));
                        }
                    }
                }
                Rule::expansion_access => {
                    let base = result.take().ok_or_else(|| {
                        TraversalError::parse(line, column, "expansion without operand")
                    })?;
                    // A nested `[*]` closes the current expansion first
                    let base = match projection.take() {
                        Some(accessors) => Expr::Expansion {
                            expr: Box::new(base),
                            projection: accessors,
                        },
                        None => base,
                    };
                    result = Some(base);
                    projection = Some(Vec::new());
                }
                _ => {}
            }
        }

        let result = result.ok_or_else(|| TraversalError::parse(line, column, "missing primary"))?;
        Ok(match projection {
            Some(projection) => Expr::Expansion {
                expr: Box::new(result),
                projection,
            },
            None => result,
        })
    }

    fn accessor_name(&self, pair: Pair<Rule>) -> TraversalResult<String> {
        let (line, column) = syntax_position(&pair);
        pair.into_inner()
            .find(|p| p.as_rule() == Rule::attribute_name)
            .map(|p| p.as_str().to_string())
            .ok_or_else(|| TraversalError::parse(line, column, "expected attribute name"))
    }

    /// Parse primary expression
    fn parse_primary(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| TraversalError::parse(line, column, "empty primary"))?;

        match inner.as_rule() {
            Rule::literal => self.parse_literal(inner).map(Expr::Literal),
            Rule::value_parameter => Ok(Expr::Parameter(inner.as_str()[1..].to_string())),
            Rule::function_call => self.parse_function_call(inner),
            Rule::array_literal => {
                let items = inner
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::expression)
                    .map(|p| self.parse_expression(p))
                    .collect::<TraversalResult<Vec<_>>>()?;
                Ok(Expr::Array(items))
            }
            Rule::object_literal => self.parse_object_literal(inner),
            Rule::expression => self.parse_expression(inner),
            Rule::identifier => Ok(Expr::Variable(inner.as_str().to_string())),
            other => Err(TraversalError::parse(
                line,
                column,
                format!("unexpected token: {:?}", other),
            )),
        }
    }

    /// Parse literal value
    fn parse_literal(&self, pair: Pair<Rule>) -> TraversalResult<Value> {
        let (line, column) = syntax_position(&pair);
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| TraversalError::parse(line, column, "empty literal"))?;

        match inner.as_rule() {
            Rule::null_literal => Ok(Value::Null),
            Rule::boolean_literal => Ok(Value::Bool(inner.as_str().eq_ignore_ascii_case("true"))),
            Rule::number => {
                let text = inner.as_str();
                if !text.contains(['.', 'e', 'E']) {
                    if let Ok(i) = text.parse::<i64>() {
                        return Ok(Value::Int(i));
                    }
                }
                text.parse::<f64>()
                    .map(Value::float)
                    .map_err(|_| TraversalError::parse(line, column, format!("invalid number: {}", text)))
            }
            Rule::string_literal => self.parse_string_literal(inner).map(Value::from),
            other => Err(TraversalError::parse(
                line,
                column,
                format!("unexpected literal: {:?}", other),
            )),
        }
    }

    /// Parse a quoted string and resolve escape sequences
    fn parse_string_literal(&self, pair: Pair<Rule>) -> TraversalResult<String> {
        let (line, column) = syntax_position(&pair);
        let raw = pair
            .into_inner()
            .next()
            .map(|p| p.as_str())
            .unwrap_or_default();
        unescape(raw).ok_or_else(|| TraversalError::parse(line, column, "invalid escape sequence"))
    }

    fn parse_function_call(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let (line, column) = syntax_position(&pair);
        let mut name = None;
        let mut args = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::function_name => name = Some(inner.as_str().to_ascii_uppercase()),
                Rule::expression => args.push(self.parse_expression(inner)?),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| TraversalError::parse(line, column, "missing function name"))?;
        Ok(Expr::FunctionCall { name, args })
    }

    fn parse_object_literal(&self, pair: Pair<Rule>) -> TraversalResult<Expr> {
        let mut entries = Vec::new();

        for entry in pair.into_inner() {
            if entry.as_rule() != Rule::object_entry {
                continue;
            }
            let (line, column) = syntax_position(&entry);
            let mut key = None;
            let mut value = None;
            for inner in entry.into_inner() {
                match inner.as_rule() {
                    Rule::object_key => {
                        let token = inner
                            .into_inner()
                            .next()
                            .ok_or_else(|| TraversalError::parse(line, column, "empty object key"))?;
                        key = Some(match token.as_rule() {
                            Rule::string_literal => self.parse_string_literal(token)?,
                            _ => token.as_str().to_string(),
                        });
                    }
                    Rule::expression => value = Some(self.parse_expression(inner)?),
                    _ => {}
                }
            }
            match (key, value) {
                (Some(key), Some(value)) => entries.push((key, value)),
                _ => return Err(TraversalError::parse(line, column, "incomplete object entry")),
            }
        }

        Ok(Expr::Object(entries))
    }

    /// Convert pest error to a parse error with position
    fn pest_error_to_traversal(&self, error: pest::error::Error<Rule>) -> TraversalError {
        let (line, column) = match error.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };

        TraversalError::QueryParse {
            line,
            column,
            message: error.variant.message().to_string(),
        }
    }
}

impl Default for AqlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn syntax_position(pair: &Pair<Rule>) -> (usize, usize) {
    pair.line_col()
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            other => out.push(other),
        }
    }
    Some(out)
}

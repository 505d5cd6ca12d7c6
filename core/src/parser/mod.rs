//! Parser - PEST-based parser for the Tempo language
//!
//! Produces the AST consumed by the executor, with span information for
//! error reporting.

use std::rc::Rc;

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::errors::{ErrorKind, ScriptError};
use crate::executor::types::ast::{
    AssignOp, BinaryOp, Expr, FuncDecl, ImportBinding, MemberAccess, Program, Span, Stmt,
    StmtRef, UnaryOp,
};
use crate::lexer;

pub mod semantic_validator;

#[cfg(test)]
mod tests;

/* ===================== PEST Parser ===================== */

#[derive(Parser)]
#[grammar = "lexer/tokens.pest"]
#[grammar = "parser/tempo.pest"]
struct TempoParser;

/* ===================== Error Types ===================== */

#[derive(Debug)]
pub enum ParseError {
    PestError(String, Option<Span>),
    BuildError(String, Option<Span>),
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::PestError(_, span) => *span,
            ParseError::BuildError(_, span) => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::PestError(msg, _) => msg,
            ParseError::BuildError(msg, _) => msg,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ParseError {}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (start, end) = match err.location {
            pest::error::InputLocation::Pos(pos) => (pos, pos),
            pest::error::InputLocation::Span(span) => span,
        };
        let span = match err.line_col {
            pest::error::LineColLocation::Pos((line, col)) => Span {
                start,
                end,
                start_line: line.saturating_sub(1),
                start_col: col.saturating_sub(1),
                end_line: line.saturating_sub(1),
                end_col: col,
            },
            pest::error::LineColLocation::Span((start_line, start_col), (end_line, end_col)) => {
                Span {
                    start,
                    end,
                    start_line: start_line.saturating_sub(1),
                    start_col: start_col.saturating_sub(1),
                    end_line: end_line.saturating_sub(1),
                    end_col: end_col.saturating_sub(1),
                }
            }
        };
        let message = match &err.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                let expected: Vec<String> = positives.iter().map(describe_rule).collect();
                format!("expected {}", expected.join(", "))
            }
            _ => err.variant.message().to_string(),
        };
        ParseError::PestError(message, Some(span))
    }
}

impl From<ParseError> for ScriptError {
    fn from(err: ParseError) -> Self {
        let mut script_err = ScriptError::new(ErrorKind::SyntaxError, err.message());
        script_err.span = err.span();
        script_err
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn describe_rule(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input".to_string(),
        Rule::expression => "expression".to_string(),
        Rule::statement => "statement".to_string(),
        Rule::identifier => "identifier".to_string(),
        Rule::block => "block".to_string(),
        Rule::string => "string".to_string(),
        Rule::assign_op => "'='".to_string(),
        other => format!("{:?}", other).replace('_', " "),
    }
}

/* ===================== Span Helpers ===================== */

/// Convert a PEST pair's span to our Span type
fn pair_to_span(pair: &Pair<Rule>, source: &str) -> Span {
    let pest_span = pair.as_span();
    let start = pest_span.start();
    let end = pest_span.end();

    let (start_line, start_col) = offset_to_line_col(source, start);
    let (end_line, end_col) = offset_to_line_col(source, end);

    Span::new(start, end, start_line, start_col, end_line, end_col)
}

/// Convert byte offset to (line, column) - 0-indexed
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    let mut current_offset = 0;

    for ch in source.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_var
            | Rule::kw_func
            | Rule::kw_return
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_if
            | Rule::kw_else
            | Rule::kw_while
            | Rule::kw_for
            | Rule::kw_in
            | Rule::kw_import
            | Rule::kw_from
            | Rule::kw_as
    )
}

/// Inner pairs of a rule with keyword tokens filtered out
fn children<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

/// Next child that the grammar guarantees to be present
fn required<'i>(
    inner: &mut impl Iterator<Item = Pair<'i, Rule>>,
    what: &str,
    span: Span,
) -> ParseResult<Pair<'i, Rule>> {
    inner
        .next()
        .ok_or_else(|| ParseError::BuildError(format!("Missing {}", what), Some(span)))
}

/* ===================== Public API ===================== */

/// Parse Tempo source into a program
///
/// The source is tokenized first so lexical problems are reported as
/// `LexicalError` rather than as a generic syntax error.
pub fn parse_program(source: &str) -> Result<Program, ScriptError> {
    lexer::tokenize(source)?;
    Ok(parse(source)?)
}

/// Parse Tempo source into a program, without the lexical pre-pass
pub fn parse(source: &str) -> ParseResult<Program> {
    let mut pairs = TempoParser::parse(Rule::program, source)?;
    let program = pairs
        .next()
        .ok_or_else(|| ParseError::BuildError("Empty parse result".to_string(), None))?;
    let span = pair_to_span(&program, source);
    let body = build_statements(program.into_inner(), source)?;
    Ok(Program { body, span })
}

/* ===================== AST Builder ===================== */

fn build_statements(pairs: Pairs<Rule>, source: &str) -> ParseResult<Vec<StmtRef>> {
    pairs
        .filter(|p| p.as_rule() == Rule::statement)
        .map(|p| build_statement(p, source).map(Rc::new))
        .collect()
}

fn build_statement(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::statement => {
            let inner = required(&mut pair.into_inner(), "statement", span)?;
            build_statement(inner, source)
        }
        Rule::import_stmt => build_import_stmt(pair, source),
        Rule::from_import_stmt => build_from_import_stmt(pair, source),
        Rule::func_decl => {
            let decl = build_func(pair, source)?;
            Ok(Stmt::Func {
                decl: Rc::new(decl),
                span,
            })
        }
        Rule::var_stmt => build_var_stmt(pair, source),
        Rule::return_stmt => {
            let value = children(pair)
                .next()
                .map(|expr_pair| build_expression(expr_pair, source))
                .transpose()?;
            Ok(Stmt::Return { value, span })
        }
        Rule::break_stmt => Ok(Stmt::Break { span }),
        Rule::continue_stmt => Ok(Stmt::Continue { span }),
        Rule::if_stmt => build_if_stmt(pair, source),
        Rule::while_stmt => build_while_stmt(pair, source),
        Rule::for_stmt => build_for_stmt(pair, source),
        Rule::block => build_block(pair, source),
        Rule::assign_stmt => build_assign_stmt(pair, source),
        Rule::expr_stmt => {
            let expr_pair = required(&mut pair.into_inner(), "expression", span)?;
            let expr = build_expression(expr_pair, source)?;
            Ok(Stmt::Expr { expr, span })
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected statement rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_block(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let body = build_statements(pair.into_inner(), source)?;
    Ok(Stmt::Block { body, span })
}

fn string_value(pair: &Pair<Rule>) -> String {
    let raw = pair.as_str();
    lexer::unescape(&raw[1..raw.len() - 1])
}

fn build_import_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let specifier = string_value(&required(&mut inner, "module specifier", span)?);
    let binding = match inner.next() {
        Some(alias) => {
            let name_pair = required(&mut children(alias), "alias name", span)?;
            ImportBinding::Alias {
                name: name_pair.as_str().to_string(),
            }
        }
        None => ImportBinding::Module,
    };

    Ok(Stmt::Import {
        specifier,
        binding,
        span,
    })
}

fn build_from_import_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let specifier = string_value(&required(&mut inner, "module specifier", span)?);
    let name = required(&mut inner, "imported name", span)?
        .as_str()
        .to_string();

    Ok(Stmt::Import {
        specifier,
        binding: ImportBinding::Export { name },
        span,
    })
}

/// Build a function from `func_decl` or `func_expr`
fn build_func(pair: Pair<Rule>, source: &str) -> ParseResult<FuncDecl> {
    let span = pair_to_span(&pair, source);
    let mut name = None;
    let mut params = Vec::new();
    let mut body = Vec::new();

    for child in children(pair) {
        match child.as_rule() {
            Rule::identifier => name = Some(child.as_str().to_string()),
            Rule::param_list => {
                for param in child.into_inner() {
                    let param_name = param.as_str().to_string();
                    if params.contains(&param_name) {
                        return Err(ParseError::BuildError(
                            format!("Duplicate parameter '{}'", param_name),
                            Some(pair_to_span(&param, source)),
                        ));
                    }
                    params.push(param_name);
                }
            }
            Rule::block => body = build_statements(child.into_inner(), source)?,
            _ => {}
        }
    }

    Ok(FuncDecl {
        name,
        params,
        body,
        span,
    })
}

fn build_var_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let name_pair = required(&mut inner, "variable name", span)?;
    let name_span = pair_to_span(&name_pair, source);
    let name = name_pair.as_str().to_string();

    let init = inner
        .next()
        .map(|expr_pair| build_expression(expr_pair, source))
        .transpose()?;

    Ok(Stmt::Var {
        name,
        name_span,
        init,
        span,
    })
}

fn build_if_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let test = build_expression(required(&mut inner, "condition", span)?, source)?;
    let then_s = build_statement(required(&mut inner, "if body", span)?, source)?;

    let else_s = match inner.next() {
        Some(else_clause) => {
            let else_inner = required(&mut children(else_clause), "else body", span)?;
            Some(Rc::new(build_statement(else_inner, source)?))
        }
        None => None,
    };

    Ok(Stmt::If {
        test,
        then_s: Rc::new(then_s),
        else_s,
        span,
    })
}

fn build_while_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let test = build_expression(required(&mut inner, "condition", span)?, source)?;
    let body = build_statement(required(&mut inner, "loop body", span)?, source)?;

    Ok(Stmt::While {
        test,
        body: Rc::new(body),
        span,
    })
}

fn build_for_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = children(pair);

    let binding_pair = required(&mut inner, "loop variable", span)?;
    let binding_span = pair_to_span(&binding_pair, source);
    let binding = binding_pair.as_str().to_string();

    let iterable = build_expression(required(&mut inner, "iterable", span)?, source)?;
    let body = build_statement(required(&mut inner, "loop body", span)?, source)?;

    Ok(Stmt::ForIn {
        binding,
        binding_span,
        iterable,
        body: Rc::new(body),
        span,
    })
}

fn build_assign_stmt(pair: Pair<Rule>, source: &str) -> ParseResult<Stmt> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let var_pair = required(&mut inner, "assignment target", span)?;
    let var_span = pair_to_span(&var_pair, source);
    let var = var_pair.as_str().to_string();

    let mut path = Vec::new();
    let mut op = AssignOp::Set;
    let mut value = None;

    for pair in inner {
        match pair.as_rule() {
            Rule::assign_path_segment => {
                let segment_span = pair_to_span(&pair, source);
                let segment_inner = required(&mut pair.into_inner(), "path segment", span)?;
                match segment_inner.as_rule() {
                    Rule::identifier => path.push(MemberAccess::Prop {
                        property: segment_inner.as_str().to_string(),
                        span: segment_span,
                    }),
                    _ => path.push(MemberAccess::Index {
                        expr: build_expression(segment_inner, source)?,
                        span: segment_span,
                    }),
                }
            }
            Rule::assign_op => {
                op = match pair.as_str() {
                    "+=" => AssignOp::Add,
                    "-=" => AssignOp::Sub,
                    "*=" => AssignOp::Mul,
                    "/=" => AssignOp::Div,
                    _ => AssignOp::Set,
                };
            }
            Rule::expression => {
                value = Some(build_expression(pair, source)?);
                break;
            }
            _ => {}
        }
    }

    let value = value.ok_or_else(|| {
        ParseError::BuildError("Missing assigned value".to_string(), Some(span))
    })?;
    Ok(Stmt::Assign {
        var,
        var_span,
        path,
        op,
        value,
        span,
    })
}

fn binary_op(rule: Rule) -> Option<BinaryOp> {
    Some(match rule {
        Rule::op_or => BinaryOp::Or,
        Rule::op_and => BinaryOp::And,
        Rule::op_eq => BinaryOp::Eq,
        Rule::op_ne => BinaryOp::Ne,
        Rule::op_lt => BinaryOp::Lt,
        Rule::op_lte => BinaryOp::Lte,
        Rule::op_gt => BinaryOp::Gt,
        Rule::op_gte => BinaryOp::Gte,
        Rule::op_add => BinaryOp::Add,
        Rule::op_sub => BinaryOp::Sub,
        Rule::op_mul => BinaryOp::Mul,
        Rule::op_div => BinaryOp::Div,
        Rule::op_mod => BinaryOp::Mod,
        _ => return None,
    })
}

fn build_binary_expr(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();

    let mut left = build_expression(required(&mut inner, "operand", span)?, source)?;

    while let Some(op_pair) = inner.next() {
        let op = binary_op(op_pair.as_rule()).ok_or_else(|| {
            ParseError::BuildError(
                format!("Expected operator, got {:?}", op_pair.as_rule()),
                Some(span),
            )
        })?;
        let right_pair = inner.next().ok_or_else(|| {
            ParseError::BuildError(
                "Missing right operand after operator".to_string(),
                Some(span),
            )
        })?;
        let right = build_expression(right_pair, source)?;
        let new_span = left.span().merge(&right.span());

        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: new_span,
        };
    }

    Ok(left)
}

fn build_expression(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);

    match pair.as_rule() {
        Rule::expression | Rule::primary | Rule::literal | Rule::paren_expr => {
            let inner = required(&mut pair.into_inner(), "expression", span)?;
            build_expression(inner, source)
        }
        Rule::logical_or_expr
        | Rule::logical_and_expr
        | Rule::equality_expr
        | Rule::comparison_expr
        | Rule::additive_expr
        | Rule::multiplicative_expr => build_binary_expr(pair, source),
        Rule::unary_expr => {
            let mut inner = pair.into_inner();
            let first = required(&mut inner, "operand", span)?;

            let op = match first.as_rule() {
                Rule::op_not => UnaryOp::Not,
                Rule::op_neg => UnaryOp::Neg,
                _ => return build_expression(first, source),
            };
            let operand = build_expression(required(&mut inner, "operand", span)?, source)?;
            Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            })
        }
        Rule::call_expr => build_call_expr(pair, source),
        Rule::func_expr => {
            let decl = build_func(pair, source)?;
            Ok(Expr::Func {
                decl: Rc::new(decl),
                span,
            })
        }
        Rule::identifier => Ok(Expr::Ident {
            name: pair.as_str().to_string(),
            span,
        }),
        Rule::integer => {
            let text = pair.as_str();
            let value = text.parse::<i64>().map_err(|e| {
                ParseError::BuildError(
                    format!("Failed to parse integer '{}': {}", text, e),
                    Some(span),
                )
            })?;
            Ok(Expr::LitInt { v: value, span })
        }
        Rule::float => {
            let text = pair.as_str();
            let value = text.parse::<f64>().map_err(|e| {
                ParseError::BuildError(
                    format!("Failed to parse number '{}': {}", text, e),
                    Some(span),
                )
            })?;
            Ok(Expr::LitFloat { v: value, span })
        }
        Rule::boolean => Ok(Expr::LitBool {
            v: pair.as_str() == "true",
            span,
        }),
        Rule::string => Ok(Expr::LitStr {
            v: string_value(&pair),
            span,
        }),
        Rule::nil_lit => Ok(Expr::LitNil { span }),
        Rule::object_lit => build_object_literal(pair, source),
        Rule::array_lit => {
            let elements = match pair.into_inner().next() {
                Some(list) => build_expression_list(list, source)?,
                None => vec![],
            };
            Ok(Expr::LitList { elements, span })
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected expression rule: {:?}", pair.as_rule()),
            Some(span),
        )),
    }
}

fn build_call_expr(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let mut inner = pair.into_inner();
    let mut expr = build_expression(required(&mut inner, "callee", span)?, source)?;

    for postfix_pair in inner {
        let postfix_span = pair_to_span(&postfix_pair, source);
        let postfix_inner = required(&mut postfix_pair.into_inner(), "postfix", span)?;
        let new_span = expr.span().merge(&postfix_span);

        expr = match postfix_inner.as_rule() {
            Rule::call_suffix => {
                let args = match postfix_inner.into_inner().next() {
                    Some(arg_list) => build_expression_list(arg_list, source)?,
                    None => vec![],
                };
                Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span: new_span,
                }
            }
            Rule::member_access => {
                let prop_pair = required(&mut postfix_inner.into_inner(), "property", span)?;
                Expr::Member {
                    object: Box::new(expr),
                    property: prop_pair.as_str().to_string(),
                    property_span: pair_to_span(&prop_pair, source),
                    span: new_span,
                }
            }
            Rule::index_access => {
                let index_pair = required(&mut postfix_inner.into_inner(), "index", span)?;
                Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(build_expression(index_pair, source)?),
                    span: new_span,
                }
            }
            other => {
                return Err(ParseError::BuildError(
                    format!("Unexpected postfix rule: {:?}", other),
                    Some(postfix_span),
                ))
            }
        };
    }

    Ok(expr)
}

fn build_expression_list(pair: Pair<Rule>, source: &str) -> ParseResult<Vec<Expr>> {
    pair.into_inner()
        .map(|expr_pair| build_expression(expr_pair, source))
        .collect()
}

fn build_object_literal(pair: Pair<Rule>, source: &str) -> ParseResult<Expr> {
    let span = pair_to_span(&pair, source);
    let properties = match pair.into_inner().next() {
        Some(list) => list
            .into_inner()
            .map(|property| build_property(property, source))
            .collect::<ParseResult<Vec<_>>>()?,
        None => vec![],
    };
    Ok(Expr::LitObj { properties, span })
}

fn build_property(pair: Pair<Rule>, source: &str) -> ParseResult<(String, Span, Expr)> {
    let span = pair_to_span(&pair, source);
    let inner = required(&mut pair.into_inner(), "property", span)?;
    let inner_span = pair_to_span(&inner, source);

    match inner.as_rule() {
        Rule::property_pair => {
            let mut inner_pairs = inner.into_inner();
            let key_pair = required(&mut inner_pairs, "property key", inner_span)?;
            let key_span = pair_to_span(&key_pair, source);
            let key = match key_pair.as_rule() {
                Rule::string => string_value(&key_pair),
                _ => key_pair.as_str().to_string(),
            };
            let value_pair = required(&mut inner_pairs, "property value", inner_span)?;
            let value = build_expression(value_pair, source)?;
            Ok((key, key_span, value))
        }
        Rule::property_shorthand => {
            let key = inner.as_str().to_string();
            let value = Expr::Ident {
                name: key.clone(),
                span: inner_span,
            };
            Ok((key, inner_span, value))
        }
        _ => Err(ParseError::BuildError(
            format!("Unexpected property rule: {:?}", inner.as_rule()),
            Some(inner_span),
        )),
    }
}

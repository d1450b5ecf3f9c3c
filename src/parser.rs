// src/parser.rs
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use log::{error, trace};
use once_cell::sync::Lazy;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use regex::Regex;

use crate::errors::ExpressionError;
use crate::expression::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::types::{Number, Value};

// Derive the parser using the grammar file
#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionParser;

lazy_static! {
    static ref BARE_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
}

const KEYWORDS: &[&str] = &["true", "false", "null", "undefined"];

/// Compiled expressions, shared by every engine in the process and keyed by
/// source text. Entries never go stale, so nothing is ever evicted.
static EXPRESSION_CACHE: Lazy<RwLock<HashMap<String, Arc<Expr>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A lone identifier that can be resolved without going through the grammar.
pub fn bare_identifier(source: &str) -> Option<&str> {
    let trimmed = source.trim();
    if BARE_IDENTIFIER.is_match(trimmed) && !KEYWORDS.contains(&trimmed) {
        Some(trimmed)
    } else {
        None
    }
}

/// Parses `source` into an expression tree, reusing a cached tree when the
/// same text was compiled before.
pub fn compile(source: &str) -> Result<Arc<Expr>, ExpressionError> {
    {
        let cache = EXPRESSION_CACHE.read().map_err(|_| {
            error!("Failed to acquire read lock on expression cache");
            ExpressionError::Internal("Expression cache lock poisoned".to_string())
        })?;
        if let Some(expr) = cache.get(source) {
            trace!("Expression cache hit for {:?}", source);
            return Ok(Arc::clone(expr));
        }
    }

    let expr = Arc::new(parse_expression(source)?);
    let mut cache = EXPRESSION_CACHE.write().map_err(|_| {
        error!("Failed to acquire write lock on expression cache");
        ExpressionError::Internal("Expression cache lock poisoned".to_string())
    })?;
    cache.insert(source.to_string(), Arc::clone(&expr));
    Ok(expr)
}

pub fn cached_expressions() -> usize {
    EXPRESSION_CACHE.read().map(|cache| cache.len()).unwrap_or(0)
}

fn parse_expression(source: &str) -> Result<Expr, ExpressionError> {
    trace!("Parsing expression: {:?}", source);
    let mut pairs = ExpressionParser::parse(Rule::expression, source).map_err(|e| {
        ExpressionError::Grammar { expression: source.to_string(), source: Box::new(e) }
    })?;
    let root = pairs.next().ok_or_else(|| processing(source, "empty parse result"))?;
    let conditional = root
        .into_inner()
        .find(|p| p.as_rule() == Rule::conditional)
        .ok_or_else(|| processing(source, "expected an expression"))?;
    build_expr(conditional, source)
}

fn processing(source: &str, message: &str) -> ExpressionError {
    ExpressionError::syntax(source, 0, message)
}

// --- AST Building ---

fn build_expr(pair: Pair<Rule>, source: &str) -> Result<Expr, ExpressionError> {
    match pair.as_rule() {
        Rule::conditional => {
            let mut inner = pair.into_inner();
            let test = next_expr(&mut inner, source)?;
            match (inner.next(), inner.next()) {
                (Some(then), Some(otherwise)) => Ok(Expr::Conditional(
                    Box::new(test),
                    Box::new(build_expr(then, source)?),
                    Box::new(build_expr(otherwise, source)?),
                )),
                _ => Ok(test),
            }
        }
        Rule::logical_or | Rule::logical_and => build_logical(pair, source),
        Rule::equality | Rule::comparison | Rule::additive | Rule::multiplicative => {
            build_binary(pair, source)
        }
        Rule::unary => {
            let mut ops = Vec::new();
            let mut operand = None;
            for inner in pair.into_inner() {
                match inner.as_rule() {
                    Rule::unary_op => ops.push(match inner.as_str() {
                        "!" => UnaryOp::Not,
                        _ => UnaryOp::Negate,
                    }),
                    _ => operand = Some(build_expr(inner, source)?),
                }
            }
            let mut expr = operand.ok_or_else(|| processing(source, "unary operator without operand"))?;
            for op in ops.into_iter().rev() {
                expr = Expr::Unary(op, Box::new(expr));
            }
            Ok(expr)
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let mut expr = next_expr(&mut inner, source)?;
            for accessor in inner {
                expr = match accessor.as_rule() {
                    Rule::member => {
                        let name = accessor
                            .into_inner()
                            .next()
                            .map(|p| p.as_str().to_string())
                            .ok_or_else(|| processing(source, "expected a property name"))?;
                        Expr::Member(Box::new(expr), name)
                    }
                    Rule::index => {
                        let mut index = accessor.into_inner();
                        Expr::Index(Box::new(expr), Box::new(next_expr(&mut index, source)?))
                    }
                    rule => return Err(processing(source, &format!("unexpected {:?} after value", rule))),
                };
            }
            Ok(expr)
        }
        Rule::call => {
            let mut inner = pair.into_inner();
            let name = inner
                .next()
                .map(|p| p.as_str().to_string())
                .ok_or_else(|| processing(source, "expected a function name"))?;
            let args = inner.map(|arg| build_expr(arg, source)).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Call(name, args))
        }
        Rule::array => {
            let items = pair.into_inner().map(|item| build_expr(item, source)).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Array(items))
        }
        Rule::object => {
            let mut entries = Vec::new();
            for entry in pair.into_inner() {
                let mut inner = entry.into_inner();
                let key_pair = inner.next().ok_or_else(|| processing(source, "expected an object key"))?;
                let key = match key_pair.as_rule() {
                    Rule::string => unquote(key_pair),
                    _ => key_pair.as_str().to_string(),
                };
                entries.push((key, next_expr(&mut inner, source)?));
            }
            Ok(Expr::Object(entries))
        }
        Rule::identifier => Ok(Expr::Identifier(pair.as_str().to_string())),
        Rule::number => parse_number(pair.as_str())
            .map(|n| Expr::Literal(Value::Number(n)))
            .ok_or_else(|| processing(source, &format!("invalid number `{}`", pair.as_str()))),
        Rule::string => Ok(Expr::Literal(Value::String(unquote(pair)))),
        Rule::boolean => Ok(Expr::Literal(Value::Bool(pair.as_str() == "true"))),
        Rule::null => Ok(Expr::Literal(Value::Null)),
        Rule::undefined => Ok(Expr::Literal(Value::Undefined)),
        rule => {
            error!("Unexpected rule in expression {:?}: {:?}", source, rule);
            Err(processing(source, &format!("unexpected {:?}", rule)))
        }
    }
}

fn next_expr(pairs: &mut pest::iterators::Pairs<Rule>, source: &str) -> Result<Expr, ExpressionError> {
    let pair = pairs.next().ok_or_else(|| processing(source, "expected an operand"))?;
    build_expr(pair, source)
}

fn build_logical(pair: Pair<Rule>, source: &str) -> Result<Expr, ExpressionError> {
    let mut inner = pair.into_inner();
    let mut expr = next_expr(&mut inner, source)?;
    while let Some(op) = inner.next() {
        let op = match op.as_rule() {
            Rule::and_op => LogicalOp::And,
            _ => LogicalOp::Or,
        };
        let rhs = next_expr(&mut inner, source)?;
        expr = Expr::Logical(op, Box::new(expr), Box::new(rhs));
    }
    Ok(expr)
}

fn build_binary(pair: Pair<Rule>, source: &str) -> Result<Expr, ExpressionError> {
    let mut inner = pair.into_inner();
    let mut expr = next_expr(&mut inner, source)?;
    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "===" => BinaryOp::StrictEq,
            "!==" => BinaryOp::StrictNe,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            other => return Err(processing(source, &format!("unknown operator `{}`", other))),
        };
        let rhs = next_expr(&mut inner, source)?;
        expr = Expr::Binary(op, Box::new(expr), Box::new(rhs));
    }
    Ok(expr)
}

fn parse_number(raw: &str) -> Option<Number> {
    if let Ok(i) = raw.parse::<i64>() {
        Some(Number::Int(i))
    } else {
        raw.parse::<f64>().ok().map(Number::Float)
    }
}

/// Strips the quotes of a string literal and resolves doubled quotes and
/// backslash escapes.
fn unquote(pair: Pair<Rule>) -> String {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("''");
    let quote = raw.chars().next().unwrap_or('\'');
    let inner_str = &raw[1..raw.len().saturating_sub(1).max(1)];
    let mut unescaped = String::with_capacity(inner_str.len());
    let mut chars = inner_str.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => unescaped.push('\n'),
                Some('r') => unescaped.push('\r'),
                Some('t') => unescaped.push('\t'),
                Some(other) => unescaped.push(other),
                None => unescaped.push('\\'),
            }
        } else if c == quote && chars.peek() == Some(&quote) {
            chars.next();
            unescaped.push(quote);
        } else {
            unescaped.push(c);
        }
    }
    unescaped
}

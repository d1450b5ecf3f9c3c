//! Tree form and interpreter of the default-modifier language.
//!
//! Bare identifiers are looked up through a `VariableResolver`; property
//! names after `.` are literal keys. Logical operators short-circuit and
//! return operand values, so only the branches that actually run count as
//! dependencies.

use std::cmp::Ordering;

use log::trace;

use crate::errors::ExpressionError;
use crate::registry::{FunctionResolver, VariableResolver};
use crate::types::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Identifier(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

pub trait Resolver: VariableResolver + FunctionResolver {}

impl<T: VariableResolver + FunctionResolver> Resolver for T {}

impl Expr {
    pub fn evaluate(&self, resolver: &dyn Resolver) -> Result<Value, ExpressionError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => {
                let value = resolver.get_variable(name).unwrap_or(Value::Undefined);
                trace!("Resolved identifier '{}' to {}", name, value.type_name());
                Ok(value)
            }
            Expr::Member(target, property) => {
                let target = target.evaluate(resolver)?;
                member(&target, property)
            }
            Expr::Index(target, index) => {
                let target = target.evaluate(resolver)?;
                let index = index.evaluate(resolver)?;
                match (&target, &index) {
                    (Value::List(items), Value::Number(n)) => Ok(n
                        .as_i64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(Value::Undefined)),
                    (Value::String(s), Value::Number(n)) => Ok(n
                        .as_i64()
                        .and_then(|i| usize::try_from(i).ok())
                        .and_then(|i| s.chars().nth(i))
                        .map(|c| Value::String(c.to_string()))
                        .unwrap_or(Value::Undefined)),
                    _ => member(&target, &index.to_text()),
                }
            }
            Expr::Call(name, args) => {
                let args = args.iter().map(|arg| arg.evaluate(resolver)).collect::<Result<Vec<_>, _>>()?;
                resolver.call_function(name, args)
            }
            Expr::Array(items) => Ok(Value::List(
                items.iter().map(|item| item.evaluate(resolver)).collect::<Result<Vec<_>, _>>()?,
            )),
            Expr::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.evaluate(resolver)?);
                }
                Ok(Value::Map(map))
            }
            Expr::Unary(op, operand) => {
                let value = operand.evaluate(resolver)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Negate => match value {
                        Value::Number(Number::Int(i)) => Ok(Value::Number(
                            i.checked_neg().map_or(Number::Float(-(i as f64)), Number::Int),
                        )),
                        other => Ok(Value::Number(Number::Float(-other.to_number().unwrap_or(f64::NAN)))),
                    },
                }
            }
            Expr::Logical(op, lhs, rhs) => {
                let left = lhs.evaluate(resolver)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => rhs.evaluate(resolver),
                }
            }
            Expr::Conditional(test, then, otherwise) => {
                if test.evaluate(resolver)?.is_truthy() {
                    then.evaluate(resolver)
                } else {
                    otherwise.evaluate(resolver)
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let left = lhs.evaluate(resolver)?;
                let right = rhs.evaluate(resolver)?;
                binary(*op, left, right)
            }
        }
    }
}

fn member(target: &Value, property: &str) -> Result<Value, ExpressionError> {
    match target {
        Value::Undefined | Value::Null => Err(ExpressionError::Reference {
            target: target.type_name().to_string(),
            property: property.to_string(),
        }),
        Value::Map(map) => Ok(map.get(property).cloned().unwrap_or(Value::Undefined)),
        Value::List(items) if property == "length" => Ok(Value::from(items.len())),
        Value::String(s) if property == "length" => Ok(Value::from(s.chars().count())),
        Value::List(items) => Ok(property
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Undefined)),
        _ => Ok(Value::Undefined),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExpressionError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(&left, &right))),
        BinaryOp::StrictEq => Ok(Value::Bool(left == right)),
        BinaryOp::StrictNe => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => Ok(Value::Bool(compare(&left, &right) == Some(Ordering::Less))),
        BinaryOp::Le => Ok(Value::Bool(matches!(compare(&left, &right), Some(Ordering::Less | Ordering::Equal)))),
        BinaryOp::Gt => Ok(Value::Bool(compare(&left, &right) == Some(Ordering::Greater))),
        BinaryOp::Ge => Ok(Value::Bool(matches!(compare(&left, &right), Some(Ordering::Greater | Ordering::Equal)))),
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(Number::Int(a)), Value::Number(Number::Int(b))) => Ok(a
                .checked_add(*b)
                .map(|sum| Value::Number(Number::Int(sum)))
                .unwrap_or_else(|| Value::Number(Number::Float(*a as f64 + *b as f64)))),
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", left.to_text(), right.to_text())))
            }
            (Value::List(a), Value::List(b)) => Ok(Value::List(a.iter().chain(b.iter()).cloned().collect())),
            _ => arithmetic(op, &left, &right),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, &left, &right),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
    let (Some(a), Some(b)) = (left.to_number(), right.to_number()) else {
        return Err(ExpressionError::TypeMismatch(format!(
            "cannot apply {:?} to {} and {}",
            op,
            left.type_name(),
            right.type_name()
        )));
    };
    if let (Value::Number(Number::Int(x)), Value::Number(Number::Int(y))) = (left, right) {
        let exact = match op {
            BinaryOp::Add => x.checked_add(*y),
            BinaryOp::Sub => x.checked_sub(*y),
            BinaryOp::Mul => x.checked_mul(*y),
            BinaryOp::Rem if *y != 0 => x.checked_rem(*y),
            _ => None,
        };
        if let Some(result) = exact {
            return Ok(Value::Number(Number::Int(result)));
        }
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => f64::NAN,
    };
    Ok(Value::Number(Number::from_f64(result)))
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_) | Value::Bool(_), Value::String(_))
        | (Value::String(_), Value::Number(_) | Value::Bool(_))
        | (Value::Bool(_), Value::Number(_))
        | (Value::Number(_), Value::Bool(_)) => left.to_number() == right.to_number(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number()?.partial_cmp(&right.to_number()?),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::parser::compile;
    use crate::registry::Environment;

    struct TestResolver {
        vars: HashMap<String, Value>,
        reads: RefCell<Vec<String>>,
        env: Environment,
    }

    impl VariableResolver for TestResolver {
        fn get_variable(&self, name: &str) -> Option<Value> {
            self.reads.borrow_mut().push(name.to_string());
            self.vars.get(name).cloned()
        }
    }

    impl FunctionResolver for TestResolver {
        fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
            self.env.call_function(name, args)
        }
    }

    fn resolver() -> TestResolver {
        let mut vars = HashMap::new();
        vars.insert("n".to_string(), Value::from(4));
        vars.insert("name".to_string(), Value::from("ada"));
        vars.insert("items".to_string(), Value::from(serde_json::json!([10, 20, 30])));
        vars.insert("user".to_string(), Value::from(serde_json::json!({"name": "Ada", "age": 36})));
        TestResolver { vars, reads: RefCell::new(Vec::new()), env: Environment::new() }
    }

    fn eval(source: &str) -> Result<Value, ExpressionError> {
        compile(source)?.evaluate(&resolver())
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(eval("n * 2 + 1").unwrap(), Value::from(9));
        assert_eq!(eval("n / 8").unwrap(), Value::from(0.5));
        assert_eq!(eval("n / 2").unwrap(), Value::from(2));
        assert_eq!(eval("'hi ' + name").unwrap(), Value::from("hi ada"));
        assert_eq!(eval("7 % 4").unwrap(), Value::from(3));
        assert_eq!(eval("-n").unwrap(), Value::from(-4));
    }

    #[test]
    fn negating_the_smallest_int_widens_to_float() {
        let min = eval("-9223372036854775807 - 1").unwrap();
        assert_eq!(min, Value::Number(Number::Int(i64::MIN)));
        assert_eq!(
            eval("-(-9223372036854775807 - 1)").unwrap(),
            Value::Number(Number::Float(9223372036854775808.0))
        );
        assert_eq!(eval("--n").unwrap(), Value::from(4));
    }

    #[test]
    fn member_and_index_access() {
        assert_eq!(eval("user.name").unwrap(), Value::from("Ada"));
        assert_eq!(eval("user['age']").unwrap(), Value::from(36));
        assert_eq!(eval("items[1]").unwrap(), Value::from(20));
        assert_eq!(eval("items.length").unwrap(), Value::from(3));
        assert_eq!(eval("user.missing").unwrap(), Value::Undefined);
    }

    #[test]
    fn member_access_on_undefined_fails() {
        assert!(matches!(eval("missing.path"), Err(ExpressionError::Reference { .. })));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval("n > 3 && name == 'ada'").unwrap(), Value::Bool(true));
        assert_eq!(eval("missing | 'fallback'").unwrap(), Value::from("fallback"));
        assert_eq!(eval("0 || 5").unwrap(), Value::from(5));
        assert_eq!(eval("'4' == n").unwrap(), Value::Bool(true));
        assert_eq!(eval("'4' === n").unwrap(), Value::Bool(false));
        assert_eq!(eval("null == undefined").unwrap(), Value::Bool(true));
        assert_eq!(eval("!items").unwrap(), Value::Bool(false));
    }

    #[test]
    fn conditional_only_reads_the_taken_branch() {
        let r = resolver();
        let value = compile("n > 10 ? name : user.name").unwrap().evaluate(&r).unwrap();
        assert_eq!(value, Value::from("Ada"));
        assert_eq!(*r.reads.borrow(), vec!["n".to_string(), "user".to_string()]);
    }

    #[test]
    fn literals_and_calls() {
        assert_eq!(eval("[1, 'a', true]").unwrap().to_text(), "1,a,true");
        assert_eq!(eval("{a: 1, 'b c': 2}").unwrap().to_text(), r#"{"a":1,"b c":2}"#);
        assert_eq!(eval("len(items) + len(name)").unwrap(), Value::from(6));
        assert_eq!(eval("upper(name)").unwrap(), Value::from("ADA"));
        assert!(matches!(eval("nope()"), Err(ExpressionError::UndefinedFunction(_))));
    }

    #[test]
    fn arithmetic_type_errors() {
        assert!(matches!(eval("items - 1"), Err(ExpressionError::TypeMismatch(_))));
    }
}

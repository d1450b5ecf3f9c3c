use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fmt;

use crate::core::nodes::Node;
use crate::errors::ExpressionError;

pub type Map = BTreeMap<String, Value>;

/// Values flowing through the expression language and the scope stack.
///
/// `Nothing` and `Default` are the two tales sentinels; they are never
/// produced by ordinary expressions, only by the `nothing`/`default` keywords.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(Map),
    Node(Node),
    Nothing,
    Default,
}

#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// Keeps integral results as integers.
    pub fn from_f64(value: f64) -> Number {
        if value.fract() == 0.0 && value.is_finite() && value.abs() < 9.0e15 {
            Number::Int(value as i64)
        } else {
            Number::Float(value)
        }
    }

    pub fn is_zero_or_nan(&self) -> bool {
        match self {
            Number::Int(i) => *i == 0,
            Number::Float(f) => *f == 0.0 || f.is_nan(),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(v) if v.is_nan() => f.write_str("NaN"),
            Number::Float(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Number::Float(v) if v.fract() == 0.0 && v.abs() < 1e21 => write!(f, "{}", *v as i128),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null | Value::Nothing => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !n.is_zero_or_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Node(_) | Value::Default => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Node(_) => "node",
            Value::Nothing => "nothing",
            Value::Default => "default",
        }
    }

    /// Numeric coercion; `None` when the value has no numeric reading.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.as_f64()),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Null => Some(0.0),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// Rendering used for text interpolation and attribute values.
    pub fn to_text(&self) -> String {
        match self {
            Value::Undefined | Value::Null | Value::Nothing | Value::Default => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(items) => items.iter().map(Value::to_text).collect::<Vec<_>>().join(","),
            Value::Map(_) => self.to_json().to_string(),
            Value::Node(node) => node.to_markup(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Nothing | Value::Default => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(Number::Int(i)) => serde_json::Value::from(*i),
            Value::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Node(node) => serde_json::Value::String(node.to_markup()),
        }
    }

    /// Merges `other` into this value: maps take the other map's entries,
    /// lists are extended. Scalars cannot be extended.
    pub fn extend(&mut self, other: Value) -> Result<(), ExpressionError> {
        match (self, other) {
            (Value::Map(target), Value::Map(source)) => {
                target.extend(source);
                Ok(())
            }
            (Value::List(target), Value::List(source)) => {
                target.extend(source);
                Ok(())
            }
            (Value::List(target), item) => {
                target.push(item);
                Ok(())
            }
            (target, source) => Err(ExpressionError::NonExtendableType(format!(
                "cannot merge {} into {}",
                source.type_name(),
                target.type_name()
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// Macro to generate From and TryFrom impls
macro_rules! impl_value_conversion {
    ($variant:ident, $type:ty, $error_msg:expr) => {
        impl TryFrom<Value> for $type {
            type Error = String;

            fn try_from(value: Value) -> Result<$type, Self::Error> {
                if let Value::$variant(inner) = value {
                    Ok(inner)
                } else {
                    Err($error_msg.to_string())
                }
            }
        }

        impl From<$type> for Value {
            fn from(value: $type) -> Value {
                Value::$variant(value)
            }
        }
    };
}

macro_rules! impl_value_number_conversion {
    ($variant:ident, $type:ty, $as:ty) => {
        impl From<$type> for Value {
            fn from(value: $type) -> Value {
                Value::Number(Number::$variant(value as $as))
            }
        }
    };
}

impl_value_conversion!(String, String, "Not a string");
impl_value_conversion!(Bool, bool, "Not a boolean");
impl_value_conversion!(List, Vec<Value>, "Not a list");
impl_value_conversion!(Map, Map, "Not a map");
impl_value_conversion!(Node, Node, "Not a node");
impl_value_number_conversion!(Int, i64, i64);
impl_value_number_conversion!(Int, i32, i64);
impl_value_number_conversion!(Int, u32, i64);
impl_value_number_conversion!(Int, usize, i64);
impl_value_number_conversion!(Float, f64, f64);

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::String(value.to_string())
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Value {
        Value::Number(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(number) => Value::Number(number.into()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(values) => Value::List(values.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Value {
        Value::from(value.clone())
    }
}

impl From<serde_json::Number> for Number {
    fn from(number: serde_json::Number) -> Number {
        match number.as_i64() {
            Some(i) => Number::Int(i),
            None => Number::Float(number.as_f64().unwrap_or(f64::NAN)),
        }
    }
}

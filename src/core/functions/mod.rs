use log::trace;
use std::fmt;

use crate::errors::ExpressionError;
use crate::types::Value;

pub mod collections;
pub mod pretty_print;
pub mod strings;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
    List,
    Map,
    Null,
    Node,
    All,
    Any(Vec<ParamType>),
    Optional(Box<ParamType>),
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        trace!("ParamType::matches({:?}, {:?})", self, value);
        match self {
            ParamType::String => matches!(value, Value::String(_)),
            ParamType::Number => matches!(value, Value::Number(_)),
            ParamType::Boolean => matches!(value, Value::Bool(_)),
            ParamType::List => matches!(value, Value::List(_)),
            ParamType::Map => matches!(value, Value::Map(_)),
            ParamType::Null => matches!(value, Value::Null),
            ParamType::Node => matches!(value, Value::Node(_)),
            ParamType::All => true,
            ParamType::Any(types) => types.iter().any(|t| t.matches(value)),
            ParamType::Optional(inner) => value.is_undefined() || inner.matches(value),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ParamType::Optional(_))
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "String"),
            ParamType::Number => write!(f, "Number"),
            ParamType::Boolean => write!(f, "Boolean"),
            ParamType::List => write!(f, "List"),
            ParamType::Map => write!(f, "Map"),
            ParamType::Null => write!(f, "Null"),
            ParamType::Node => write!(f, "Node"),
            ParamType::All => write!(f, "Any"),
            ParamType::Any(types) => write!(f, "Any({})", types.iter().map(|t| format!("{}", t)).collect::<Vec<String>>().join(", ")),
            ParamType::Optional(inner) => write!(f, "Optional({})", inner),
        }
    }
}

pub struct ParamSignature {
    pub param_type: ParamType,
    pub name: String,
    pub description: String,
}

impl ParamSignature {
    pub fn new(name: &str, param_type: ParamType, description: &str) -> Self {
        Self { param_type, name: name.to_string(), description: description.to_string() }
    }
}

/// A function callable from the default expression language, e.g. `len(items)`.
pub trait EnvFunction: Send + Sync {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError>;

    fn signature(&self) -> (String, Vec<ParamSignature>);

    fn validate_args(&self, args: &[Value]) -> Result<(), String> {
        trace!("EnvFunction::validate_args({:?})", args);
        let (_, params) = self.signature();
        let required = params.iter().filter(|p| !p.param_type.is_optional()).count();

        if args.len() < required || args.len() > params.len() {
            return Err(if required == params.len() {
                format!("Expected {} arguments, got {}", params.len(), args.len())
            } else {
                format!("Expected {} to {} arguments, got {}", required, params.len(), args.len())
            });
        }

        for (i, (arg, param)) in args.iter().zip(params.iter()).enumerate() {
            if !param.param_type.matches(arg) {
                return Err(format!(
                    "Argument {} ('{}') expected to be of type {}, got {}",
                    i, param.name, param.param_type, arg.type_name()
                ));
            }
        }

        Ok(())
    }
}

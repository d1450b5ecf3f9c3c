use crate::errors::ExpressionError;
use crate::types::{Number, Value};

use super::{EnvFunction, ParamSignature, ParamType};

pub struct LenFunction;

impl EnvFunction for LenFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        let len = match &args[0] {
            Value::String(s) => s.chars().count(),
            Value::List(items) => items.len(),
            Value::Map(map) => map.len(),
            Value::Node(node) => node.children().len(),
            other => {
                return Err(ExpressionError::TypeMismatch(format!(
                    "len() expects a string, list or map, got {}",
                    other.type_name()
                )));
            }
        };
        Ok(Value::from(len))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let input = ParamSignature::new(
            "input",
            ParamType::Any(vec![ParamType::String, ParamType::List, ParamType::Map, ParamType::Node]),
            "The value to measure",
        );
        ("len".to_string(), vec![input])
    }
}

pub struct KeysFunction;

impl EnvFunction for KeysFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        match &args[0] {
            Value::Map(map) => Ok(Value::List(map.keys().map(|k| Value::from(k.as_str())).collect())),
            Value::List(items) => Ok(Value::List((0..items.len()).map(Value::from).collect())),
            other => Err(ExpressionError::TypeMismatch(format!("keys() expects a map, got {}", other.type_name()))),
        }
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let input = ParamSignature::new("input", ParamType::Any(vec![ParamType::Map, ParamType::List]), "The container whose keys are listed");
        ("keys".to_string(), vec![input])
    }
}

pub struct JoinFunction;

impl EnvFunction for JoinFunction {
    fn call(&self, mut args: Vec<Value>) -> Result<Value, ExpressionError> {
        let separator = match args.get(1) {
            Some(Value::String(s)) => s.clone(),
            _ => ",".to_string(),
        };
        let Value::List(items) = args.swap_remove(0) else {
            return Err(ExpressionError::TypeMismatch("join() expects a list".to_string()));
        };
        Ok(Value::String(items.iter().map(Value::to_text).collect::<Vec<_>>().join(&separator)))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let list = ParamSignature::new("list", ParamType::List, "The items to join");
        let separator = ParamSignature::new("separator", ParamType::Optional(Box::new(ParamType::String)), "Separator placed between items (default `,`)");
        ("join".to_string(), vec![list, separator])
    }
}

/// `range(end)` or `range(start, end)`, end exclusive.
pub struct RangeFunction;

impl EnvFunction for RangeFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value, ExpressionError> {
        let bound = |value: &Value| -> Result<i64, ExpressionError> {
            match value {
                Value::Number(n) => n.as_i64().ok_or_else(|| ExpressionError::TypeMismatch(format!("range() expects integers, got {}", n))),
                other => Err(ExpressionError::TypeMismatch(format!("range() expects integers, got {}", other.type_name()))),
            }
        };
        let (start, end) = match args.as_slice() {
            [end] => (0, bound(end)?),
            [start, end] => (bound(start)?, bound(end)?),
            _ => return Err(ExpressionError::FunctionArgs("range".to_string(), "Expected 1 or 2 arguments".to_string())),
        };
        Ok(Value::List((start..end).map(|i| Value::Number(Number::Int(i))).collect()))
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let start = ParamSignature::new("start", ParamType::Number, "First value, or the exclusive end when used alone");
        let end = ParamSignature::new("end", ParamType::Optional(Box::new(ParamType::Number)), "Exclusive end");
        ("range".to_string(), vec![start, end])
    }
}

/// Merges two maps or extends a list; scalars are rejected.
pub struct MergeFunction;

impl EnvFunction for MergeFunction {
    fn call(&self, mut args: Vec<Value>) -> Result<Value, ExpressionError> {
        let addition = args.pop().unwrap_or_default();
        let mut target = args.pop().unwrap_or_default();
        target.extend(addition)?;
        Ok(target)
    }

    fn signature(&self) -> (String, Vec<ParamSignature>) {
        let target = ParamSignature::new("target", ParamType::All, "The map or list to extend");
        let addition = ParamSignature::new("addition", ParamType::All, "The entries to merge in");
        ("merge".to_string(), vec![target, addition])
    }
}

use lazy_static::lazy_static;
use regex::Regex;

use crate::Engine;
use crate::errors::TemplateError;
use crate::types::{Number, Value};

lazy_static! {
    static ref INT_PREFIX: Regex = Regex::new(r"^\s*[+-]?\d+").unwrap();
    static ref FLOAT_PREFIX: Regex = Regex::new(r"^\s*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap();
}

// Strings are read up to the first character that no longer fits the number.
fn leading_number(value: &Value, pattern: &Regex) -> f64 {
    match value {
        Value::String(s) => pattern
            .find(s)
            .and_then(|m| m.as_str().trim().parse::<f64>().ok())
            .unwrap_or(f64::NAN),
        other => other.to_number().unwrap_or(f64::NAN),
    }
}

pub fn int(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let value = engine.evaluate_single(expression)?;
    let n = leading_number(&value, &INT_PREFIX);
    Ok(Value::Number(Number::Int(if n.is_finite() { n.trunc() as i64 } else { 0 })))
}

pub fn float(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let value = engine.evaluate_single(expression)?;
    let n = leading_number(&value, &FLOAT_PREFIX);
    Ok(Value::Number(Number::Float(if n.is_nan() { 0.0 } else { n })))
}

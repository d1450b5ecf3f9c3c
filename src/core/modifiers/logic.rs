use log::debug;

use crate::Engine;
use crate::errors::TemplateError;
use crate::types::Value;

pub fn not(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let value = engine.evaluate_single(expression)?;
    Ok(Value::Bool(!value.is_truthy()))
}

/// True when the text evaluates without error to something defined.
pub fn exists(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    match engine.evaluate_single(expression) {
        Ok(value) => Ok(Value::Bool(!value.is_undefined())),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("exists: `{}` failed: {}", expression, e);
            Ok(Value::Bool(false))
        }
    }
}

/// Boolean cast. Numeric strings are compared with zero and
/// `no`/`off`/`false` read as false in any case.
pub fn boolean(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let value = engine.evaluate_single(expression)?;
    let result = match &value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<f64>() {
                n != 0.0
            } else if ["no", "off", "false"].iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
                false
            } else {
                !s.is_empty()
            }
        }
        other => other.is_truthy(),
    };
    Ok(Value::Bool(result))
}

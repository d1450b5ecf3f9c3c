use url::Url;
use url::form_urlencoded;

use crate::Engine;
use crate::errors::{ExpressionError, TemplateError};
use crate::types::Value;

/// Form-style percent encoding of the evaluated text.
pub fn uri(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let value = engine.evaluate_single(expression)?;
    if value.is_undefined() {
        return Ok(value);
    }
    let text = value.to_text();
    Ok(Value::String(form_urlencoded::byte_serialize(text.as_bytes()).collect()))
}

/// Normalizes an absolute URL; anything that does not parse fails the alternative.
pub fn url(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let value = engine.evaluate_single(expression)?;
    if value.is_undefined() {
        return Ok(value);
    }
    let text = value.to_text();
    let parsed = Url::parse(text.trim())
        .map_err(|e| ExpressionError::Evaluation(format!("`{}` is not a valid url: {}", text, e)))?;
    Ok(Value::String(parsed.to_string()))
}

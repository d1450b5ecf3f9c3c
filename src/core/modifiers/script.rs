use log::trace;

use crate::Engine;
use crate::errors::TemplateError;
use crate::parser;
use crate::types::Value;

/// The default modifier: runs its text through the expression language.
/// A lone identifier is looked up directly.
pub fn js(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    if let Some(name) = parser::bare_identifier(expression) {
        trace!("Fast path lookup for '{}'", name);
        return Ok(engine.get_variable(name).unwrap_or_default());
    }
    let compiled = parser::compile(expression.trim())?;
    Ok(compiled.evaluate(&*engine)?)
}

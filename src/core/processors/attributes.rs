use log::trace;

use crate::errors::{ExpressionError, TemplateError};
use crate::tokenizer::Tokenizer;
use crate::types::Value;

use super::{ProcessorResult, Step};

/// `attributes="name expr; other: expr, third = expr"`
pub fn attributes(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    let mut tokenizer = Tokenizer::new(expression);
    loop {
        tokenizer.skip_whitespace();
        if tokenizer.at_end() {
            break;
        }
        if tokenizer.skip_separator() {
            continue;
        }

        let name = tokenizer.read_identifier().ok_or_else(|| {
            ExpressionError::syntax(expression, tokenizer.position(), "expected an attribute name")
        })?;
        tokenizer.skip_whitespace();
        if let Some(c @ (':' | '=')) = tokenizer.peek() {
            tokenizer.advance(c);
        }
        let alternatives = tokenizer.expression()?;

        match step.engine.evaluate(&alternatives)? {
            Value::Bool(true) => step.set_attribute(name, name),
            Value::Bool(false) | Value::Nothing => {
                step.element.remove_attribute(name);
            }
            Value::Default => trace!("attributes: leaving '{}' untouched", name),
            other => step.set_attribute(name, other.to_text()),
        }
    }
    Ok(ProcessorResult::Continue)
}

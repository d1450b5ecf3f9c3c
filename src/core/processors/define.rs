use log::trace;

use crate::core::nodes::Node;
use crate::errors::{ExpressionError, TemplateError};
use crate::tokenizer::Tokenizer;
use crate::types::Value;

use super::{ProcessorResult, Step};

/// `define="[global|local] name expr; name2 expr2; captured"`
///
/// A name without an expression captures the element's children, rendered,
/// as a fragment value. The children stay in place.
pub fn define(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    let mut tokenizer = Tokenizer::new(expression);
    loop {
        tokenizer.skip_whitespace();
        if tokenizer.at_end() {
            break;
        }
        if tokenizer.skip_separator() {
            continue;
        }

        let mut name = tokenizer.read_identifier().ok_or_else(|| {
            ExpressionError::syntax(expression, tokenizer.position(), "expected a variable name")
        })?;
        let mut global = false;
        if name == "global" || name == "local" {
            let mut lookahead = tokenizer.clone();
            lookahead.skip_whitespace();
            if let Some(actual) = lookahead.read_identifier() {
                global = name == "global";
                name = actual;
                tokenizer = lookahead;
            }
        }

        tokenizer.skip_whitespace();
        let value = if tokenizer.at_end() || tokenizer.at_separator() {
            step.render_children()?;
            Value::Node(Node::fragment(step.element.children.clone()))
        } else {
            let alternatives = tokenizer.expression()?;
            step.engine.evaluate(&alternatives)?
        };

        trace!("define: {} '{}' = {}", if global { "global" } else { "local" }, name, value.type_name());
        if global {
            step.engine.set_global(name, value);
        } else {
            step.engine.set_variable(name, value);
        }
    }
    Ok(ProcessorResult::Continue)
}

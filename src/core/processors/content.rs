use crate::core::nodes::Node;
use crate::errors::TemplateError;
use crate::types::Value;

use super::{ProcessorResult, Step};

/// Swaps the whole element for the value: nodes as themselves, anything else
/// as text. `nothing` removes the element, `default` keeps it.
pub fn replace(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    match step.evaluate(expression)? {
        Value::Default => Ok(ProcessorResult::Continue),
        Value::Nothing => Ok(ProcessorResult::Remove),
        Value::Node(node) => Ok(ProcessorResult::ReplaceWith(node.duplicate())),
        other => Ok(ProcessorResult::ReplaceWith(Node::text(other.to_text()))),
    }
}

/// Swaps the element's children for the value. The new children count as
/// rendered and are not walked.
pub fn content(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    let children = match step.evaluate(expression)? {
        Value::Default => return Ok(ProcessorResult::Continue),
        Value::Nothing => Vec::new(),
        Value::Node(node) => node.duplicate().into_nodes(),
        other => vec![Node::text(other.to_text())],
    };
    step.element.children = children;
    Ok(ProcessorResult::Skip)
}

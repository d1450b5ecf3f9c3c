use crate::core::nodes::Node;
use crate::errors::TemplateError;

use super::{ProcessorResult, Step};

/// Unwraps the element when the expression is empty or truthy: its rendered
/// children take its place.
pub fn omit_tag(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    let omit = expression.trim().is_empty() || step.evaluate(expression)?.is_truthy();
    if !omit {
        return Ok(ProcessorResult::Continue);
    }
    step.render_children()?;
    let children = std::mem::take(&mut step.element.children);
    Ok(ProcessorResult::ReplaceWith(Node::fragment(children)))
}

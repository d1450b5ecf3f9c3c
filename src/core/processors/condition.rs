use log::warn;

use crate::errors::TemplateError;

use super::{ProcessorResult, Step};

/// Removes the element unless the expression is truthy. Evaluation errors
/// count as false.
pub fn condition(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    match step.evaluate(expression) {
        Ok(value) if value.is_truthy() => Ok(ProcessorResult::Continue),
        Ok(_) => Ok(ProcessorResult::Remove),
        Err(e) => {
            warn!("Condition `{}` failed, treating it as false: {}", expression, e);
            Ok(ProcessorResult::Remove)
        }
    }
}

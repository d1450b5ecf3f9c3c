//! The alternation loop over tokenized sub-expressions.

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use crate::Engine;
use crate::errors::TemplateError;
use crate::tokenizer::tokenize;
use crate::types::Value;

lazy_static! {
    static ref MODIFIER_PREFIX: Regex = Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_-]*)\s*:").unwrap();
}

impl Engine {
    /// Evaluates alternatives in order and returns the first defined result.
    ///
    /// Falsy results are still defined and stop the loop; only undefined
    /// falls through. Ordinary errors are remembered and the next
    /// alternative is tried. Fatal ones (syntax, unknown modifier) abort.
    pub fn evaluate(&mut self, alternatives: &[String]) -> Result<Value, TemplateError> {
        let mut last_error = None;
        for alternative in alternatives {
            match self.evaluate_single(alternative) {
                Ok(Value::Undefined) => trace!("Alternative `{}` is undefined", alternative),
                Ok(value) => return Ok(value),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("Alternative `{}` failed: {}", alternative, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| TemplateError::UndefinedValue(alternatives.join(" | "))))
    }

    /// Evaluates one sub-expression: sentinel keywords, then the modifier
    /// named by its prefix, or the default modifier.
    pub fn evaluate_single(&mut self, expression: &str) -> Result<Value, TemplateError> {
        let trimmed = expression.trim();
        if trimmed.eq_ignore_ascii_case("nothing") {
            return Ok(Value::Nothing);
        }
        if trimmed.eq_ignore_ascii_case("default") {
            return Ok(Value::Default);
        }

        let (name, body) = match MODIFIER_PREFIX.captures(trimmed) {
            Some(captures) => match (captures.get(1), captures.get(0)) {
                (Some(name), Some(whole)) => (name.as_str().to_string(), &trimmed[whole.end()..]),
                _ => (self.config.default_modifier.clone(), trimmed),
            },
            None => (self.config.default_modifier.clone(), trimmed),
        };

        let modifier = self.modifiers.get(&name).cloned().ok_or_else(|| TemplateError::UnknownModifier {
            name: name.clone(),
            expression: trimmed.to_string(),
        })?;
        trace!("Evaluating `{}` with modifier '{}'", body, name);
        modifier.evaluate(self, body)
    }

    /// Tokenizes `source` and evaluates its alternatives.
    pub fn evaluate_expression(&mut self, source: &str) -> Result<Value, TemplateError> {
        let alternatives = tokenize(source)?;
        self.evaluate(&alternatives)
    }
}

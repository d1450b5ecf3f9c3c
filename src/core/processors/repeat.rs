use log::trace;

use crate::core::nodes::Node;
use crate::errors::{ExpressionError, TemplateError};
use crate::scope::Frame;
use crate::tokenizer::Tokenizer;
use crate::types::{Map, Value};

use super::{ProcessorResult, Step};

/// `repeat="name expr"`: one rendered copy of the element per item.
///
/// Each copy sees the item as `name` and its position under `repeat.name`.
pub fn repeat(step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
    let mut tokenizer = Tokenizer::new(expression);
    tokenizer.skip_whitespace();
    let name = tokenizer
        .read_identifier()
        .ok_or_else(|| ExpressionError::syntax(expression, tokenizer.position(), "expected a loop variable"))?;
    let alternatives = tokenizer.expression()?;

    let items: Vec<(Value, Value)> = match step.engine.evaluate(&alternatives)? {
        Value::Default => return Ok(ProcessorResult::Continue),
        Value::Undefined | Value::Null | Value::Nothing => Vec::new(),
        Value::List(items) => items.into_iter().enumerate().map(|(i, item)| (Value::from(i), item)).collect(),
        Value::Map(map) => map.into_iter().map(|(key, item)| (Value::from(key), item)).collect(),
        Value::String(s) => s.chars().enumerate().map(|(i, c)| (Value::from(i), Value::from(c.to_string()))).collect(),
        Value::Node(node) => node
            .into_nodes()
            .into_iter()
            .enumerate()
            .map(|(i, child)| (Value::from(i), Value::Node(child)))
            .collect(),
        other => {
            return Err(ExpressionError::TypeMismatch(format!(
                "cannot repeat over {} in `{}`",
                other.type_name(),
                expression
            ))
            .into());
        }
    };

    let length = items.len();
    trace!("repeat: {} items for '{}'", length, name);
    let mut output = Vec::new();
    for (index, (key, item)) in items.into_iter().enumerate() {
        let mut meta = Map::new();
        meta.insert("index".to_string(), Value::from(index));
        meta.insert("number".to_string(), Value::from(index + 1));
        meta.insert("even".to_string(), Value::Bool(index % 2 == 0));
        meta.insert("odd".to_string(), Value::Bool(index % 2 == 1));
        meta.insert("start".to_string(), Value::Bool(index == 0));
        meta.insert("end".to_string(), Value::Bool(index + 1 == length));
        meta.insert("length".to_string(), Value::from(length));
        meta.insert("key".to_string(), key);

        let mut repeat = step.engine.scope().peek("repeat").cloned().unwrap_or_else(|| Value::Map(Map::new()));
        let mut entry = Map::new();
        entry.insert(name.to_string(), Value::Map(meta));
        repeat.extend(Value::Map(entry))?;

        let mut frame = Frame::new();
        frame.insert(name.to_string(), item);
        frame.insert("repeat".to_string(), repeat);

        let copy = Node::Element(step.element.duplicate());
        let rendered = step.engine.with_scope(frame, |engine| engine.render_node(copy))?;
        output.extend(rendered);
    }
    Ok(ProcessorResult::ReplaceWith(Node::fragment(output)))
}

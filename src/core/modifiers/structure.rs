use std::sync::Arc;

use log::debug;

use crate::Engine;
use crate::core::nodes::Node;
use crate::errors::TemplateError;
use crate::scope::Frame;
use crate::types::Value;

/// Parses textual results into a tree; other values pass through unchanged.
pub fn structure(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    match engine.evaluate_single(expression)? {
        Value::String(markup) => {
            let bridge = Arc::clone(engine.bridge());
            Ok(Value::Node(bridge.parse_markup(&markup)?))
        }
        other => Ok(other),
    }
}

/// Loads a template and processes it in a fresh scope frame.
///
/// The text is evaluated first: a string result names the template, a node
/// result is processed as is. Text that resolves to nothing is taken
/// literally as the template name, so `tpl: header` works unquoted.
pub fn template(engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
    let source = match engine.evaluate_single(expression) {
        Ok(Value::Node(node)) => node.duplicate(),
        Ok(Value::String(name)) => load(engine, &name)?,
        Ok(Value::Undefined) => load(engine, expression.trim())?,
        Ok(other) => {
            return Err(TemplateError::TemplateLoad {
                name: expression.trim().to_string(),
                reason: format!("expected a template name, got {}", other.type_name()),
            });
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            debug!("tpl: `{}` did not evaluate ({}), using it as a name", expression, e);
            load(engine, expression.trim())?
        }
    };
    let rendered = engine.with_scope(Frame::new(), |engine| engine.render_node(source))?;
    Ok(Value::Node(Node::from_nodes(rendered)))
}

fn load(engine: &Engine, name: &str) -> Result<Node, TemplateError> {
    let bridge = Arc::clone(engine.bridge());
    let markup = bridge.load_template(name)?;
    bridge.parse_markup(&markup).map_err(|e| TemplateError::TemplateLoad {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

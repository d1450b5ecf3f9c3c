use std::collections::HashMap;
use std::sync::Arc;

use crate::Engine;
use crate::errors::TemplateError;
use crate::types::Value;

pub mod logic;
pub mod numeric;
pub mod script;
pub mod structure;
pub mod uri;

/// Interprets the text of one sub-expression, after its `name:` prefix.
///
/// Returning `Value::Undefined` lets the alternation loop move on to the
/// next alternative; returning an error does the same unless it is fatal.
pub trait Modifier {
    fn evaluate(&self, engine: &mut Engine, expression: &str) -> Result<Value, TemplateError>;
}

impl<F> Modifier for F
where
    F: Fn(&mut Engine, &str) -> Result<Value, TemplateError>,
{
    fn evaluate(&self, engine: &mut Engine, expression: &str) -> Result<Value, TemplateError> {
        self(engine, expression)
    }
}

pub(crate) fn load_modifiers() -> HashMap<String, Arc<dyn Modifier>> {
    let builtins: Vec<(&str, Arc<dyn Modifier>)> = vec![
        ("js", Arc::new(script::js)),
        ("not", Arc::new(logic::not)),
        ("exists", Arc::new(logic::exists)),
        ("bool", Arc::new(logic::boolean)),
        ("int", Arc::new(numeric::int)),
        ("float", Arc::new(numeric::float)),
        ("structure", Arc::new(structure::structure)),
        ("html", Arc::new(structure::structure)),
        ("tpl", Arc::new(structure::template)),
        ("uri", Arc::new(uri::uri)),
        ("url", Arc::new(uri::url)),
    ];
    builtins.into_iter().map(|(name, modifier)| (name.to_string(), modifier)).collect()
}

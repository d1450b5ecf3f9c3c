use std::collections::HashMap;

use log::debug;

use crate::core::nodes::Node;
use crate::errors::TemplateError;
use crate::markup;

/// Host collaborator for everything that turns text into trees.
///
/// The engine only needs this for `structure`, `tpl` and `render_markup`;
/// the walker itself never parses markup.
pub trait HostBridge {
    fn parse_markup(&self, markup: &str) -> Result<Node, TemplateError>;

    /// Markup source of a named template.
    fn load_template(&self, name: &str) -> Result<String, TemplateError>;
}

/// Bridge backed by the built-in markup reader and an in-memory template table.
#[derive(Debug, Clone, Default)]
pub struct DefaultBridge {
    templates: HashMap<String, String>,
}

impl DefaultBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_template(&mut self, name: &str, markup: &str) -> &mut Self {
        debug!("Registering template: {}", name);
        self.templates.insert(name.to_string(), markup.to_string());
        self
    }

    pub fn with_template(mut self, name: &str, markup: &str) -> Self {
        self.register_template(name, markup);
        self
    }
}

impl HostBridge for DefaultBridge {
    fn parse_markup(&self, markup: &str) -> Result<Node, TemplateError> {
        markup::parse_markup(markup)
    }

    fn load_template(&self, name: &str) -> Result<String, TemplateError> {
        self.templates.get(name).cloned().ok_or_else(|| TemplateError::TemplateLoad {
            name: name.to_string(),
            reason: "no template registered under this name".to_string(),
        })
    }
}

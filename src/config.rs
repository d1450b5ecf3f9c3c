use serde::{Deserialize, Serialize};

use crate::errors::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attribute prefix that marks processor instructions.
    pub namespace: String,
    /// Modifier applied to sub-expressions without a `name:` prefix.
    pub default_modifier: String,
    /// Record bindings so that `invalidate` can re-render bound nodes.
    pub reactive: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { namespace: "tal:".to_string(), default_modifier: "js".to_string(), reactive: true }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn set_namespace(&mut self, namespace: &str) -> &mut Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn set_reactive(&mut self, reactive: bool) -> &mut Self {
        self.reactive = reactive;
        self
    }

    pub fn attribute_name(&self, processor: &str) -> String {
        format!("{}{}", self.namespace, processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_json(r#"{"namespace": "x-"}"#).unwrap();
        assert_eq!(config.namespace, "x-");
        assert_eq!(config.default_modifier, "js");
        assert!(config.reactive);
        assert_eq!(config.attribute_name("repeat"), "x-repeat");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(EngineConfig::from_json("{"), Err(TemplateError::Config(_))));
    }
}

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use log::debug;

use crate::core::functions::EnvFunction;
use crate::core::modifiers::{Modifier, load_modifiers};
use crate::core::processors::{Processor, ProcessorEntry, register_builtins};
use crate::registry::{FunctionResolver, VariableResolver, WeightedRegistry};
use crate::scope::{Frame, ScopeStack};

pub mod bindings;
pub mod bridge;
pub mod config;
pub mod core;
pub mod errors;
pub mod expression;
pub mod id;
pub mod markup;
pub mod parser;
pub mod registry;
pub mod scope;
pub mod tokenizer;
pub mod types;
mod tales;
mod walker;
mod tests;

pub use bindings::{Binding, BindingId};
pub use bridge::{DefaultBridge, HostBridge};
pub use config::EngineConfig;
pub use crate::core::nodes::{Comment, Element, Node, Text};
pub use crate::core::processors::{ProcessorKind, ProcessorResult, Step};
pub use errors::{ExpressionError, TemplateError};
pub use registry::Environment;
pub use tokenizer::{Tokenizer, tokenize};
pub use types::{Map, Number, Value};

/// A template engine instance: processors, modifiers, the scope stack and
/// the bindings created by the trees it processed.
pub struct Engine {
    config: EngineConfig,
    processors: WeightedRegistry<ProcessorEntry>,
    modifiers: HashMap<String, Arc<dyn Modifier>>,
    scope: ScopeStack,
    environment: Environment,
    bridge: Arc<dyn HostBridge>,
    bindings: bindings::BindingTable,
}

impl Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("processors", &self.processors)
            .field("modifiers", &self.modifiers.keys().collect::<Vec<_>>())
            .field("scope", &self.scope)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DefaultBridge::new())
    }
}

impl Engine {
    pub fn new(bridge: impl HostBridge + 'static) -> Self {
        Self::with_config(EngineConfig::default(), bridge)
    }

    pub fn with_config(config: EngineConfig, bridge: impl HostBridge + 'static) -> Self {
        let mut engine = Engine {
            config,
            processors: WeightedRegistry::new(),
            modifiers: load_modifiers(),
            scope: ScopeStack::new(),
            environment: Environment::new(),
            bridge: Arc::new(bridge),
            bindings: bindings::BindingTable::new(),
        };
        register_builtins(&mut engine);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn bridge(&self) -> &Arc<dyn HostBridge> {
        &self.bridge
    }

    pub fn scope(&self) -> &ScopeStack {
        &self.scope
    }

    /// Registers a processor under `name`, replacing any processor already
    /// registered under it. Lower priorities run first.
    pub fn register_processor(
        &mut self,
        name: &str,
        priority: i32,
        kind: ProcessorKind,
        handler: impl Processor + 'static,
    ) -> &mut Self {
        debug!("Registering processor: {} (priority {}, {:?})", name, priority, kind);
        let entry = ProcessorEntry { name: name.to_string(), kind, handler: Arc::new(handler) };
        self.processors.add(entry, priority);
        self
    }

    pub fn unregister_processor(&mut self, name: &str) -> bool {
        debug!("Unregistering processor: {}", name);
        self.processors.remove_by_name(name).is_some()
    }

    pub fn processors(&self) -> &WeightedRegistry<ProcessorEntry> {
        &self.processors
    }

    pub fn register_modifier(&mut self, name: &str, modifier: impl Modifier + 'static) -> &mut Self {
        debug!("Registering modifier: {}", name);
        self.modifiers.insert(name.to_string(), Arc::new(modifier));
        self
    }

    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    pub fn register_function(&mut self, function: impl EnvFunction + 'static) -> &mut Self {
        self.environment.register_function(Arc::new(function));
        self
    }

    /// Sets a fallback value, used when an identifier is not in scope.
    pub fn set_environment(&mut self, name: &str, value: Value) -> &mut Self {
        self.environment.set(name, value);
        self
    }

    /// Runs the processor pipeline over `root` and returns what took its place.
    pub fn process(&mut self, root: Node) -> Result<Node, TemplateError> {
        let nodes = self.render_node(root)?;
        Ok(Node::from_nodes(nodes))
    }

    /// Parses, processes and serializes a markup string. No bindings are
    /// kept, since the tree does not outlive the call.
    pub fn render_markup(&mut self, markup: &str) -> Result<String, TemplateError> {
        let root = self.bridge.parse_markup(markup)?;
        let reactive = std::mem::replace(&mut self.config.reactive, false);
        let result = self.process(root);
        self.config.reactive = reactive;
        Ok(result?.to_markup())
    }

    pub fn push_scope(&mut self) {
        self.scope.push(Frame::new());
    }

    pub fn pop_scope(&mut self) -> Option<Frame> {
        self.scope.pop()
    }

    /// Looks `name` up in the scope stack, then in the environment.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.scope.get(name).or_else(|| self.environment.get(name).cloned())
    }

    /// Binds `name` in the innermost frame.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.scope.set(name, value);
    }

    /// Replaces the innermost frame.
    pub fn set_scope(&mut self, frame: Frame) {
        self.scope.set_frame(frame);
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.scope.set_global(name, value);
    }
}

impl VariableResolver for Engine {
    fn get_variable(&self, name: &str) -> Option<Value> {
        Engine::get_variable(self, name)
    }
}

impl FunctionResolver for Engine {
    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
        self.environment.call_function(name, args)
    }
}

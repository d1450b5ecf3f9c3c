use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use crate::Engine;
use crate::core::nodes::{Element, Node};
use crate::errors::TemplateError;
use crate::registry::Named;
use crate::types::Value;

pub mod attributes;
pub mod condition;
pub mod content;
pub mod define;
pub mod omit_tag;
pub mod repeat;

/// What the walker does with a node after a processor ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorResult {
    /// Keep matching processors and walk the children afterwards.
    Continue,
    /// Keep matching processors but leave the children alone.
    Skip,
    /// Detach the node, leaving an empty marker in its place.
    Remove,
    /// Put the given node or fragment where the node was and stop matching.
    ReplaceWith(Node),
}

/// `Content` and `Replace` processors are tracked for reactive re-rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Default,
    Content,
    Replace,
}

impl ProcessorKind {
    pub fn is_destructive(&self) -> bool {
        !matches!(self, ProcessorKind::Default)
    }
}

pub trait Processor {
    fn process(&self, step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError>;
}

impl<F> Processor for F
where
    F: Fn(&mut Step<'_>, &str) -> Result<ProcessorResult, TemplateError>,
{
    fn process(&self, step: &mut Step<'_>, expression: &str) -> Result<ProcessorResult, TemplateError> {
        self(step, expression)
    }
}

#[derive(Clone)]
pub struct ProcessorEntry {
    pub name: String,
    pub kind: ProcessorKind,
    pub handler: Arc<dyn Processor>,
}

impl Named for ProcessorEntry {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Debug for ProcessorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorEntry").field("name", &self.name).field("kind", &self.kind).finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct StepState {
    pub(crate) skip_children: bool,
    pub(crate) children_rendered: bool,
    /// Attributes whose value came from an evaluated expression. They are
    /// not interpolated again.
    pub(crate) assigned: BTreeSet<String>,
}

/// One processor invocation: the engine, the element being processed (its
/// processor attribute already consumed) and the walk state of that element.
pub struct Step<'a> {
    pub engine: &'a mut Engine,
    pub element: &'a mut Element,
    state: &'a mut StepState,
}

impl<'a> Step<'a> {
    pub(crate) fn new(engine: &'a mut Engine, element: &'a mut Element, state: &'a mut StepState) -> Self {
        Self { engine, element, state }
    }

    /// Tokenizes and evaluates a tales expression in the current scope.
    pub fn evaluate(&mut self, expression: &str) -> Result<Value, TemplateError> {
        self.engine.evaluate_expression(expression)
    }

    /// Walks the element's children now. Later calls, and the walker's own
    /// pass over the children, become no-ops.
    pub fn render_children(&mut self) -> Result<(), TemplateError> {
        if self.state.skip_children || self.state.children_rendered {
            return Ok(());
        }
        let children = std::mem::take(&mut self.element.children);
        self.element.children = self.engine.render_all(children)?;
        self.state.children_rendered = true;
        Ok(())
    }

    /// Sets an attribute to an already evaluated value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.element.set_attribute(name, value);
        self.state.assigned.insert(name.to_string());
    }

    pub fn children_rendered(&self) -> bool {
        self.state.children_rendered
    }
}

pub(crate) fn register_builtins(engine: &mut Engine) {
    engine.register_processor("define", 100, ProcessorKind::Default, define::define);
    engine.register_processor("condition", 200, ProcessorKind::Replace, condition::condition);
    engine.register_processor("repeat", 300, ProcessorKind::Replace, repeat::repeat);
    engine.register_processor("replace", 400, ProcessorKind::Replace, content::replace);
    engine.register_processor("content", 500, ProcessorKind::Content, content::content);
    engine.register_processor("attributes", 600, ProcessorKind::Default, attributes::attributes);
    engine.register_processor("omit-tag", 700, ProcessorKind::Replace, omit_tag::omit_tag);
}

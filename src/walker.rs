//! Depth-first walk that applies processors and interpolation.
//!
//! Every element gets its own scope frame for the duration of its step.
//! Reads made by `Content`/`Replace` processors and by text interpolation
//! are recorded, and a node whose step read anything gets a binding so it
//! can be rendered again from its backup later.

use std::collections::BTreeSet;

use log::trace;

use crate::Engine;
use crate::bindings::BindingId;
use crate::core::nodes::{Element, Node, Text};
use crate::core::processors::{ProcessorEntry, ProcessorResult, Step, StepState};
use crate::errors::{ExpressionError, TemplateError};
use crate::scope::Frame;
use crate::tokenizer::Tokenizer;
use crate::types::Value;

/// What a tracked step needs to install or refresh its binding.
struct Tracking {
    backup: Node,
    locals: Frame,
}

impl Engine {
    /// Runs `f` with `frame` pushed, popping it again whatever `f` returns.
    pub(crate) fn with_scope<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Engine) -> T) -> T {
        self.scope.push(frame);
        let result = f(self);
        self.scope.pop();
        result
    }

    pub(crate) fn render_node(&mut self, node: Node) -> Result<Vec<Node>, TemplateError> {
        self.render(node, None)
    }

    pub(crate) fn render_all(&mut self, nodes: Vec<Node>) -> Result<Vec<Node>, TemplateError> {
        let mut output = Vec::with_capacity(nodes.len());
        for node in nodes {
            output.extend(self.render_node(node)?);
        }
        Ok(output)
    }

    /// Renders one node into the nodes that take its place. `rebinding` is
    /// set when an existing binding re-runs its backup.
    pub(crate) fn render(&mut self, node: Node, rebinding: Option<BindingId>) -> Result<Vec<Node>, TemplateError> {
        match node {
            Node::Fragment(nodes) => self.render_all(nodes),
            Node::Comment(_) => Ok(vec![node]),
            Node::Text(text) => self.render_text(text, rebinding),
            Node::Element(element) => {
                self.with_scope(Frame::new(), |engine| engine.render_element(element, rebinding))
            }
        }
    }

    fn render_text(&mut self, mut text: Text, rebinding: Option<BindingId>) -> Result<Vec<Node>, TemplateError> {
        if !text.content.contains("${") {
            return Ok(vec![Node::Text(text)]);
        }
        let tracking = self.config.reactive.then(|| Tracking {
            backup: Node::Text(text.clone()),
            locals: self.scope.locals(),
        });

        self.scope.begin_recording();
        let interpolated = self.interpolate(&text.content);
        let reads = self.scope.end_recording();
        text.content = interpolated?;

        Ok(self.finish(tracking, reads, rebinding, vec![Node::Text(text)]))
    }

    fn render_element(&mut self, mut element: Element, rebinding: Option<BindingId>) -> Result<Vec<Node>, TemplateError> {
        trace!("Rendering <{}> {}", element.name, element.id());
        let tracking = (self.config.reactive && self.has_processor_attributes(&element)).then(|| Tracking {
            backup: Node::Element(element.clone()),
            locals: self.scope.locals(),
        });

        let entries: Vec<ProcessorEntry> = self.processors.iter().cloned().collect();
        let mut state = StepState::default();
        let mut reads = BTreeSet::new();

        for entry in entries {
            let attribute = self.config.attribute_name(&entry.name);
            let Some(expression) = element.remove_attribute(&attribute) else {
                continue;
            };
            trace!("Applying processor '{}' to <{}>", entry.name, element.name);

            let tracked = entry.kind.is_destructive();
            if tracked {
                self.scope.begin_recording();
            }
            let result = {
                let mut step = Step::new(self, &mut element, &mut state);
                entry.handler.process(&mut step, &expression)
            };
            if tracked {
                reads.extend(self.scope.end_recording());
            }

            match result? {
                ProcessorResult::Continue => {}
                ProcessorResult::Skip => state.skip_children = true,
                ProcessorResult::Remove => {
                    trace!("Processor '{}' removed <{}>", entry.name, element.name);
                    return Ok(self.finish(tracking, reads, rebinding, vec![Node::marker()]));
                }
                ProcessorResult::ReplaceWith(replacement) => {
                    return Ok(self.finish(tracking, reads, rebinding, replacement.into_nodes()));
                }
            }
        }

        for (name, value) in element.attributes_mut().iter_mut() {
            if value.contains("${") && !state.assigned.contains(name.as_str()) {
                *value = self.interpolate(value)?;
            }
        }

        if !state.skip_children && !state.children_rendered {
            let children = std::mem::take(&mut element.children);
            element.children = self.render_all(children)?;
        }

        Ok(self.finish(tracking, reads, rebinding, vec![Node::Element(element)]))
    }

    fn has_processor_attributes(&self, element: &Element) -> bool {
        element.has_attributes()
            && self
                .processors
                .until(|entry| !element.has_attribute(&self.config.attribute_name(&entry.name)))
    }

    // Installs or refreshes the binding of a step that read something.
    fn finish(
        &mut self,
        tracking: Option<Tracking>,
        reads: BTreeSet<String>,
        rebinding: Option<BindingId>,
        mut output: Vec<Node>,
    ) -> Vec<Node> {
        let Some(tracking) = tracking else {
            return output;
        };
        if reads.is_empty() && rebinding.is_none() {
            return output;
        }
        if output.is_empty() {
            output.push(Node::marker());
        }
        let rendered = output.iter().filter_map(Node::id).collect();
        match rebinding {
            Some(id) => self.bindings.update(id, reads, rendered),
            None => {
                self.bindings.install(tracking.backup, tracking.locals, reads, rendered);
            }
        }
        output
    }

    /// Replaces every `${expr}` in `source` with the text of its value.
    /// `$${` stays as a literal `${`.
    pub(crate) fn interpolate(&mut self, source: &str) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(source.len());
        let mut rest = source;
        while let Some(start) = rest.find("${") {
            if rest[..start].ends_with('$') {
                output.push_str(&rest[..start - 1]);
                output.push_str("${");
                rest = &rest[start + 2..];
                continue;
            }
            output.push_str(&rest[..start]);

            let body = &rest[start + 2..];
            let mut tokenizer = Tokenizer::with_terminator(body, '}');
            let alternatives = tokenizer.expression()?;
            tokenizer.skip_whitespace();
            if tokenizer.peek() != Some('}') {
                let position = source.len() - body.len() + tokenizer.position();
                return Err(ExpressionError::syntax(source, position, "expected `}` to close `${`").into());
            }
            let end = tokenizer.position() + 1;

            match self.evaluate(&alternatives)? {
                Value::Nothing => {}
                Value::Default => output.push_str(&rest[start..start + 2 + end]),
                value => output.push_str(&value.to_text()),
            }
            rest = &body[end..];
        }
        output.push_str(rest);
        Ok(output)
    }
}

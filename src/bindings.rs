//! Reactive bindings: enough state to render a node again when a variable
//! it read changes.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, trace, warn};

use crate::Engine;
use crate::core::nodes::Node;
use crate::errors::TemplateError;
use crate::id::{IdGenerator, NodeId};
use crate::scope::{Frame, ScopeStack};
use crate::types::Value;

pub type BindingId = u64;

#[derive(Debug, Clone)]
pub struct Binding {
    pub id: BindingId,
    /// The node as it was before its step ran, processor attributes included.
    pub backup: Node,
    /// Non-global bindings visible to the node when it was first rendered.
    pub locals: Frame,
    pub dependencies: BTreeSet<String>,
    /// Ids of the nodes currently standing in the tree for this binding.
    pub rendered: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct BindingTable {
    bindings: BTreeMap<BindingId, Binding>,
    ids: IdGenerator,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, backup: Node, locals: Frame, dependencies: BTreeSet<String>, rendered: Vec<NodeId>) -> BindingId {
        let id = self.ids.generate();
        debug!("Installing binding {} on {:?}", id, dependencies);
        self.bindings.insert(id, Binding { id, backup, locals, dependencies, rendered });
        id
    }

    pub fn update(&mut self, id: BindingId, dependencies: BTreeSet<String>, rendered: Vec<NodeId>) {
        if let Some(binding) = self.bindings.get_mut(&id) {
            trace!("Binding {} now depends on {:?}", id, dependencies);
            binding.dependencies = dependencies;
            binding.rendered = rendered;
        }
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    pub fn remove(&mut self, id: BindingId) -> Option<Binding> {
        self.bindings.remove(&id)
    }

    /// Bindings depending on any of `names`, newest first.
    pub fn subscribed(&self, names: &[&str]) -> Vec<BindingId> {
        self.bindings
            .values()
            .rev()
            .filter(|binding| names.iter().any(|name| binding.dependencies.contains(*name)))
            .map(|binding| binding.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

impl Engine {
    /// Renders again every binding that depends on one of `names`, splicing
    /// the fresh nodes into `root`. Returns how many bindings re-ran.
    ///
    /// Bindings whose nodes are no longer under `root` are dropped.
    pub fn invalidate(&mut self, root: &mut Node, names: &[&str]) -> Result<usize, TemplateError> {
        let mut reruns = 0;
        for id in self.bindings.subscribed(names) {
            let Some(binding) = self.bindings.get(id) else {
                continue;
            };
            let path = binding.rendered.first().and_then(|anchor| root.path_to(*anchor));
            let Some(path) = path else {
                warn!("Binding {} is detached, disposing it", id);
                self.bindings.remove(id);
                continue;
            };
            let backup = binding.backup.duplicate();
            let previous = binding.rendered.clone();

            let mut scope = ScopeStack::from_frame(self.scope.global_frame().clone());
            scope.push(binding.locals.clone());
            let live = std::mem::replace(&mut self.scope, scope);
            let result = self.render(backup, Some(id));
            let rerun_scope = std::mem::replace(&mut self.scope, live);
            self.scope.replace_global(rerun_scope.into_global());

            let nodes = result?;
            debug!("Binding {} re-rendered into {} node(s)", id, nodes.len());
            let removed = splice(root, &path, &previous, nodes);
            self.drop_bindings_within(id, &removed);
            reruns += 1;
        }
        Ok(reruns)
    }

    /// Sets a global and re-renders everything that read it.
    pub fn update(&mut self, root: &mut Node, name: &str, value: Value) -> Result<usize, TemplateError> {
        self.set_global(name, value);
        self.invalidate(root, &[name])
    }

    /// Drops every binding whose nodes are no longer under `root`.
    pub fn prune_bindings(&mut self, root: &Node) -> usize {
        let before = self.bindings.len();
        self.bindings
            .bindings
            .retain(|_, binding| binding.rendered.first().is_some_and(|anchor| root.contains(*anchor)));
        let pruned = before - self.bindings.len();
        if pruned > 0 {
            debug!("Pruned {} detached binding(s)", pruned);
        }
        pruned
    }

    // Bindings rendered inside a run that a re-run just replaced.
    fn drop_bindings_within(&mut self, rerun: BindingId, removed: &[Node]) {
        let before = self.bindings.len();
        self.bindings.bindings.retain(|id, binding| {
            *id == rerun
                || !binding
                    .rendered
                    .first()
                    .is_some_and(|anchor| removed.iter().any(|node| node.contains(*anchor)))
        });
        let dropped = before - self.bindings.len();
        if dropped > 0 {
            trace!("Binding {} superseded {} inner binding(s)", rerun, dropped);
        }
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }
}

// Replaces the run of previously rendered siblings starting at `path` and
// returns what was taken out.
fn splice(root: &mut Node, path: &[usize], previous: &[NodeId], nodes: Vec<Node>) -> Vec<Node> {
    let Some((&start, parent)) = path.split_last() else {
        return vec![std::mem::replace(root, Node::from_nodes(nodes))];
    };
    let Some(siblings) = root.children_at_mut(parent) else {
        return Vec::new();
    };
    let mut end = start;
    while end < siblings.len() && siblings[end].id().is_some_and(|id| previous.contains(&id)) {
        end += 1;
    }
    siblings.splice(start..end, nodes).collect()
}

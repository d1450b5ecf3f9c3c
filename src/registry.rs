use std::{collections::HashMap, fmt::Debug, sync::Arc};

use log::{debug, error, trace};

use crate::{
    core::functions::{
        EnvFunction,
        collections::{JoinFunction, KeysFunction, LenFunction, MergeFunction, RangeFunction},
        pretty_print::PrettyPrintFunction,
        strings::{LowerFunction, UpperFunction},
    },
    errors::ExpressionError,
    types::Value,
};

/// Anything stored in a `WeightedRegistry` is looked up by name.
pub trait Named {
    fn name(&self) -> &str;
}

#[derive(Debug, Clone)]
struct Weighted<T> {
    priority: i32,
    item: T,
}

/// Ordered collection of named entries, ascending by priority.
///
/// Entries with equal priority keep their arrival order, and at most one
/// entry per name is live: adding a name again replaces the old entry.
#[derive(Debug, Clone)]
pub struct WeightedRegistry<T: Named> {
    entries: Vec<Weighted<T>>,
}

impl<T: Named> Default for WeightedRegistry<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Named> WeightedRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: T, priority: i32) {
        if self.remove_by_name(item.name()).is_some() {
            debug!("Replacing registry entry '{}'", item.name());
        }
        let index = self
            .entries
            .iter()
            .position(|entry| entry.priority > priority)
            .unwrap_or(self.entries.len());
        trace!("Inserting '{}' with priority {} at index {}", item.name(), priority, index);
        self.entries.insert(index, Weighted { priority, item });
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<T> {
        let index = self.entries.iter().position(|entry| entry.item.name() == name)?;
        Some(self.entries.remove(index).item)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|entry| entry.item.name() == name)
            .map(|entry| &entry.item)
    }

    pub fn has_by_name(&self, name: &str) -> bool {
        self.get_by_name(name).is_some()
    }

    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|entry| entry.item.name() == name)
            .map(|entry| entry.priority)
    }

    pub fn each(&self, mut f: impl FnMut(&T)) {
        for entry in &self.entries {
            f(&entry.item);
        }
    }

    /// Iterates until `f` returns `false`. Returns `true` if iteration stopped early.
    pub fn until(&self, mut f: impl FnMut(&T) -> bool) -> bool {
        for entry in &self.entries {
            if !f(&entry.item) {
                return true;
            }
        }
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- Resolver Traits  ---

/// Variable access used by the expression interpreter.
pub trait VariableResolver {
    /// Looks a bare identifier up: scope stack first, then environment values.
    /// Every call counts as a read for dependency tracking.
    fn get_variable(&self, name: &str) -> Option<Value>;
}

pub trait FunctionResolver {
    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, ExpressionError>;
}

/// Fallback object consulted when an identifier is not in scope, plus the
/// functions callable from expressions.
#[derive(Clone)]
pub struct Environment {
    values: HashMap<String, Value>,
    functions: HashMap<String, Arc<dyn EnvFunction>>,
}

impl Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("values", &self.values)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self { values: HashMap::new(), functions: load_functions() }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Registers a function implementation.
    pub fn register_function(&mut self, function: Arc<dyn EnvFunction>) {
        let (name, _) = function.signature();
        debug!("Registering function: {}", name);
        self.functions.insert(name, function);
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl FunctionResolver for Environment {
    fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, ExpressionError> {
        trace!("Environment::call_function: name='{}'", name);

        if let Some(func) = self.functions.get(name) {
            if let Err(validation_err) = func.validate_args(&args) {
                error!("Argument validation failed for function '{}': {}", name, validation_err);
                return Err(ExpressionError::FunctionArgs(name.to_string(), validation_err));
            }
            func.call(args)
        } else {
            error!("Attempted to call undefined function '{}'", name);
            Err(ExpressionError::UndefinedFunction(name.to_string()))
        }
    }
}

fn load_functions() -> HashMap<String, Arc<dyn EnvFunction>> {
    let builtins: Vec<Arc<dyn EnvFunction>> = vec![
        Arc::new(LenFunction),
        Arc::new(KeysFunction),
        Arc::new(JoinFunction),
        Arc::new(RangeFunction),
        Arc::new(MergeFunction),
        Arc::new(UpperFunction),
        Arc::new(LowerFunction),
        Arc::new(PrettyPrintFunction),
    ];
    builtins.into_iter().map(|f| (f.signature().0, f)).collect()
}

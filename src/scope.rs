use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use log::trace;

use crate::types::Value;

pub type Frame = HashMap<String, Value>;

/// Lexically nested variable frames; index 0 is the global frame.
///
/// Lookups go innermost first. While a recording is open every lookup is
/// noted, which is how the walker learns what a processor depended on.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    recordings: RefCell<Vec<BTreeSet<String>>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::from_frame(Frame::new())
    }

    pub fn from_frame(global: Frame) -> Self {
        Self { frames: vec![global], recordings: RefCell::new(Vec::new()) }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame. The global frame is never popped.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 { self.frames.pop() } else { None }
    }

    /// Nearest binding of `name`, recorded as a read.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.record(name);
        self.peek(name).cloned()
    }

    /// Nearest binding of `name` without recording the read.
    pub fn peek(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn get_global(&self, name: &str) -> Option<&Value> {
        self.frames[0].get(name)
    }

    /// Binds `name` in the innermost frame.
    pub fn set(&mut self, name: &str, value: Value) {
        trace!("ScopeStack::set '{}' at depth {}", name, self.frames.len());
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        trace!("ScopeStack::set_global '{}'", name);
        self.frames[0].insert(name.to_string(), value);
    }

    /// Replaces the innermost frame wholesale.
    pub fn set_frame(&mut self, frame: Frame) {
        if let Some(current) = self.frames.last_mut() {
            *current = frame;
        }
    }

    /// The non-global frames collapsed into one, inner frames winning.
    pub fn locals(&self) -> Frame {
        let mut flat = Frame::new();
        for frame in self.frames.iter().skip(1) {
            for (name, value) in frame {
                flat.insert(name.clone(), value.clone());
            }
        }
        flat
    }

    pub fn global_frame(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn into_global(mut self) -> Frame {
        self.frames.swap_remove(0)
    }

    pub fn replace_global(&mut self, global: Frame) {
        self.frames[0] = global;
    }

    pub fn begin_recording(&self) {
        self.recordings.borrow_mut().push(BTreeSet::new());
    }

    /// Closes the innermost recording and returns the names read while it was open.
    pub fn end_recording(&self) -> BTreeSet<String> {
        self.recordings.borrow_mut().pop().unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        !self.recordings.borrow().is_empty()
    }

    // Reads count for every open recording, so an outer step sees what nested steps read.
    fn record(&self, name: &str) {
        for recording in self.recordings.borrow_mut().iter_mut() {
            recording.insert(name.to_string());
        }
    }
}

use crate::value::Variable;
use std::ops::{Deref, DerefMut};

/// Unique variables of the list entries enclosing the current node
///
/// Frames are pushed only through `UniqueScope`, which pops its frame when
/// dropped, so the stack is balanced on every return path.
#[derive(Debug, Default)]
pub struct UniqueStack {
    vars: Vec<Variable>,
    frames: Vec<usize>,
}

impl UniqueStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// All active unique variables, outermost first
    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name == name)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Guard holding one frame of a `UniqueStack`
pub struct UniqueScope<'a> {
    stack: &'a mut UniqueStack,
}

impl<'a> UniqueScope<'a> {
    pub fn push(stack: &'a mut UniqueStack, vars: Vec<Variable>) -> Self {
        stack.frames.push(stack.vars.len());
        stack.vars.extend(vars.into_iter().map(|v| Variable { unique: true, ..v }));
        Self { stack }
    }
}

impl Deref for UniqueScope<'_> {
    type Target = UniqueStack;

    fn deref(&self) -> &UniqueStack {
        self.stack
    }
}

impl DerefMut for UniqueScope<'_> {
    fn deref_mut(&mut self) -> &mut UniqueStack {
        self.stack
    }
}

impl Drop for UniqueScope<'_> {
    fn drop(&mut self) {
        if let Some(len) = self.stack.frames.pop() {
            self.stack.vars.truncate(len);
        }
    }
}

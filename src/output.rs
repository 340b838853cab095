//! Task output store and placeholders
//!
//! Task results are keyed by task name. Before a task has run, its output can
//! still be referenced through a [`Placeholder`]: a shared cell that every
//! holder observes once the engine resolves it. Reading an unresolved
//! placeholder is an error, distinct from a task that ran and produced
//! nothing (`Value::Null`).

use crate::error::OutputError;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A named reference to a task output that may not exist yet.
///
/// Clones share one underlying cell, so resolving the output makes the value
/// visible through every clone handed out earlier.
#[derive(Clone)]
pub struct Placeholder {
    name: Rc<str>,
    cell: Rc<RefCell<Option<Value>>>,
}

impl Placeholder {
    fn new(name: &str) -> Self {
        Placeholder {
            name: Rc::from(name),
            cell: Rc::new(RefCell::new(None)),
        }
    }

    /// Name of the task this placeholder refers to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the referenced task has produced its output
    pub fn is_resolved(&self) -> bool {
        self.cell.borrow().is_some()
    }

    /// The resolved value; fails until the referenced task has completed
    pub fn value(&self) -> Result<Value, OutputError> {
        self.cell
            .borrow()
            .clone()
            .ok_or_else(|| OutputError::Unresolved(self.name.to_string()))
    }

    fn resolve(&self, value: Value) {
        *self.cell.borrow_mut() = Some(value);
    }
}

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Placeholder({})", self.name)
    }
}

/// A task output: either the concrete value or a pending placeholder
#[derive(Debug)]
pub enum Output {
    Ready(Value),
    Pending(Placeholder),
}

/// Store of task outputs for one engine, keyed by task name
#[derive(Debug, Default)]
pub struct OutputStore {
    cells: HashMap<String, Placeholder>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared placeholder for `task`, created on first request
    pub fn placeholder(&mut self, task: &str) -> Placeholder {
        self.cells
            .entry(task.to_string())
            .or_insert_with(|| Placeholder::new(task))
            .clone()
    }

    /// The concrete value once resolved, else the shared placeholder
    pub fn get(&mut self, task: &str) -> Output {
        let cell = self.placeholder(task);
        match cell.value() {
            Ok(value) => Output::Ready(value),
            Err(_) => Output::Pending(cell),
        }
    }

    /// The concrete value; fails with the unresolved-reference error otherwise
    pub fn value(&self, task: &str) -> Result<Value, OutputError> {
        match self.cells.get(task) {
            Some(cell) => cell.value(),
            None => Err(OutputError::Unresolved(task.to_string())),
        }
    }

    /// Record `task`'s output, resolving any previously issued placeholder
    pub fn set(&mut self, task: &str, value: Value) {
        self.placeholder(task).resolve(value);
    }

    /// Whether `task` has a resolved output
    pub fn is_resolved(&self, task: &str) -> bool {
        self.cells.get(task).map(Placeholder::is_resolved).unwrap_or(false)
    }

    /// Drop all outputs and placeholders, for an independent run
    pub fn reset(&mut self) {
        self.cells.clear();
    }
}

//! Execution context handed to a running task
//!
//! The context is the only way task logic reaches engine state: the task's
//! own fields, the current resource handle, other tasks' outputs, and the
//! run-level format variables.

use crate::error::{Result, TaskError};
use crate::output::OutputStore;
use crate::resource::ResourceManager;
use crate::runner::interpolate::interpolate;
use crate::runner::task::Fields;
use serde_json::Value;

/// Per-execution view of a task's surroundings
pub struct TaskContext<'a> {
    task: &'a str,
    fields: &'a Fields,
    vars: &'a Fields,
    resources: &'a ResourceManager,
    outputs: &'a OutputStore,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        task: &'a str,
        fields: &'a Fields,
        vars: &'a Fields,
        resources: &'a ResourceManager,
        outputs: &'a OutputStore,
    ) -> Self {
        TaskContext {
            task,
            fields,
            vars,
            resources,
            outputs,
        }
    }

    /// Name of the running task
    pub fn task(&self) -> &str {
        self.task
    }

    /// Resolve one of the task's declared fields
    pub fn field(&self, name: &str) -> Result<Value> {
        self.fields.resolve(name)
    }

    /// Resolve a field that must be a string
    pub fn field_str(&self, name: &str) -> Result<String> {
        match self.field(name)? {
            Value::String(s) => Ok(s),
            _ => Err(TaskError::FieldType {
                field: name.to_string(),
                expected: "string",
            }
            .into()),
        }
    }

    /// The current resource handle, downcast to its concrete type.
    ///
    /// Handles must not be held across task boundaries: the same capability
    /// may be backed by a different handle once the manager cycles it.
    pub fn resource<T: 'static>(&self) -> Result<&T> {
        Ok(self.resources.current::<T>()?)
    }

    /// Another task's concrete output; unresolved references are errors
    pub fn output(&self, task: &str) -> Result<Value> {
        Ok(self.outputs.value(task)?)
    }

    /// Render a `${var}` template against the run-level format variables
    pub fn render(&self, template: &str) -> Result<String> {
        interpolate(template, self.vars)
    }
}

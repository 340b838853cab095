//! Task definitions
//!
//! A [`TaskDef`] couples a unit of work with everything the engine needs to
//! run it: its name, the resource it borrows, an optional per-task resource
//! configuration, the failure-exemption flag, and its declared fields. Field
//! values may be placeholder references to other tasks' outputs, resolved at
//! read time.

use crate::config::Config;
use crate::error::{InterfaceError, Result, TaskError};
use crate::output::Placeholder;
use crate::resource::Resource;
use crate::runner::context::TaskContext;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// A unit of work.
///
/// The `&self` receiver keeps task logic stateless across executions; any
/// closure with the matching signature is a task.
pub trait Task {
    fn run(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<Value>;
}

impl<F> Task for F
where
    F: Fn(&mut TaskContext<'_>) -> anyhow::Result<Value>,
{
    fn run(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<Value> {
        self(ctx)
    }
}

/// A field value on a task definition
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Declared required but not yet supplied
    Required,
    /// A concrete value
    Value(Value),
    /// A deferred reference to another task's output
    Ref(Placeholder),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(Value::String(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Value(Value::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Value(Value::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Value(Value::Bool(value))
    }
}

impl From<Placeholder> for FieldValue {
    fn from(placeholder: Placeholder) -> Self {
        FieldValue::Ref(placeholder)
    }
}

/// Named field map attached to a task definition
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: HashMap<String, FieldValue>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.get(name)
    }

    /// Resolve `name` to a concrete value, following placeholder references
    pub fn resolve(&self, name: &str) -> Result<Value> {
        match self.entries.get(name) {
            None => Err(TaskError::UnknownField(name.to_string()).into()),
            Some(FieldValue::Required) => Err(TaskError::UnsetField(name.to_string()).into()),
            Some(FieldValue::Value(value)) => Ok(value.clone()),
            Some(FieldValue::Ref(placeholder)) => Ok(placeholder.value()?),
        }
    }
}

/// A task definition: identity, resource needs, flags, fields, and logic
#[derive(Clone)]
pub struct TaskDef {
    name: String,
    resource: Option<Rc<dyn Resource>>,
    resource_config: Option<Rc<Config>>,
    run_with_exceptions: bool,
    required_fields: Vec<String>,
    fields: Fields,
    task: Rc<dyn Task>,
}

impl TaskDef {
    /// Define a task from its name and logic
    pub fn new(name: impl Into<String>, task: impl Task + 'static) -> Self {
        TaskDef {
            name: name.into(),
            resource: None,
            resource_config: None,
            run_with_exceptions: false,
            required_fields: Vec::new(),
            fields: Fields::new(),
            task: Rc::new(task),
        }
    }

    /// Derive a new definition from `base`, keeping its logic, resource,
    /// flags, and fields; apply overrides with the builder methods.
    pub fn extend(name: impl Into<String>, base: &TaskDef) -> Self {
        TaskDef {
            name: name.into(),
            ..base.clone()
        }
    }

    /// Require `resource` to be open while the task runs
    pub fn with_resource(mut self, resource: Rc<dyn Resource>) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Open the required resource with this configuration instead of the
    /// engine default.
    ///
    /// Reuse is decided by reference identity: pass the same `Rc` back to
    /// share one handle with neighboring tasks.
    pub fn with_resource_config(mut self, config: Rc<Config>) -> Self {
        self.resource_config = Some(config);
        self
    }

    /// Keep running this task after earlier tasks have failed
    pub fn run_with_exceptions(mut self, yes: bool) -> Self {
        self.run_with_exceptions = yes;
        self
    }

    /// Declare fields that must be supplied before the definition registers
    pub fn with_required_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if self.fields.get(&name).is_none() {
                self.fields.insert(name.clone(), FieldValue::Required);
            }
            self.required_fields.push(name);
        }
        self
    }

    /// Supply a field value or a placeholder reference to another task's output
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource(&self) -> Option<&Rc<dyn Resource>> {
        self.resource.as_ref()
    }

    pub fn resource_config(&self) -> Option<&Rc<Config>> {
        self.resource_config.as_ref()
    }

    pub fn runs_with_exceptions(&self) -> bool {
        self.run_with_exceptions
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Names of declared required fields still left unset, in declaration
    /// order, deduplicated
    fn missing_fields(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for name in &self.required_fields {
            if !seen.insert(name.as_str()) {
                continue;
            }
            match self.fields.get(name) {
                None | Some(FieldValue::Required) => missing.push(name.clone()),
                Some(_) => {}
            }
        }
        missing
    }

    /// Verify that every declared required field has been supplied
    pub(crate) fn check_interface(&self) -> std::result::Result<(), InterfaceError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(InterfaceError {
                task: self.name.clone(),
                missing,
            })
        }
    }

    pub(crate) fn invoke(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<Value> {
        self.task.run(ctx)
    }
}

impl fmt::Debug for TaskDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDef")
            .field("name", &self.name)
            .field("resource", &self.resource.as_ref().map(|r| r.name()))
            .field("run_with_exceptions", &self.run_with_exceptions)
            .finish()
    }
}

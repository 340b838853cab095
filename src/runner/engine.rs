//! Run orchestration
//!
//! The engine walks a task list strictly in order, keeps the right resource
//! open through the resource manager, and records each output as soon as the
//! producing task completes. Failures are contained: once any task fails the
//! remaining tasks are skipped unless individually exempted, the loop keeps
//! going, and every recorded error is surfaced in one aggregate at the end.

use crate::config::Config;
use crate::error::{ConfigError, FailureKind, Result, RunError, TaskFailure};
use crate::output::{Output, OutputStore, Placeholder};
use crate::resource::{Resource, ResourceManager};
use crate::runner::context::TaskContext;
use crate::runner::registry::Registry;
use crate::runner::task::{FieldValue, Fields, TaskDef};
use serde_json::Value;
use std::rc::Rc;
use tracing::{info, warn};

/// Task execution engine
pub struct Engine {
    config: Rc<Config>,
    registry: Registry,
    outputs: OutputStore,
    vars: Fields,
}

impl Engine {
    /// Engine with an empty default configuration
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Engine with `config` as the default resource configuration
    pub fn with_config(config: Config) -> Self {
        Engine {
            config: Rc::new(config),
            registry: Registry::new(),
            outputs: OutputStore::new(),
            vars: Fields::new(),
        }
    }

    /// The default configuration shared with resource opens
    pub fn config(&self) -> &Rc<Config> {
        &self.config
    }

    /// Register a task definition; see [`Registry::define`]
    pub fn define(&mut self, def: TaskDef) -> Result<()> {
        self.registry.define(def)
    }

    /// The ordered registry of defined tasks
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Shared placeholder for `task`'s future output
    pub fn placeholder(&mut self, task: &str) -> Placeholder {
        self.outputs.placeholder(task)
    }

    /// `task`'s output: concrete once it has run, a placeholder before
    pub fn output(&mut self, task: &str) -> Output {
        self.outputs.get(task)
    }

    /// `task`'s concrete output; fails while unresolved
    pub fn output_of(&self, task: &str) -> Result<Value> {
        Ok(self.outputs.value(task)?)
    }

    /// Set a run-level format variable used by [`TaskContext::render`]
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.vars.insert(name, value.into());
    }

    /// Drop all recorded outputs, for an independent run
    pub fn reset_outputs(&mut self) {
        self.outputs.reset();
    }

    /// Run every registered task in definition order
    pub fn run(&mut self) -> Result<()> {
        info!("using default task list");
        let defs: Vec<&TaskDef> = self.registry.iter().collect();
        execute(&self.config, &self.vars, &mut self.outputs, &defs)
    }

    /// Run exactly the given tasks, in the given order.
    ///
    /// Registered tasks not named here are left out entirely, not failed.
    pub fn run_selected(&mut self, names: &[&str]) -> Result<()> {
        info!("using custom task list");
        let mut defs = Vec::with_capacity(names.len());
        for name in names {
            match self.registry.get(name) {
                Some(def) => defs.push(def),
                None => return Err(ConfigError::TaskNotFound(name.to_string()).into()),
            }
        }
        execute(&self.config, &self.vars, &mut self.outputs, &defs)
    }

    /// Validate and run a single definition without registering it, returning
    /// its output
    pub fn run_task(&mut self, def: TaskDef) -> Result<Value> {
        def.check_interface()?;
        let name = def.name().to_string();
        execute(&self.config, &self.vars, &mut self.outputs, &[&def])?;
        self.output_of(&name)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct resources required by `defs`, in first-seen order
fn required_resources<'a>(defs: &[&'a TaskDef]) -> Vec<&'a Rc<dyn Resource>> {
    let mut seen: Vec<&Rc<dyn Resource>> = Vec::new();
    for def in defs {
        if let Some(resource) = def.resource() {
            if !seen.iter().any(|r| Rc::ptr_eq(r, resource)) {
                seen.push(resource);
            }
        }
    }
    seen
}

/// Verify every required configuration key before any task runs or any
/// resource is opened; all missing keys are reported together.
fn check_config(config: &Config, defs: &[&TaskDef]) -> Result<()> {
    let mut entries = Vec::new();
    for resource in required_resources(defs) {
        for key in resource.required_keys() {
            if !config.is_set(key) {
                entries.push(format!("resource '{}' requires '{}'", resource.name(), key));
            }
        }
    }
    if entries.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingKeys { entries }.into())
    }
}

/// Run `defs` in order under a fresh resource scope
fn execute(
    config: &Rc<Config>,
    vars: &Fields,
    outputs: &mut OutputStore,
    defs: &[&TaskDef],
) -> Result<()> {
    check_config(config, defs)?;
    info!("running tasks");

    let mut manager = ResourceManager::new(config.clone());
    let mut failures: Vec<TaskFailure> = Vec::new();

    for def in defs {
        if !failures.is_empty() {
            if !def.runs_with_exceptions() {
                warn!(task = %def.name(), "skipping task after an earlier failure");
                continue;
            }
            warn!(
                task = %def.name(),
                "running task after an earlier failure (run_with_exceptions)"
            );
        }

        if let Err(err) = manager.ensure(def.resource().cloned(), def.resource_config().cloned()) {
            warn!(task = %def.name(), error = %err, "could not open resource for task");
            failures.push(TaskFailure {
                task: def.name().to_string(),
                kind: FailureKind::Resource,
                error: anyhow::Error::new(err),
            });
            continue;
        }

        info!(task = %def.name(), "running task");
        let mut ctx = TaskContext::new(def.name(), def.fields(), vars, &manager, outputs);
        match def.invoke(&mut ctx) {
            Ok(value) => outputs.set(def.name(), value),
            Err(error) => {
                warn!(task = %def.name(), error = %error, "could not run task");
                failures.push(TaskFailure {
                    task: def.name().to_string(),
                    kind: FailureKind::Task,
                    error,
                });
            }
        }
    }

    // Scope teardown: close whatever is still open. A close failure joins the
    // failure record instead of displacing it.
    match manager.release() {
        Ok(suppress) => {
            if failures.is_empty() {
                info!("all tasks complete");
                return Ok(());
            }
            if suppress {
                warn!(
                    count = failures.len(),
                    "suppressing run failures at resource close request"
                );
                return Ok(());
            }
            Err(RunError { failures }.into())
        }
        Err(err) => {
            warn!(error = %err, "could not close resource during run teardown");
            if failures.is_empty() {
                return Err(err.into());
            }
            let resource = err.resource().unwrap_or("resource").to_string();
            failures.push(TaskFailure {
                task: resource,
                kind: FailureKind::Resource,
                error: anyhow::Error::new(err),
            });
            Err(RunError { failures }.into())
        }
    }
}

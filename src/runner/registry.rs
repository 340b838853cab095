//! Ordered task registry
//!
//! Definitions are interface-checked when they are added, so malformed tasks
//! fail fast instead of mid-run. Registration order is execution order.

use crate::error::{ConfigError, Result};
use crate::runner::task::TaskDef;
use tracing::debug;

/// Ordered collection of defined tasks
#[derive(Debug, Default)]
pub struct Registry {
    defs: Vec<TaskDef>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition after verifying its interface.
    ///
    /// Fails with an interface error naming the unset required fields, or
    /// with a configuration error when the name is already taken.
    pub fn define(&mut self, def: TaskDef) -> Result<()> {
        if self.get(def.name()).is_some() {
            return Err(ConfigError::DuplicateTask(def.name().to_string()).into());
        }
        def.check_interface()?;
        debug!(task = %def.name(), "registered task");
        self.defs.push(def);
        Ok(())
    }

    /// Look up a definition by name
    pub fn get(&self, name: &str) -> Option<&TaskDef> {
        self.defs.iter().find(|d| d.name() == name)
    }

    /// All definitions, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TaskDef> {
        self.defs.iter()
    }

    /// Registered task names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.defs.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConveyorError;
    use crate::runner::context::TaskContext;
    use serde_json::Value;

    fn def(name: &str) -> TaskDef {
        TaskDef::new(name, |_: &mut TaskContext<'_>| Ok(Value::Null))
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = Registry::new();
        registry.define(def("extract")).unwrap();
        registry.define(def("transform")).unwrap();
        registry.define(def("load")).unwrap();

        assert_eq!(registry.names(), vec!["extract", "transform", "load"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = Registry::new();
        registry.define(def("t")).unwrap();

        let err = registry.define(def("t")).unwrap_err();
        assert!(matches!(
            err,
            ConveyorError::Config(ConfigError::DuplicateTask(ref name)) if name == "t"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unset_required_field_fails_registration() {
        let mut registry = Registry::new();
        let incomplete = def("upload").with_required_fields(["bucket"]);

        let err = registry.define(incomplete).unwrap_err();
        match err {
            ConveyorError::Interface(err) => {
                assert_eq!(err.task, "upload");
                assert_eq!(err.missing, vec!["bucket"]);
            }
            other => panic!("expected interface error, got {other}"),
        }
        assert!(registry.is_empty());

        // supplying the field makes the same definition register
        let complete = def("upload")
            .with_required_fields(["bucket"])
            .with_field("bucket", "archive");
        registry.define(complete).unwrap();
    }
}

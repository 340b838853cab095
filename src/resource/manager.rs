//! Scope-bound resource manager
//!
//! The manager owns the single active (resource, configuration) pair for the
//! duration of a run. Switching to a different resource, or to the same
//! resource under a different configuration object, closes the previous
//! handle before opening the next one; identical requests reuse the live
//! handle untouched. Identity is reference identity: two configurations with
//! equal contents but different `Rc`s force a reopen.

use super::{Resource, ResourceSlot};
use crate::config::Config;
use crate::error::ResourceError;
use std::any::Any;
use std::rc::Rc;

struct Active {
    config: Rc<Config>,
    slot: ResourceSlot,
}

/// Tracks and transitions the single live resource handle of a run scope
pub struct ResourceManager {
    default_config: Rc<Config>,
    active: Option<Active>,
    // Set while an open attempt is in flight and left set if the attempt
    // failed, so cleanup knows there is nothing to close.
    opening: bool,
}

impl ResourceManager {
    pub fn new(default_config: Rc<Config>) -> Self {
        ResourceManager {
            default_config,
            active: None,
            opening: false,
        }
    }

    /// Make `resource`, under `config` or the scope default, the active
    /// resource.
    ///
    /// The same `Rc` pair as the current one is a no-op. Anything else closes
    /// the current handle (close failures propagate) and opens the requested
    /// one; the new pair is recorded as active before the open is attempted,
    /// so a failed open stays attributable during teardown. `None` closes the
    /// active resource without opening another.
    pub fn ensure(
        &mut self,
        resource: Option<Rc<dyn Resource>>,
        config: Option<Rc<Config>>,
    ) -> Result<(), ResourceError> {
        let config = config.unwrap_or_else(|| self.default_config.clone());
        if let (Some(active), Some(requested)) = (self.active.as_ref(), resource.as_ref()) {
            if Rc::ptr_eq(active.slot.resource(), requested) && Rc::ptr_eq(&active.config, &config)
            {
                return Ok(());
            }
        }

        self.cleanup()?;
        if let Some(resource) = resource {
            self.opening = true;
            self.active = Some(Active {
                config,
                slot: ResourceSlot::new(resource),
            });
            if let Some(active) = self.active.as_mut() {
                active.slot.open(&active.config)?;
            }
            self.opening = false;
        }
        Ok(())
    }

    /// Close whatever is active on scope exit.
    ///
    /// Returns the suppress flag from the resource's close; it applies only
    /// to an error in flight at this exact boundary.
    pub fn release(&mut self) -> Result<bool, ResourceError> {
        self.cleanup()
    }

    /// Borrow the live raw handle
    pub fn handle(&self) -> Result<&dyn Any, ResourceError> {
        match &self.active {
            Some(active) => active.slot.handle(),
            None => Err(ResourceError::NotOpen),
        }
    }

    /// Borrow the live handle downcast to its concrete type
    pub fn current<T: 'static>(&self) -> Result<&T, ResourceError> {
        match &self.active {
            Some(active) => {
                let handle = active.slot.handle()?;
                handle
                    .downcast_ref::<T>()
                    .ok_or_else(|| ResourceError::WrongType {
                        resource: active.slot.resource().name().to_string(),
                        expected: std::any::type_name::<T>(),
                    })
            }
            None => Err(ResourceError::NotOpen),
        }
    }

    fn cleanup(&mut self) -> Result<bool, ResourceError> {
        let mut suppress = false;
        if let Some(mut active) = self.active.take() {
            let skip_close = self.opening;
            self.opening = false;
            if !skip_close {
                suppress = active.slot.close()?;
            }
        }
        Ok(suppress)
    }
}

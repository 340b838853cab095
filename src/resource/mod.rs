//! External resource capabilities
//!
//! A [`Resource`] describes something tasks borrow while they run: a database
//! session, an object-storage client. The engine keeps at most one handle per
//! capability live at a time. Tasks reach the handle through their execution
//! context and must never hold it across task boundaries, because the manager
//! may cycle the handle between tasks.

pub mod manager;

pub use manager::ResourceManager;

use crate::config::Config;
use crate::error::ResourceError;
use std::any::Any;
use std::rc::Rc;
use tracing::info;

/// Raw handle produced by opening a resource
pub type ResourceHandle = Box<dyn Any>;

/// An external dependency with an open/close lifecycle
pub trait Resource {
    /// Capability name used in logs and errors
    fn name(&self) -> &str;

    /// Configuration keys that must be present and non-null before opening
    fn required_keys(&self) -> &[&str] {
        &[]
    }

    /// Open the resource with `config` and return its raw handle
    fn open(&self, config: &Config) -> anyhow::Result<ResourceHandle>;

    /// Close a previously opened handle.
    ///
    /// The returned flag asks the enclosing run scope to suppress an error
    /// currently in flight; return `false` unless the resource knows better.
    fn close(&self, handle: ResourceHandle) -> anyhow::Result<bool> {
        drop(handle);
        Ok(false)
    }
}

#[derive(Debug)]
enum SlotState {
    Closed,
    Opening,
    Open(ResourceHandle),
}

/// Per-capability lifecycle: `Closed -> Opening -> Open -> Closed`.
///
/// A failed open returns the slot to `Closed` without issuing a close;
/// closing a slot that is not open is a protocol error.
pub struct ResourceSlot {
    resource: Rc<dyn Resource>,
    state: SlotState,
}

impl ResourceSlot {
    pub fn new(resource: Rc<dyn Resource>) -> Self {
        ResourceSlot {
            resource,
            state: SlotState::Closed,
        }
    }

    /// The capability this slot manages
    pub fn resource(&self) -> &Rc<dyn Resource> {
        &self.resource
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SlotState::Open(_))
    }

    /// Open the slot with `config`
    pub fn open(&mut self, config: &Config) -> Result<(), ResourceError> {
        if self.is_open() {
            return Err(ResourceError::AlreadyOpen {
                resource: self.resource.name().to_string(),
            });
        }
        info!(resource = %self.resource.name(), "opening resource");
        self.state = SlotState::Opening;
        match self.resource.open(config) {
            Ok(handle) => {
                self.state = SlotState::Open(handle);
                Ok(())
            }
            Err(source) => {
                self.state = SlotState::Closed;
                Err(ResourceError::Open {
                    resource: self.resource.name().to_string(),
                    source,
                })
            }
        }
    }

    /// Close the slot, returning the resource's suppress flag
    pub fn close(&mut self) -> Result<bool, ResourceError> {
        info!(resource = %self.resource.name(), "closing resource");
        match std::mem::replace(&mut self.state, SlotState::Closed) {
            SlotState::Open(handle) => {
                self.resource
                    .close(handle)
                    .map_err(|source| ResourceError::Close {
                        resource: self.resource.name().to_string(),
                        source,
                    })
            }
            SlotState::Closed | SlotState::Opening => Err(ResourceError::CloseUnopened {
                resource: self.resource.name().to_string(),
            }),
        }
    }

    /// Borrow the live handle
    pub fn handle(&self) -> Result<&dyn Any, ResourceError> {
        match &self.state {
            SlotState::Open(handle) => Ok(handle.as_ref()),
            _ => Err(ResourceError::NotOpen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe {
        fail_open: bool,
        closes: Cell<u32>,
    }

    impl Resource for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn open(&self, _config: &Config) -> anyhow::Result<ResourceHandle> {
            if self.fail_open {
                anyhow::bail!("no route to host");
            }
            Ok(Box::new(7_u32))
        }

        fn close(&self, _handle: ResourceHandle) -> anyhow::Result<bool> {
            self.closes.set(self.closes.get() + 1);
            Ok(false)
        }
    }

    fn probe(fail_open: bool) -> Rc<Probe> {
        Rc::new(Probe {
            fail_open,
            closes: Cell::new(0),
        })
    }

    #[test]
    fn test_open_then_close() {
        let resource = probe(false);
        let mut slot = ResourceSlot::new(resource.clone());

        slot.open(&Config::new()).unwrap();
        assert!(slot.is_open());
        assert_eq!(slot.handle().unwrap().downcast_ref::<u32>(), Some(&7));

        assert!(!slot.close().unwrap());
        assert!(!slot.is_open());
        assert_eq!(resource.closes.get(), 1);
    }

    #[test]
    fn test_failed_open_returns_to_closed() {
        let resource = probe(true);
        let mut slot = ResourceSlot::new(resource.clone());

        let err = slot.open(&Config::new()).unwrap_err();
        assert!(matches!(err, ResourceError::Open { ref resource, .. } if resource == "probe"));
        assert!(!slot.is_open());
        assert!(matches!(slot.handle(), Err(ResourceError::NotOpen)));
    }

    #[test]
    fn test_close_unopened_is_an_error() {
        let resource = probe(false);
        let mut slot = ResourceSlot::new(resource.clone());

        assert!(matches!(
            slot.close(),
            Err(ResourceError::CloseUnopened { .. })
        ));

        // closing twice after one open fails the second time
        slot.open(&Config::new()).unwrap();
        slot.close().unwrap();
        assert!(matches!(
            slot.close(),
            Err(ResourceError::CloseUnopened { .. })
        ));
        assert_eq!(resource.closes.get(), 1);
    }

    #[test]
    fn test_double_open_is_an_error() {
        let mut slot = ResourceSlot::new(probe(false));
        slot.open(&Config::new()).unwrap();
        assert!(matches!(
            slot.open(&Config::new()),
            Err(ResourceError::AlreadyOpen { .. })
        ));
    }
}

//! Common test utilities

#![allow(dead_code)]

use conveyor::{Config, Resource, ResourceHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Shared event log recording task and resource activity in order
pub type EventLog = Rc<RefCell<Vec<String>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn push(log: &EventLog, event: impl Into<String>) {
    log.borrow_mut().push(event.into());
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.borrow().clone()
}

/// Fake connection handed out by [`FakeResource`]; the generation counts
/// how many times the resource has been opened.
pub struct FakeConn {
    pub generation: u32,
}

/// Recording resource double: logs opens and closes, can be told to fail on
/// open or close, and can ask the run scope to suppress in-flight errors.
pub struct FakeResource {
    name: String,
    required: Vec<&'static str>,
    log: EventLog,
    fail_open: bool,
    fail_close: bool,
    suppress_on_close: bool,
    opens: Cell<u32>,
}

impl FakeResource {
    pub fn new(name: &str, log: &EventLog) -> Rc<Self> {
        Rc::new(FakeResource {
            name: name.to_string(),
            required: Vec::new(),
            log: log.clone(),
            fail_open: false,
            fail_close: false,
            suppress_on_close: false,
            opens: Cell::new(0),
        })
    }

    pub fn with_required(name: &str, log: &EventLog, required: Vec<&'static str>) -> Rc<Self> {
        Rc::new(FakeResource {
            required,
            ..Self::unwrapped(name, log)
        })
    }

    pub fn failing_open(name: &str, log: &EventLog) -> Rc<Self> {
        Rc::new(FakeResource {
            fail_open: true,
            ..Self::unwrapped(name, log)
        })
    }

    pub fn failing_close(name: &str, log: &EventLog) -> Rc<Self> {
        Rc::new(FakeResource {
            fail_close: true,
            ..Self::unwrapped(name, log)
        })
    }

    pub fn suppressing(name: &str, log: &EventLog) -> Rc<Self> {
        Rc::new(FakeResource {
            suppress_on_close: true,
            ..Self::unwrapped(name, log)
        })
    }

    fn unwrapped(name: &str, log: &EventLog) -> Self {
        FakeResource {
            name: name.to_string(),
            required: Vec::new(),
            log: log.clone(),
            fail_open: false,
            fail_close: false,
            suppress_on_close: false,
            opens: Cell::new(0),
        }
    }

    /// How many times this resource has been opened
    pub fn opens(&self) -> u32 {
        self.opens.get()
    }
}

impl Resource for FakeResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_keys(&self) -> &[&str] {
        &self.required
    }

    fn open(&self, _config: &Config) -> anyhow::Result<ResourceHandle> {
        if self.fail_open {
            anyhow::bail!("induced open failure");
        }
        let generation = self.opens.get() + 1;
        self.opens.set(generation);
        push(&self.log, format!("open {}", self.name));
        Ok(Box::new(FakeConn { generation }))
    }

    fn close(&self, _handle: ResourceHandle) -> anyhow::Result<bool> {
        if self.fail_close {
            anyhow::bail!("induced close failure");
        }
        push(&self.log, format!("close {}", self.name));
        Ok(self.suppress_on_close)
    }
}

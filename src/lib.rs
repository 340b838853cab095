//! Conveyor - a resource-aware task execution engine
//!
//! Conveyor runs an ordered list of tasks, lazily opening and reusing one
//! external resource (a database session, an API client) across consecutive
//! tasks that need it, closing and reopening only when the required resource
//! or its configuration changes. A failing task does not abort the run: the
//! remaining tasks are skipped unless individually exempted, and every
//! failure is reported together at the end. Task outputs can be referenced
//! before they exist through shared placeholders that resolve mid-run.

// Public modules
pub mod config;
pub mod error;
pub mod output;
pub mod resource;
pub mod runner;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConveyorError, Result};
pub use output::{Output, OutputStore, Placeholder};
pub use resource::{Resource, ResourceHandle, ResourceManager, ResourceSlot};
pub use runner::{Engine, FieldValue, Fields, Registry, Task, TaskContext, TaskDef};
pub use serde_json::Value;

/// Current version of Conveyor
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Error types for Conveyor

use thiserror::Error;

/// Result type alias for Conveyor operations
pub type Result<T> = std::result::Result<T, ConveyorError>;

/// Main error type for Conveyor
#[derive(Error, Debug)]
pub enum ConveyorError {
    /// A task definition left required fields unset
    #[error("Interface error: {0}")]
    Interface(#[from] InterfaceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource open/close protocol errors
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Task output reference errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Task field access errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// One or more tasks failed during a run
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Error raised at definition time when a task leaves required fields unset
#[derive(Error, Debug)]
#[error("Task '{task}' must define the field(s) {}", .missing.join(", "))]
pub struct InterfaceError {
    /// Name of the offending task definition
    pub task: String,
    /// Missing field names, in declaration order
    pub missing: Vec<String>,
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required configuration keys are absent for resources the run needs
    #[error("Missing configuration value(s): {}", .entries.join("; "))]
    MissingKeys { entries: Vec<String> },

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Task '{0}' is already defined")]
    DuplicateTask(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Resource lifecycle errors
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Could not open resource '{resource}': {source}")]
    Open {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not close resource '{resource}': {source}")]
    Close {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Attempted to close an unopened resource '{resource}'")]
    CloseUnopened { resource: String },

    #[error("Resource '{resource}' is already open")]
    AlreadyOpen { resource: String },

    /// Programming error: task logic asked for a handle while nothing is live
    #[error("No resource is currently open")]
    NotOpen,

    #[error("Resource '{resource}' handle is not a {expected}")]
    WrongType {
        resource: String,
        expected: &'static str,
    },
}

impl ResourceError {
    /// The capability the error refers to, when known
    pub fn resource(&self) -> Option<&str> {
        match self {
            ResourceError::Open { resource, .. }
            | ResourceError::Close { resource, .. }
            | ResourceError::CloseUnopened { resource }
            | ResourceError::AlreadyOpen { resource }
            | ResourceError::WrongType { resource, .. } => Some(resource),
            ResourceError::NotOpen => None,
        }
    }
}

/// Task output reference errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Tried to read the unresolved output of task '{0}'")]
    Unresolved(String),
}

/// Task field access errors
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task field '{0}' is not defined")]
    UnknownField(String),

    #[error("Task field '{0}' was never set")]
    UnsetField(String),

    #[error("Task field '{field}' is not a {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),
}

/// How a task came to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The task's resource could not be opened or closed
    Resource,
    /// The task's own logic failed
    Task,
}

/// One failed task, in the order it failed during a run
#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub kind: FailureKind,
    /// The underlying error, preserved verbatim
    pub error: anyhow::Error,
}

/// Aggregate error for a run in which one or more tasks failed
#[derive(Error, Debug)]
#[error("{} task(s) failed while running: {}", .failures.len(), failed_names(.failures))]
pub struct RunError {
    pub failures: Vec<TaskFailure>,
}

impl RunError {
    /// Names of the failed tasks, in failure order
    pub fn tasks(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.task.as_str()).collect()
    }
}

fn failed_names(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| f.task.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

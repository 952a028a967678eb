//! Error types for Crucible.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors: bad pipeline authoring, fail the whole compilation
    #[error("box '{box_type}': {message}")]
    BoxConfig {
        box_type: &'static str,
        message: String,
    },

    #[error("unknown box type: {0}")]
    UnknownBoxType(String),

    #[error("variable '{name}' holds {actual} value but {expected} was requested")]
    VariableArity {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown variable type: {0}")]
    UnknownVariableType(String),

    #[error("variable '{0}' is not bound in the variables table")]
    UnboundVariable(String),

    #[error("task '{task_id}' has no limits for hardware group '{hw_group}'")]
    MissingLimits { task_id: String, hw_group: String },

    #[error("test '{test_id}' has no limits for hardware group '{hw_group}'")]
    MissingTestLimits { test_id: String, hw_group: String },

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    // Structural errors: detected at job config construction
    #[error("job config has an empty submission header")]
    EmptySubmission,

    #[error("job config has no tasks")]
    NoTasks,

    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),

    #[error("test '{test_id}' has no execution task")]
    MissingExecutionTask { test_id: String },

    #[error("test '{test_id}' must have exactly one evaluation task, found {count}")]
    EvaluationTaskCount { test_id: String, count: usize },

    // Soft compilation errors: carry a machine-readable code for the caller
    #[error("{}: {}", .code.as_str(), .message)]
    Soft {
        code: SoftErrorCode,
        box_type: &'static str,
        message: String,
    },

    // Serialization
    #[error("malformed job config: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Machine-readable code when this is a soft compilation error.
    pub fn soft_code(&self) -> Option<SoftErrorCode> {
        match self {
            Error::Soft { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Codes for compilation errors the caller maps to user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftErrorCode {
    IllegalEntryPoint,
}

impl SoftErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoftErrorCode::IllegalEntryPoint => "illegal-entry-point",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

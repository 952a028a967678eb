//! Tasks — the unit of work in a compiled job.

use crate::ids::{TaskId, TestId};
use crate::sandbox::SandboxConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Classification of test-scoped tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Initiation,
    Execution,
    Evaluation,
}

/// Command binary plus argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Command {
    pub bin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Command {
    pub fn new(bin: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            bin: bin.into(),
            args,
        }
    }
}

/// One unit of work dispatched to a worker.
///
/// A task with a sandbox block is an external task (runs sandboxed); a task
/// without one is an internal bookkeeping command (`cp`, `mkdir`, `fetch`,
/// `exists`, ...) interpreted by the worker itself. That presence rule is
/// also the wire-format discriminant, so no separate tag is serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    #[serde(rename = "task-id")]
    pub id: TaskId,
    pub priority: u32,
    #[serde(rename = "fatal-failure", default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal_failure: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<TaskId>,
    #[serde(rename = "test-id", default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<TestId>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    pub cmd: Command,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxConfig>,
}

impl Task {
    /// Internal bookkeeping task, no sandbox.
    pub fn internal(id: impl Into<TaskId>, priority: u32, cmd: Command) -> Self {
        Self {
            id: id.into(),
            priority,
            fatal_failure: false,
            dependencies: Vec::new(),
            test_id: None,
            task_type: None,
            cmd,
            sandbox: None,
        }
    }

    /// Sandboxed task.
    pub fn external(
        id: impl Into<TaskId>,
        priority: u32,
        cmd: Command,
        sandbox: SandboxConfig,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            fatal_failure: false,
            dependencies: Vec::new(),
            test_id: None,
            task_type: None,
            cmd,
            sandbox: Some(sandbox),
        }
    }

    pub fn with_test_id(mut self, test_id: impl Into<TestId>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn with_fatal_failure(mut self, fatal: bool) -> Self {
        self.fatal_failure = fatal;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<TaskId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn is_external(&self) -> bool {
        self.sandbox.is_some()
    }

    pub fn is_internal(&self) -> bool {
        self.sandbox.is_none()
    }

    pub fn is_initiation(&self) -> bool {
        self.task_type == Some(TaskType::Initiation)
    }

    pub fn is_execution(&self) -> bool {
        self.task_type == Some(TaskType::Execution)
    }

    pub fn is_evaluation(&self) -> bool {
        self.task_type == Some(TaskType::Evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_sandbox_presence() {
        let internal = Task::internal("mkdir.1", 1, Command::new("mkdir", vec!["d".into()]));
        assert!(internal.is_internal());
        assert!(!internal.is_external());

        let external = Task::external(
            "run.1",
            2,
            Command::new("/usr/bin/python3", vec![]),
            SandboxConfig::new("isolate"),
        );
        assert!(external.is_external());
    }

    #[test]
    fn test_task_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskType::Initiation).unwrap(),
            "\"initiation\""
        );
        assert_eq!(
            serde_json::to_string(&TaskType::Evaluation).unwrap(),
            "\"evaluation\""
        );
    }

    #[test]
    fn test_minimal_task_yaml_shape() {
        let task = Task::internal("fetch.1", 1, Command::new("fetch", vec!["f".into(), "d".into()]));
        let yaml = serde_yaml::to_string(&task).unwrap();
        assert!(yaml.contains("task-id: fetch.1"));
        assert!(!yaml.contains("sandbox"));
        assert!(!yaml.contains("test-id"));
        assert!(!yaml.contains("fatal-failure"));
    }
}

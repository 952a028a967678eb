//! The compiled job configuration.
//!
//! A [`JobConfig`] is the artifact handed to the broker/worker fleet: a
//! submission header plus an ordered task list. It is produced once by the
//! compiler and afterwards only cloned — either to drop a hardware group's
//! limits or to re-tune them — never mutated in place.

use crate::error::{Error, Result};
use crate::ids::{HwGroupId, JobId, TestId};
use crate::limits::Limits;
use crate::task::Task;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Job identity and dispatch metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionHeader {
    #[serde(rename = "job-id")]
    pub job_id: JobId,
    #[serde(rename = "file-collector")]
    pub file_collector: String,
    #[serde(default)]
    pub log: bool,
    #[serde(rename = "hw-groups")]
    pub hw_groups: Vec<HwGroupId>,
}

impl SubmissionHeader {
    pub fn new(
        job_id: impl Into<JobId>,
        file_collector: impl Into<String>,
        hw_groups: Vec<HwGroupId>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            file_collector: file_collector.into(),
            log: false,
            hw_groups,
        }
    }

    pub fn with_log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }
}

/// Tasks of one logical exercise test, derived from a job config.
///
/// Never stored: recomputed from the task list on demand.
#[derive(Debug, Clone)]
pub struct TestConfig<'a> {
    pub id: TestId,
    /// Initiation tasks plus untyped test-scoped bookkeeping tasks.
    pub initiation: Vec<&'a Task>,
    pub execution: Vec<&'a Task>,
    pub evaluation: &'a Task,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobConfig {
    pub submission: SubmissionHeader,
    pub tasks: Vec<Task>,
}

impl JobConfig {
    /// Build and validate a job config.
    ///
    /// Fails on an empty header or task list, duplicate task ids, a test
    /// without an execution task or without exactly one evaluation task, and
    /// execution tasks lacking limits for a declared hardware group.
    pub fn new(submission: SubmissionHeader, tasks: Vec<Task>) -> Result<Self> {
        let config = Self { submission, tasks };
        config.validate()?;
        Ok(config)
    }

    /// Parse a job config from its textual form, applying the same
    /// structural validation as [`JobConfig::new`].
    pub fn from_yaml(input: &str) -> Result<Self> {
        let config: JobConfig = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.submission.job_id.as_str().is_empty() {
            return Err(Error::EmptySubmission);
        }
        if self.tasks.is_empty() {
            return Err(Error::NoTasks);
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.id.clone()) {
                return Err(Error::DuplicateTaskId(task.id.to_string()));
            }
        }

        for task in &self.tasks {
            if !task.is_execution() {
                continue;
            }
            let Some(sandbox) = &task.sandbox else {
                continue;
            };
            for hw_group in &self.submission.hw_groups {
                if !sandbox.has_limits_for(hw_group) {
                    return Err(Error::MissingLimits {
                        task_id: task.id.to_string(),
                        hw_group: hw_group.to_string(),
                    });
                }
            }
        }

        self.tests()?;
        Ok(())
    }

    /// Partition tasks by test id into [`TestConfig`] groupings, enforcing
    /// the per-test structure: at least one execution task and exactly one
    /// evaluation task.
    pub fn tests(&self) -> Result<Vec<TestConfig<'_>>> {
        let mut grouped: BTreeMap<&TestId, Vec<&Task>> = BTreeMap::new();
        for task in &self.tasks {
            if let Some(test_id) = &task.test_id {
                grouped.entry(test_id).or_default().push(task);
            }
        }

        let mut tests = Vec::with_capacity(grouped.len());
        for (test_id, tasks) in grouped {
            let mut initiation = Vec::new();
            let mut execution = Vec::new();
            let mut evaluation = Vec::new();
            for task in tasks {
                if task.is_execution() {
                    execution.push(task);
                } else if task.is_evaluation() {
                    evaluation.push(task);
                } else {
                    initiation.push(task);
                }
            }

            if execution.is_empty() {
                return Err(Error::MissingExecutionTask {
                    test_id: test_id.to_string(),
                });
            }
            if evaluation.len() != 1 {
                return Err(Error::EvaluationTaskCount {
                    test_id: test_id.to_string(),
                    count: evaluation.len(),
                });
            }

            tests.push(TestConfig {
                id: test_id.clone(),
                initiation,
                execution,
                evaluation: evaluation[0],
            });
        }
        Ok(tests)
    }

    /// Clone with the given hardware group's limits intentionally removed
    /// from every execution task. The task graph is untouched.
    pub fn clone_without_limits(&self, hw_group: &HwGroupId) -> JobConfig {
        let mut clone = self.clone();
        for task in &mut clone.tasks {
            if !task.is_execution() {
                continue;
            }
            if let Some(sandbox) = &mut task.sandbox {
                sandbox.set_limits(Limits::undefined(hw_group.clone()));
            }
        }
        clone
    }

    /// Clone with the given hardware group's limits re-tuned per test.
    ///
    /// For each execution task whose test has an override, the existing
    /// limits for the group (or an empty baseline) are merged field-by-field
    /// with the override. Tasks of tests without an override are untouched.
    pub fn clone_with_new_limits(
        &self,
        hw_group: &HwGroupId,
        overrides: &HashMap<TestId, Limits>,
    ) -> JobConfig {
        let mut clone = self.clone();
        for task in &mut clone.tasks {
            if !task.is_execution() {
                continue;
            }
            let Some(test_id) = &task.test_id else {
                continue;
            };
            let Some(override_limits) = overrides.get(test_id) else {
                continue;
            };
            if let Some(sandbox) = &mut task.sandbox {
                let base = sandbox
                    .limits_for(hw_group)
                    .cloned()
                    .unwrap_or_else(|| Limits::new(hw_group.clone()));
                sandbox.set_limits(base.merged_with(override_limits));
            }
        }
        clone
    }
}

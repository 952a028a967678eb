//! The driver: ordered box sequences in, one job configuration out.

use crate::graph::sort_boxes;
use crucible_boxes::{CompilationParams, DirectoryLayout, PipelineBox};
use crucible_core::error::{Error, Result};
use crucible_core::ids::{HwGroupId, JobId, TestId};
use crucible_core::job::{JobConfig, SubmissionHeader};
use crucible_core::limits::Limits;
use crucible_core::task::Task;
use crucible_core::variable::VariablesTable;
use std::cell::Cell;
use tracing::{debug, warn};

/// One exercise test: its authored box graph, resolved variables, and the
/// resource limits for every declared hardware group.
pub struct TestPlan {
    pub id: TestId,
    pub boxes: Vec<Box<dyn PipelineBox>>,
    pub variables: VariablesTable,
    pub limits: Vec<Limits>,
}

/// Everything the compiler needs to produce a dispatchable job config.
pub struct CompilationRequest {
    pub job_id: JobId,
    pub file_collector: String,
    pub log: bool,
    pub hw_groups: Vec<HwGroupId>,
    pub layout: DirectoryLayout,
    pub tests: Vec<TestPlan>,
}

/// Pure, synchronous pipeline-to-job-config transformation.
///
/// Boxes may be submitted in any order; each test's graph is topologically
/// ordered over its variable data flow first. A failure at any box aborts
/// the whole compilation with no partial config exposed.
pub struct Compiler;

impl Compiler {
    pub fn compile(request: CompilationRequest) -> Result<JobConfig> {
        let counter = Cell::new(0u32);
        let mut tasks: Vec<Task> = Vec::new();

        for mut test in request.tests {
            check_limits_coverage(&test, &request.hw_groups)?;
            assign_test_directories(&mut test);

            let boxes = sort_boxes(test.boxes)
                .map_err(|e| Error::InvalidPipeline(format!("test '{}': {}", test.id, e)))?;

            for bx in &boxes {
                let output = {
                    let params = CompilationParams::new(&test.variables, &request.layout, &counter)
                        .for_test(test.id.clone());
                    bx.compile(&params)?
                };
                debug!(
                    test = %test.id,
                    box_type = bx.type_key(),
                    box_name = bx.name(),
                    tasks = output.tasks.len(),
                    writes = output.writes.len(),
                    "compiled box"
                );

                for write in output.writes {
                    test.variables.insert(write);
                }
                for mut task in output.tasks {
                    if task.is_execution()
                        && let Some(sandbox) = &mut task.sandbox
                    {
                        for limits in &test.limits {
                            sandbox.set_limits(limits.clone());
                        }
                    }
                    tasks.push(task);
                }
            }
        }

        if tasks.is_empty() {
            warn!(job_id = %request.job_id, "compilation produced no tasks");
        }

        let header = SubmissionHeader::new(request.job_id, request.file_collector, request.hw_groups)
            .with_log(request.log);
        JobConfig::new(header, tasks)
    }
}

/// Every declared hardware group must have a limits entry in every test.
fn check_limits_coverage(test: &TestPlan, hw_groups: &[HwGroupId]) -> Result<()> {
    for hw_group in hw_groups {
        if !test.limits.iter().any(|l| &l.hw_group_id == hw_group) {
            return Err(Error::MissingTestLimits {
                test_id: test.id.to_string(),
                hw_group: hw_group.to_string(),
            });
        }
    }
    Ok(())
}

/// File variables without an explicit directory live in the test's own
/// subdirectory, in both addressing contexts.
fn assign_test_directories(test: &mut TestPlan) {
    let test_id = test.id.clone();
    for (_, variable) in test.variables.iter_mut() {
        if variable.var_type().is_file() && variable.directory().is_none() {
            variable.set_directory(test_id.as_str());
        }
    }
}

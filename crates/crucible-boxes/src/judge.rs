//! The judge box: compares expected and actual outputs of one test.

use crate::base::{BoxOutput, PRIORITY_EVALUATION, PipelineBox, PortAccess, SANDBOX_NAME, declare_box};
use crate::params::CompilationParams;
use crucible_core::Result;
use crucible_core::port::PortDef;
use crucible_core::sandbox::SandboxConfig;
use crucible_core::task::{Command, Task, TaskType};
use crucible_core::variable::VariableType;

const JUDGE_NORMAL: &str = "/usr/bin/recodex-judge-normal";
const JUDGE_SHUFFLE: &str = "/usr/bin/recodex-judge-shuffle";
const JUDGE_DIFF: &str = "/usr/bin/diff";

/// Map a judge-type string to the judge binary. Case-insensitive; empty
/// selects the token-by-token default judge. `None` for unrecognized values.
pub fn judge_binary(judge_type: &str) -> Option<&'static str> {
    match judge_type.to_ascii_lowercase().as_str() {
        "" | "recodex-judge-normal" => Some(JUDGE_NORMAL),
        "recodex-judge-shuffle" => Some(JUDGE_SHUFFLE),
        "diff" => Some(JUDGE_DIFF),
        _ => None,
    }
}

declare_box! {
    /// Output comparison. The judge writes its verdict and score to stdout,
    /// so the task captures output for the result file.
    JudgeBox {
        type_key: "judge",
        default_name: "Judge",
        inputs: &[
            PortDef::optional("judge-type", VariableType::String),
            PortDef::optional("args", VariableType::StringArray),
            PortDef::required("expected-output", VariableType::File),
            PortDef::required("actual-output", VariableType::File),
        ],
        outputs: &[],
    }
}

impl JudgeBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let judge_type = match self.optional_input_variable(params, "judge-type")? {
            Some(variable) if !variable.is_empty() => self.scalar_of(variable)?,
            _ => String::new(),
        };
        let bin = judge_binary(&judge_type)
            .ok_or_else(|| self.config_error(format!("unknown judge type '{}'", judge_type)))?;

        let mut args = Vec::new();
        if let Some(user_args) = self.optional_input_variable(params, "args")? {
            args.extend(self.array_of(user_args)?);
        }
        let expected = self.input_variable(params, "expected-output")?;
        let actual = self.input_variable(params, "actual-output")?;
        args.push(params.eval_path(expected)?);
        args.push(params.eval_path(actual)?);

        let mut sandbox = SandboxConfig::new(SANDBOX_NAME);
        sandbox.output = true;
        sandbox.chdir = Some(params.eval_dir());

        let mut task = Task::external(
            params.next_task_id(self.name()),
            PRIORITY_EVALUATION,
            Command::new(bin, args),
            sandbox,
        );
        if let Some(test_id) = params.test_id() {
            task = task
                .with_test_id(test_id.clone())
                .with_type(TaskType::Evaluation);
        }
        Ok(BoxOutput::tasks(vec![task]))
    }
}

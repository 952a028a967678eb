//! Execution boxes.
//!
//! Each box emits one sandboxed execution task invoking an interpreter or a
//! compiled binary on its bound entry point. Bound stdin/stdout/stderr ports
//! are wired into the sandbox configuration; resource limits are attached
//! later by the driver, per hardware group.

use crate::base::{BoxOutput, PRIORITY_EXECUTION, PipelineBox, PortAccess, SANDBOX_NAME, declare_box};
use crate::params::CompilationParams;
use crucible_core::Result;
use crucible_core::error::{Error, SoftErrorCode};
use crucible_core::port::PortDef;
use crucible_core::sandbox::SandboxConfig;
use crucible_core::task::{Command, Task, TaskType};
use crucible_core::variable::{Variable, VariableType};
use regex::Regex;
use std::sync::LazyLock;

static ENTRY_POINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_][a-zA-Z0-9_.-]*$").unwrap()
});

const STDIN_PORT: PortDef = PortDef::optional("stdin", VariableType::File);
const ARGS_PORT: PortDef = PortDef::optional("args", VariableType::StringArray);
const INPUT_FILES_PORT: PortDef = PortDef::optional("input-files", VariableType::FileArray);

const STDIO_OUTPUTS: &[PortDef] = &[
    PortDef::optional("stdout", VariableType::File),
    PortDef::optional("stderr", VariableType::File),
    PortDef::optional("output-file", VariableType::File),
];

/// Reject entry-point names that could be mistaken for interpreter options
/// or escape the test directory. Raised as a soft error so the frontend can
/// tell authors what to fix.
fn checked_entry_point(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    variable: &Variable,
) -> Result<String> {
    let name = variable
        .as_scalar()
        .map_err(|e| bx.config_error(e.to_string()))?;
    if !ENTRY_POINT_RE.is_match(name) {
        return Err(Error::Soft {
            code: SoftErrorCode::IllegalEntryPoint,
            box_type: bx.type_key(),
            message: format!("'{}' is not a valid entry point name", name),
        });
    }
    params.eval_path(variable)
}

/// The one execution task of a box, stdio wired from the bound ports.
fn execution_task(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    bin: String,
    mut args: Vec<String>,
) -> Result<BoxOutput> {
    if let Some(user_args) = bx.optional_input_variable(params, "args")? {
        args.extend(bx.array_of(user_args)?);
    }

    let mut sandbox = SandboxConfig::new(SANDBOX_NAME);
    if let Some(stdin) = bx.optional_input_variable(params, "stdin")? {
        sandbox.stdin = Some(params.eval_path(stdin)?);
    }
    if let Some(stdout) = bx.optional_output_variable(params, "stdout")? {
        sandbox.stdout = Some(params.eval_path(stdout)?);
    }
    if let Some(stderr) = bx.optional_output_variable(params, "stderr")? {
        sandbox.stderr = Some(params.eval_path(stderr)?);
    }
    sandbox.chdir = Some(params.eval_dir());

    let mut task = Task::external(
        params.next_task_id(bx.name()),
        PRIORITY_EXECUTION,
        Command::new(bin, args),
        sandbox,
    );
    if let Some(test_id) = params.test_id() {
        task = task
            .with_test_id(test_id.clone())
            .with_type(TaskType::Execution);
    }
    Ok(BoxOutput::tasks(vec![task]))
}

declare_box! {
    /// Native binary execution.
    ElfExecutionBox {
        type_key: "elf-exec",
        default_name: "ELF Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("binary-file", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl ElfExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let binary = self.input_variable(params, "binary-file")?;
        execution_task(self, params, params.eval_path(binary)?, vec![])
    }
}

declare_box! {
    /// .NET assembly execution under Mono.
    MonoExecutionBox {
        type_key: "mono-exec",
        default_name: "Mono Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("assembly", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl MonoExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let assembly = self.input_variable(params, "assembly")?;
        execution_task(
            self,
            params,
            "/usr/bin/mono".to_string(),
            vec![params.eval_path(assembly)?],
        )
    }
}

declare_box! {
    /// Python script execution.
    PythonExecutionBox {
        type_key: "python3",
        default_name: "Python Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("script-file", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl PythonExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let script = self.input_variable(params, "script-file")?;
        let entry = checked_entry_point(self, params, script)?;
        execution_task(self, params, "/usr/bin/python3".to_string(), vec![entry])
    }
}

declare_box! {
    /// Script execution under an author-chosen interpreter.
    ScriptExecutionBox {
        type_key: "script-exec",
        default_name: "Script Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("script-file", VariableType::File),
            PortDef::optional("interpreter", VariableType::String),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl ScriptExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let script = self.input_variable(params, "script-file")?;
        let entry = checked_entry_point(self, params, script)?;
        let interpreter = match self.optional_input_variable(params, "interpreter")? {
            Some(variable) if !variable.is_empty() => self.scalar_of(variable)?,
            _ => "/bin/sh".to_string(),
        };
        execution_task(self, params, interpreter, vec![entry])
    }
}

declare_box! {
    /// Execution through an exercise-supplied wrapper (measuring harness,
    /// input generator, ...).
    WrappedExecutionBox {
        type_key: "wrapped-exec",
        default_name: "Wrapped Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("wrapper", VariableType::File),
            PortDef::required("binary-file", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl WrappedExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let wrapper = self.input_variable(params, "wrapper")?;
        let binary = self.input_variable(params, "binary-file")?;
        execution_task(
            self,
            params,
            params.eval_path(wrapper)?,
            vec![params.eval_path(binary)?],
        )
    }
}

declare_box! {
    /// JVM execution of a jar or a main class.
    JvmRunExecutionBox {
        type_key: "jvm-runner",
        default_name: "JVM Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::optional("jar-file", VariableType::File),
            PortDef::optional("main-class", VariableType::String),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl JvmRunExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let args = if let Some(jar) = self.optional_input_variable(params, "jar-file")?
            && !jar.is_empty()
        {
            vec!["-jar".to_string(), params.eval_path(jar)?]
        } else if let Some(main_class) = self.optional_input_variable(params, "main-class")?
            && !main_class.is_empty()
        {
            vec![
                "-classpath".to_string(),
                params.eval_dir(),
                self.scalar_of(main_class)?,
            ]
        } else {
            return Err(self.config_error("either 'jar-file' or 'main-class' must be bound"));
        };
        execution_task(self, params, "/usr/bin/java".to_string(), args)
    }
}

declare_box! {
    /// Haskell script execution with runghc.
    HaskellExecutionBox {
        type_key: "haskell-exec",
        default_name: "Haskell Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("source-file", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl HaskellExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let source = self.input_variable(params, "source-file")?;
        execution_task(
            self,
            params,
            "/usr/bin/runghc".to_string(),
            vec![params.eval_path(source)?],
        )
    }
}

declare_box! {
    /// Node.js script execution.
    NodeExecutionBox {
        type_key: "node",
        default_name: "Node Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("script-file", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl NodeExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let script = self.input_variable(params, "script-file")?;
        let entry = checked_entry_point(self, params, script)?;
        execution_task(self, params, "/usr/bin/node".to_string(), vec![entry])
    }
}

declare_box! {
    /// PHP script execution.
    PhpExecutionBox {
        type_key: "php",
        default_name: "PHP Execution",
        inputs: &[
            ARGS_PORT,
            STDIN_PORT,
            INPUT_FILES_PORT,
            PortDef::required("script-file", VariableType::File),
        ],
        outputs: STDIO_OUTPUTS,
    }
}

impl PhpExecutionBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let script = self.input_variable(params, "script-file")?;
        let entry = checked_entry_point(self, params, script)?;
        execution_task(self, params, "/usr/bin/php".to_string(), vec![entry])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DirectoryLayout;
    use crucible_core::variable::VariablesTable;
    use std::cell::Cell;

    fn make_table() -> VariablesTable {
        let mut table = VariablesTable::new();
        table.insert(
            Variable::new("binary", VariableType::File, "a.out")
                .unwrap()
                .with_directory("A"),
        );
        table.insert(
            Variable::new("test-input", VariableType::File, "in.txt")
                .unwrap()
                .with_directory("A"),
        );
        table.insert(
            Variable::new("actual", VariableType::File, "out.actual")
                .unwrap()
                .with_directory("A"),
        );
        table.insert(
            Variable::new("script", VariableType::File, "solution.py")
                .unwrap()
                .with_directory("A"),
        );
        table
    }

    fn make_params<'a>(
        table: &'a VariablesTable,
        layout: &'a DirectoryLayout,
        counter: &'a Cell<u32>,
    ) -> CompilationParams<'a> {
        CompilationParams::new(table, layout, counter).for_test("A")
    }

    #[test]
    fn test_elf_exec_wires_stdio() {
        let table = make_table();
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = make_params(&table, &layout, &counter);

        let mut bx = ElfExecutionBox::default();
        bx.bind_input("binary-file", "binary").unwrap();
        bx.bind_input("stdin", "test-input").unwrap();
        bx.bind_output("stdout", "actual").unwrap();

        let output = bx.compile(&params).unwrap();
        assert_eq!(output.tasks.len(), 1);
        let task = &output.tasks[0];
        assert!(task.is_execution());
        assert_eq!(task.priority, PRIORITY_EXECUTION);
        assert!(!task.fatal_failure);
        assert_eq!(task.cmd.bin, "${EVAL_DIR}/A/a.out");

        let sandbox = task.sandbox.as_ref().unwrap();
        assert_eq!(sandbox.stdin.as_deref(), Some("${EVAL_DIR}/A/in.txt"));
        assert_eq!(sandbox.stdout.as_deref(), Some("${EVAL_DIR}/A/out.actual"));
        assert_eq!(sandbox.stderr, None);
        assert_eq!(sandbox.chdir.as_deref(), Some("${EVAL_DIR}/A"));
    }

    #[test]
    fn test_python_rejects_illegal_entry_point() {
        let mut table = make_table();
        table.insert(
            Variable::new("script", VariableType::File, "-m evil")
                .unwrap()
                .with_directory("A"),
        );
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = make_params(&table, &layout, &counter);

        let mut bx = PythonExecutionBox::default();
        bx.bind_input("script-file", "script").unwrap();
        let err = bx.compile(&params).unwrap_err();
        assert_eq!(err.soft_code(), Some(SoftErrorCode::IllegalEntryPoint));
    }

    #[test]
    fn test_python_accepts_plain_entry_point() {
        let table = make_table();
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = make_params(&table, &layout, &counter);

        let mut bx = PythonExecutionBox::default();
        bx.bind_input("script-file", "script").unwrap();
        let output = bx.compile(&params).unwrap();
        assert_eq!(output.tasks[0].cmd.bin, "/usr/bin/python3");
        assert_eq!(output.tasks[0].cmd.args, vec!["${EVAL_DIR}/A/solution.py"]);
    }

    #[test]
    fn test_jvm_runner_requires_jar_or_main_class() {
        let table = make_table();
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = make_params(&table, &layout, &counter);

        let bx = JvmRunExecutionBox::default();
        let err = bx.compile(&params).unwrap_err();
        assert!(err.to_string().contains("jvm-runner"));
    }
}

//! Compiler boxes.
//!
//! Every compiler box emits one sandboxed initiation task running the
//! compiler binary, followed by an `exists` check on the declared output
//! artifacts. Compilers surface failure only as a missing artifact, not as
//! an exit code the worker would act on, so the trailing check is what
//! fails the test deterministically.

use crate::base::{
    BoxOutput, PRIORITY_INITIATION, PipelineBox, PortAccess, SANDBOX_NAME, declare_box, exists_task,
};
use crate::params::CompilationParams;
use crucible_core::Result;
use crucible_core::port::PortDef;
use crucible_core::sandbox::SandboxConfig;
use crucible_core::task::{Command, Task, TaskType};
use crucible_core::variable::VariableType;

const COMPILATION_FAILED: &str = "Compilation failed.";

const COMPILER_INPUTS: &[PortDef] = &[
    PortDef::optional("args", VariableType::StringArray),
    PortDef::required("source-files", VariableType::FileArray),
    PortDef::optional("extra-files", VariableType::FileArray),
];

const BINARY_OUTPUT: &[PortDef] = &[PortDef::required("binary-file", VariableType::File)];

/// One sandboxed compile task plus the exists check on `artifacts`
/// (source-context paths).
fn compiler_tasks(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    bin: String,
    args: Vec<String>,
    artifacts: Vec<String>,
) -> Result<BoxOutput> {
    let mut task = Task::external(
        params.next_task_id(bx.name()),
        PRIORITY_INITIATION,
        Command::new(bin, args),
        SandboxConfig::new(SANDBOX_NAME),
    )
    .with_fatal_failure(true);
    if let Some(test_id) = params.test_id() {
        task = task
            .with_test_id(test_id.clone())
            .with_type(TaskType::Initiation);
    }
    Ok(BoxOutput::tasks(vec![
        task,
        exists_task(params, COMPILATION_FAILED, artifacts),
    ]))
}

/// Gathered eval-context inputs common to the C-family boxes: user args,
/// then sources, then extra files.
fn gathered_args(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
) -> Result<Vec<String>> {
    let mut args = Vec::new();
    if let Some(user_args) = bx.optional_input_variable(params, "args")? {
        args.extend(bx.array_of(user_args)?);
    }
    let sources = bx.input_variable(params, "source-files")?;
    args.extend(params.eval_paths(sources)?);
    if let Some(extra) = bx.optional_input_variable(params, "extra-files")? {
        args.extend(params.eval_paths(extra)?);
    }
    Ok(args)
}

declare_box! {
    /// C compilation with gcc.
    GccCompilationBox {
        type_key: "gcc",
        default_name: "GCC Compilation",
        inputs: COMPILER_INPUTS,
        outputs: BINARY_OUTPUT,
    }
}

impl GccCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        compile_gcc_family(self, params, "/usr/bin/gcc")
    }
}

declare_box! {
    /// C++ compilation with g++.
    GppCompilationBox {
        type_key: "g++",
        default_name: "G++ Compilation",
        inputs: COMPILER_INPUTS,
        outputs: BINARY_OUTPUT,
    }
}

impl GppCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        compile_gcc_family(self, params, "/usr/bin/g++")
    }
}

fn compile_gcc_family(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    bin: &str,
) -> Result<BoxOutput> {
    let binary = bx.output_variable(params, "binary-file")?;
    let mut args = gathered_args(bx, params)?;
    args.push("-o".to_string());
    args.push(params.eval_path(binary)?);
    compiler_tasks(
        bx,
        params,
        bin.to_string(),
        args,
        vec![params.source_path(binary)?],
    )
}

declare_box! {
    /// Free Pascal compilation.
    FpcCompilationBox {
        type_key: "fpc",
        default_name: "FPC Compilation",
        inputs: COMPILER_INPUTS,
        outputs: BINARY_OUTPUT,
    }
}

impl FpcCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let binary = self.output_variable(params, "binary-file")?;
        let mut args = gathered_args(self, params)?;
        args.push(format!("-o{}", params.eval_path(binary)?));
        compiler_tasks(
            self,
            params,
            "/usr/bin/fpc".to_string(),
            args,
            vec![params.source_path(binary)?],
        )
    }
}

declare_box! {
    /// Java compilation; class files land next to the sources.
    JavacCompilationBox {
        type_key: "javac",
        default_name: "Javac Compilation",
        inputs: COMPILER_INPUTS,
        outputs: &[PortDef::required("class-files", VariableType::FileArray)],
    }
}

impl JavacCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let classes = self.output_variable(params, "class-files")?;
        let mut args = vec!["-d".to_string(), params.eval_dir()];
        args.extend(gathered_args(self, params)?);
        compiler_tasks(
            self,
            params,
            "/usr/bin/javac".to_string(),
            args,
            params.source_paths(classes)?,
        )
    }
}

declare_box! {
    /// Compilation with a named JVM-language compiler (kotlinc, scalac, ...).
    JvmCompilationBox {
        type_key: "jvm-compilation",
        default_name: "JVM Compilation",
        inputs: &[
            PortDef::required("compiler-name", VariableType::String),
            PortDef::optional("args", VariableType::StringArray),
            PortDef::required("source-files", VariableType::FileArray),
            PortDef::optional("extra-files", VariableType::FileArray),
        ],
        outputs: &[PortDef::required("jar-file", VariableType::File)],
    }
}

impl JvmCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let compiler = self.input_variable(params, "compiler-name")?;
        let jar = self.output_variable(params, "jar-file")?;
        let mut args = gathered_args(self, params)?;
        args.push("-d".to_string());
        args.push(params.eval_path(jar)?);
        compiler_tasks(
            self,
            params,
            self.scalar_of(compiler)?,
            args,
            vec![params.source_path(jar)?],
        )
    }
}

declare_box! {
    /// Compilation with an exercise-supplied compiler executable.
    CustomCompilationBox {
        type_key: "custom-compilation",
        default_name: "Custom Compilation",
        inputs: &[
            PortDef::required("compiler", VariableType::File),
            PortDef::optional("args", VariableType::StringArray),
            PortDef::required("source-files", VariableType::FileArray),
            PortDef::optional("extra-files", VariableType::FileArray),
        ],
        outputs: BINARY_OUTPUT,
    }
}

impl CustomCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let compiler = self.input_variable(params, "compiler")?;
        let binary = self.output_variable(params, "binary-file")?;
        let mut args = gathered_args(self, params)?;
        args.push(params.eval_path(binary)?);
        compiler_tasks(
            self,
            params,
            params.eval_path(compiler)?,
            args,
            vec![params.source_path(binary)?],
        )
    }
}

declare_box! {
    /// SWI-Prolog ahead-of-time compilation.
    PrologCompilationBox {
        type_key: "prolog",
        default_name: "Prolog Compilation",
        inputs: COMPILER_INPUTS,
        outputs: BINARY_OUTPUT,
    }
}

impl PrologCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let binary = self.output_variable(params, "binary-file")?;
        let mut args = Vec::new();
        if let Some(user_args) = self.optional_input_variable(params, "args")? {
            args.extend(self.array_of(user_args)?);
        }
        args.push("-o".to_string());
        args.push(params.eval_path(binary)?);
        args.push("-c".to_string());
        let sources = self.input_variable(params, "source-files")?;
        args.extend(params.eval_paths(sources)?);
        if let Some(extra) = self.optional_input_variable(params, "extra-files")? {
            args.extend(params.eval_paths(extra)?);
        }
        compiler_tasks(
            self,
            params,
            "/usr/bin/swipl".to_string(),
            args,
            vec![params.source_path(binary)?],
        )
    }
}

declare_box! {
    /// Parser generation with bison; the generated sources feed a later
    /// C/C++ compilation box.
    BisonCompilationBox {
        type_key: "bison",
        default_name: "Bison Parser Generation",
        inputs: &[
            PortDef::optional("args", VariableType::StringArray),
            PortDef::required("grammar-file", VariableType::File),
        ],
        outputs: &[PortDef::required("source-files", VariableType::FileArray)],
    }
}

impl BisonCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let grammar = self.input_variable(params, "grammar-file")?;
        let generated = self.output_variable(params, "source-files")?;
        let generated_eval = params.eval_paths(generated)?;
        let first = generated_eval
            .first()
            .ok_or_else(|| self.config_error("output port 'source-files' is empty"))?;

        let mut args = Vec::new();
        if let Some(user_args) = self.optional_input_variable(params, "args")? {
            args.extend(self.array_of(user_args)?);
        }
        args.push("-o".to_string());
        args.push(first.clone());
        args.push(params.eval_path(grammar)?);
        compiler_tasks(
            self,
            params,
            "/usr/bin/bison".to_string(),
            args,
            params.source_paths(generated)?,
        )
    }
}

declare_box! {
    /// Python bytecode pre-compilation; catches syntax errors before the
    /// execution phase.
    PythonCompilationBox {
        type_key: "python-compile",
        default_name: "Python Compilation",
        inputs: &[
            PortDef::optional("args", VariableType::StringArray),
            PortDef::required("source-files", VariableType::FileArray),
        ],
        outputs: &[PortDef::required("pyc-files", VariableType::FileArray)],
    }
}

impl PythonCompilationBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let pyc = self.output_variable(params, "pyc-files")?;
        let mut args = vec!["-m".to_string(), "py_compile".to_string()];
        if let Some(user_args) = self.optional_input_variable(params, "args")? {
            args.extend(self.array_of(user_args)?);
        }
        let sources = self.input_variable(params, "source-files")?;
        args.extend(params.eval_paths(sources)?);
        compiler_tasks(
            self,
            params,
            "/usr/bin/python3".to_string(),
            args,
            params.source_paths(pyc)?,
        )
    }
}

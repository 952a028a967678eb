//! The compile protocol shared by every box in the catalog.

use crate::params::CompilationParams;
use crucible_core::error::{Error, Result};
use crucible_core::port::{Port, PortDef};
use crucible_core::task::{Command, Task, TaskType};
use crucible_core::variable::Variable;
use std::collections::BTreeMap;

/// Priorities are ordering hints for the worker, not a hard schedule.
pub const PRIORITY_DEFAULT: u32 = 1;
pub const PRIORITY_INITIATION: u32 = 1;
pub const PRIORITY_EXECUTION: u32 = 2;
pub const PRIORITY_EVALUATION: u32 = 3;

/// Built-in worker commands usable without a sandbox.
pub mod commands {
    pub const COPY: &str = "cp";
    pub const MKDIR: &str = "mkdir";
    pub const RENAME: &str = "rename";
    pub const FETCH: &str = "fetch";
    pub const EXTRACT: &str = "extract";
    pub const EXISTS: &str = "exists";
}

/// Sandbox every external task runs in.
pub const SANDBOX_NAME: &str = "isolate";

/// What one box contributes to the compilation.
///
/// Pure boxes contribute only variable writes; most boxes contribute only
/// tasks. Writes are applied to the variables table by the driver before any
/// downstream box compiles.
#[derive(Debug, Default)]
pub struct BoxOutput {
    pub tasks: Vec<Task>,
    pub writes: Vec<Variable>,
}

impl BoxOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            writes: Vec::new(),
        }
    }

    pub fn writes(writes: Vec<Variable>) -> Self {
        Self {
            tasks: Vec::new(),
            writes,
        }
    }
}

/// Instance state common to every box: its display name and the port
/// instances bound at pipeline-authoring time.
#[derive(Debug, Clone)]
pub struct BoxBase {
    name: String,
    inputs: BTreeMap<String, Port>,
    outputs: BTreeMap<String, Port>,
}

impl BoxBase {
    /// Instantiate a box's port tables from its declared shape.
    pub fn new(name: impl Into<String>, inputs: &[PortDef], outputs: &[PortDef]) -> Self {
        Self {
            name: name.into(),
            inputs: inputs
                .iter()
                .map(|def| (def.name.to_string(), def.instantiate()))
                .collect(),
            outputs: outputs
                .iter()
                .map(|def| (def.name.to_string(), def.instantiate()))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn input_port(&self, key: &str) -> Option<&Port> {
        self.inputs.get(key)
    }

    pub fn output_port(&self, key: &str) -> Option<&Port> {
        self.outputs.get(key)
    }

    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.values()
    }

    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.outputs.values()
    }

    pub(crate) fn bind_port(
        ports: &mut BTreeMap<String, Port>,
        key: &str,
        variable: &str,
    ) -> Option<()> {
        ports.get_mut(key).map(|port| port.bind(variable))
    }

    pub(crate) fn inputs_mut(&mut self) -> &mut BTreeMap<String, Port> {
        &mut self.inputs
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut BTreeMap<String, Port> {
        &mut self.outputs
    }
}

/// A typed compilation unit of the closed catalog.
///
/// Boxes are stateless with respect to the pipeline graph: all cross-box
/// data flows through variables bound to ports. `compile` must not block or
/// perform I/O; it only assembles command lines and path strings.
pub trait PipelineBox: sealed::Sealed + std::fmt::Debug {
    /// Stable wire identifier of the box type (`"gcc"`, `"judge"`, ...).
    fn type_key(&self) -> &'static str;

    /// Human-readable name given to fresh instances.
    fn default_name(&self) -> &'static str;

    fn base(&self) -> &BoxBase;

    fn base_mut(&mut self) -> &mut BoxBase;

    fn compile(&self, params: &CompilationParams) -> Result<BoxOutput>;

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Bind an input port to a variable name. Unknown ports are a
    /// configuration error.
    fn bind_input(&mut self, key: &str, variable: &str) -> Result<()> {
        let box_type = self.type_key();
        BoxBase::bind_port(self.base_mut().inputs_mut(), key, variable)
            .ok_or_else(|| unknown_port(box_type, "input", key))
    }

    /// Bind an output port to a variable name. Unknown ports are a
    /// configuration error.
    fn bind_output(&mut self, key: &str, variable: &str) -> Result<()> {
        let box_type = self.type_key();
        BoxBase::bind_port(self.base_mut().outputs_mut(), key, variable)
            .ok_or_else(|| unknown_port(box_type, "output", key))
    }
}

fn unknown_port(box_type: &'static str, direction: &str, key: &str) -> Error {
    Error::BoxConfig {
        box_type,
        message: format!("no {} port named '{}'", direction, key),
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Port-resolution helpers shared by every box implementation.
///
/// These are the only way box code touches variables; they turn unbound
/// required ports and arity mismatches into configuration errors naming the
/// offending box type.
pub(crate) trait PortAccess: PipelineBox {
    fn config_error(&self, message: impl Into<String>) -> Error {
        Error::BoxConfig {
            box_type: self.type_key(),
            message: message.into(),
        }
    }

    /// Resolve a bound input port to its variable; unbound or unresolvable
    /// ports are a configuration error.
    fn input_variable<'a>(&self, params: &CompilationParams<'a>, key: &str) -> Result<&'a Variable> {
        let port = self
            .base()
            .input_port(key)
            .ok_or_else(|| unknown_port(self.type_key(), "input", key))?;
        let binding = port
            .binding()
            .ok_or_else(|| self.config_error(format!("input port '{}' is not bound", key)))?;
        params
            .variables()
            .resolve(binding)
            .map_err(|_| self.config_error(format!("variable '{}' is not in the table", binding)))
    }

    /// Resolve an optional input port; `None` when unbound. A bound port
    /// pointing at a missing variable is still an error.
    fn optional_input_variable<'a>(
        &self,
        params: &CompilationParams<'a>,
        key: &str,
    ) -> Result<Option<&'a Variable>> {
        let Some(port) = self.base().input_port(key) else {
            return Ok(None);
        };
        let Some(binding) = port.binding() else {
            return Ok(None);
        };
        params
            .variables()
            .resolve(binding)
            .map(Some)
            .map_err(|_| self.config_error(format!("variable '{}' is not in the table", binding)))
    }

    /// Whether an input port is bound to a non-empty variable.
    fn has_input_value(&self, params: &CompilationParams, key: &str) -> bool {
        matches!(
            self.optional_input_variable(params, key),
            Ok(Some(variable)) if !variable.is_empty()
        )
    }

    fn output_variable<'a>(
        &self,
        params: &CompilationParams<'a>,
        key: &str,
    ) -> Result<&'a Variable> {
        let port = self
            .base()
            .output_port(key)
            .ok_or_else(|| unknown_port(self.type_key(), "output", key))?;
        let binding = port
            .binding()
            .ok_or_else(|| self.config_error(format!("output port '{}' is not bound", key)))?;
        params
            .variables()
            .resolve(binding)
            .map_err(|_| self.config_error(format!("variable '{}' is not in the table", binding)))
    }

    fn optional_output_variable<'a>(
        &self,
        params: &CompilationParams<'a>,
        key: &str,
    ) -> Result<Option<&'a Variable>> {
        let Some(port) = self.base().output_port(key) else {
            return Ok(None);
        };
        let Some(binding) = port.binding() else {
            return Ok(None);
        };
        params
            .variables()
            .resolve(binding)
            .map(Some)
            .map_err(|_| self.config_error(format!("variable '{}' is not in the table", binding)))
    }

    /// Scalar helpers wrapping arity mismatches with the box type.
    fn scalar_of(&self, variable: &Variable) -> Result<String> {
        variable
            .as_scalar()
            .map(str::to_string)
            .map_err(|e| self.config_error(e.to_string()))
    }

    fn array_of(&self, variable: &Variable) -> Result<Vec<String>> {
        variable
            .as_array()
            .map(<[String]>::to_vec)
            .map_err(|e| self.config_error(e.to_string()))
    }
}

impl<T: PipelineBox + ?Sized> PortAccess for T {}

/// Internal worker command, owned by the current test when there is one.
pub(crate) fn bookkeeping_task(
    params: &CompilationParams,
    slug: &str,
    bin: &str,
    args: Vec<String>,
) -> Task {
    let mut task = Task::internal(
        params.next_task_id(slug),
        PRIORITY_DEFAULT,
        Command::new(bin, args),
    );
    if let Some(test_id) = params.test_id() {
        task = task.with_test_id(test_id.clone());
    }
    task
}

/// Bookkeeping task verifying that expected artifacts were produced.
///
/// Compilers surface failure only as a missing output file, so compiler
/// boxes append this check to fail the test deterministically.
pub(crate) fn exists_task(params: &CompilationParams, message: &str, paths: Vec<String>) -> Task {
    let mut args = Vec::with_capacity(paths.len() + 1);
    args.push(message.to_string());
    args.extend(paths);
    let mut task = Task::internal(
        params.next_task_id(commands::EXISTS),
        PRIORITY_INITIATION,
        Command::new(commands::EXISTS, args),
    )
    .with_fatal_failure(true);
    if let Some(test_id) = params.test_id() {
        task = task.with_test_id(test_id.clone()).with_type(TaskType::Initiation);
    }
    task
}

/// Declare a catalog box: instance struct, constructors, and the trait
/// plumbing. The box supplies its behavior as an inherent `compile_box`
/// method.
macro_rules! declare_box {
    (
        $(#[$meta:meta])*
        $name:ident {
            type_key: $key:literal,
            default_name: $default_name:literal,
            inputs: $inputs:expr,
            outputs: $outputs:expr,
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            base: $crate::base::BoxBase,
        }

        impl $name {
            pub const TYPE: &'static str = $key;

            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    base: $crate::base::BoxBase::new(name, $inputs, $outputs),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new($default_name)
            }
        }

        impl $crate::base::sealed::Sealed for $name {}

        impl $crate::base::PipelineBox for $name {
            fn type_key(&self) -> &'static str {
                $key
            }

            fn default_name(&self) -> &'static str {
                $default_name
            }

            fn base(&self) -> &$crate::base::BoxBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut $crate::base::BoxBase {
                &mut self.base
            }

            fn compile(
                &self,
                params: &$crate::params::CompilationParams,
            ) -> crucible_core::Result<$crate::base::BoxOutput> {
                self.compile_box(params)
            }
        }
    };
}

pub(crate) use declare_box;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DirectoryLayout;
    use crucible_core::variable::{VariableType, VariablesTable};
    use std::cell::Cell;

    const INPUTS: &[PortDef] = &[
        PortDef::required("source-files", VariableType::FileArray),
        PortDef::optional("args", VariableType::StringArray),
    ];
    const OUTPUTS: &[PortDef] = &[PortDef::required("binary-file", VariableType::File)];

    #[derive(Debug)]
    struct DummyBox {
        base: BoxBase,
    }

    impl sealed::Sealed for DummyBox {}

    impl PipelineBox for DummyBox {
        fn type_key(&self) -> &'static str {
            "dummy"
        }

        fn default_name(&self) -> &'static str {
            "Dummy"
        }

        fn base(&self) -> &BoxBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BoxBase {
            &mut self.base
        }

        fn compile(&self, _params: &CompilationParams) -> Result<BoxOutput> {
            Ok(BoxOutput::none())
        }
    }

    fn make_box() -> DummyBox {
        DummyBox {
            base: BoxBase::new("Dummy", INPUTS, OUTPUTS),
        }
    }

    #[test]
    fn test_binding_unknown_port_fails() {
        let mut bx = make_box();
        assert!(bx.bind_input("source-files", "sources").is_ok());
        let err = bx.bind_input("extra-files", "extras").unwrap_err();
        assert!(err.to_string().contains("dummy"));
    }

    #[test]
    fn test_unbound_required_port_is_config_error() {
        let bx = make_box();
        let variables = VariablesTable::new();
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = CompilationParams::new(&variables, &layout, &counter);

        let err = bx.input_variable(&params, "source-files").unwrap_err();
        assert!(matches!(err, Error::BoxConfig { box_type: "dummy", .. }));
    }

    #[test]
    fn test_optional_unbound_port_is_tolerated() {
        let bx = make_box();
        let variables = VariablesTable::new();
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = CompilationParams::new(&variables, &layout, &counter);

        assert!(bx.optional_input_variable(&params, "args").unwrap().is_none());
        assert!(!bx.has_input_value(&params, "args"));
    }

    #[test]
    fn test_exists_task_shape() {
        let variables = VariablesTable::new();
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = CompilationParams::new(&variables, &layout, &counter).for_test("A");

        let task = exists_task(&params, "Compilation failed.", vec!["${SOURCE_DIR}/A/a.out".into()]);
        assert!(task.is_internal());
        assert!(task.fatal_failure);
        assert_eq!(task.cmd.bin, "exists");
        assert_eq!(task.cmd.args[0], "Compilation failed.");
        assert_eq!(task.cmd.args[1], "${SOURCE_DIR}/A/a.out");
        assert!(task.is_initiation());
    }
}

//! The authoring-time escape hatch.

use crate::base::{BoxBase, BoxOutput, PipelineBox, sealed};
use crate::params::CompilationParams;
use crucible_core::Result;
use crucible_core::port::Port;

/// A box with no default ports and a mutable port set, used to splice
/// ad-hoc pipeline segments or bridge two pipelines' variable names without
/// emitting any work of its own.
#[derive(Debug, Clone)]
pub struct CustomBox {
    base: BoxBase,
}

impl CustomBox {
    pub const TYPE: &'static str = "custom";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: BoxBase::new(name, &[], &[]),
        }
    }

    pub fn add_input_port(&mut self, port: Port) {
        self.base
            .inputs_mut()
            .insert(port.name().to_string(), port);
    }

    pub fn add_output_port(&mut self, port: Port) {
        self.base
            .outputs_mut()
            .insert(port.name().to_string(), port);
    }

    pub fn clear_ports(&mut self) {
        self.base.inputs_mut().clear();
        self.base.outputs_mut().clear();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.base.set_name(name);
    }
}

impl Default for CustomBox {
    fn default() -> Self {
        Self::new("Custom")
    }
}

impl sealed::Sealed for CustomBox {}

impl PipelineBox for CustomBox {
    fn type_key(&self) -> &'static str {
        Self::TYPE
    }

    fn default_name(&self) -> &'static str {
        "Custom"
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

//! Named, typed slots through which boxes touch variables.
//!
//! Each box type declares its port shape as a compile-time constant table of
//! [`PortDef`]s; at pipeline-authoring time every port is instantiated as a
//! [`Port`] bound to a concrete variable name (or left unbound). Whether an
//! unbound port is tolerated is part of the declared shape, never inferred
//! at the call site.

use crate::variable::VariableType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declared shape of one port: part of a box type's static contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortDef {
    pub name: &'static str,
    pub vtype: VariableType,
    pub required: bool,
}

impl PortDef {
    pub const fn required(name: &'static str, vtype: VariableType) -> Self {
        Self {
            name,
            vtype,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, vtype: VariableType) -> Self {
        Self {
            name,
            vtype,
            required: false,
        }
    }

    /// Instantiate the port, still unbound.
    pub fn instantiate(&self) -> Port {
        Port {
            name: self.name.to_string(),
            vtype: self.vtype,
            binding: None,
            required: self.required,
        }
    }
}

/// A port instance on an authored box, optionally bound to a variable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Port {
    name: String,
    #[serde(rename = "type")]
    vtype: VariableType,
    /// Name of the bound variable; `None` means unbound/local.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    binding: Option<String>,
    #[serde(default)]
    required: bool,
}

impl Port {
    pub fn new(name: impl Into<String>, vtype: VariableType, required: bool) -> Self {
        Self {
            name: name.into(),
            vtype,
            binding: None,
            required,
        }
    }

    pub fn bound_to(mut self, variable: impl Into<String>) -> Self {
        self.binding = Some(variable.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> VariableType {
        self.vtype
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn binding(&self) -> Option<&str> {
        match self.binding.as_deref() {
            // An empty binding string means unbound, same as absent
            Some("") | None => None,
            other => other,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.binding().is_some()
    }

    pub fn bind(&mut self, variable: impl Into<String>) {
        self.binding = Some(variable.into());
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }
}

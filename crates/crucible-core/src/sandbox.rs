//! Sandbox configuration attached to external tasks.

use crate::ids::HwGroupId;
use crate::limits::Limits;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sandbox identity, stdio wiring, and per-hardware-group limits.
///
/// Limits are kept as an ordered list (one entry per hardware group) so a
/// parsed config serializes back in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SandboxConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Copy of stdout kept next to the redirected stream for diagnostics.
    #[serde(
        rename = "carboncopy-stdout",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub carboncopy_stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chdir: Option<String>,
    /// Capture the task output into the result file.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub output: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<Limits>,
}

impl SandboxConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stdin: None,
            stdout: None,
            stderr: None,
            carboncopy_stdout: None,
            chdir: None,
            output: false,
            limits: Vec::new(),
        }
    }

    pub fn limits_for(&self, hw_group: &HwGroupId) -> Option<&Limits> {
        self.limits.iter().find(|l| &l.hw_group_id == hw_group)
    }

    /// Insert or replace the limits entry for its hardware group, keeping
    /// the position of a replaced entry.
    pub fn set_limits(&mut self, limits: Limits) {
        match self
            .limits
            .iter_mut()
            .find(|l| l.hw_group_id == limits.hw_group_id)
        {
            Some(existing) => *existing = limits,
            None => self.limits.push(limits),
        }
    }

    pub fn has_limits_for(&self, hw_group: &HwGroupId) -> bool {
        self.limits_for(hw_group).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_limits_replaces_in_place() {
        let mut sandbox = SandboxConfig::new("isolate");
        sandbox.set_limits(Limits::new("group1"));
        sandbox.set_limits(Limits::new("group2"));

        let mut replacement = Limits::new("group1");
        replacement.time = Some(3.0);
        sandbox.set_limits(replacement);

        assert_eq!(sandbox.limits.len(), 2);
        assert_eq!(sandbox.limits[0].hw_group_id, HwGroupId::new("group1"));
        assert_eq!(sandbox.limits[0].time, Some(3.0));
    }

    #[test]
    fn test_default_fields_are_omitted() {
        let sandbox = SandboxConfig::new("isolate");
        let yaml = serde_yaml::to_string(&sandbox).unwrap();
        assert_eq!(yaml.trim(), "name: isolate");
    }
}

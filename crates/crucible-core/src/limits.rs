//! Per-hardware-group resource envelopes.

use crate::ids::HwGroupId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel time figure (seconds) for effectively unrestricted limits.
pub const INFINITE_TIME: f64 = 1_000_000.0;
/// Sentinel memory figure (KiB) for effectively unrestricted limits.
pub const INFINITE_MEMORY: u64 = 1_024 * 1_024 * 1_024;

/// Resource envelope for one hardware group.
///
/// Every field other than the group id is optional; an entry with no fields
/// set is the serialized form of "limits intentionally removed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Limits {
    #[serde(rename = "hw-group-id")]
    pub hw_group_id: HwGroupId,
    /// CPU time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    /// Wall-clock time in seconds.
    #[serde(rename = "wall-time", default, skip_serializing_if = "Option::is_none")]
    pub wall_time: Option<f64>,
    /// Grace period added after the time limit before the process is killed.
    #[serde(rename = "extra-time", default, skip_serializing_if = "Option::is_none")]
    pub extra_time: Option<f64>,
    /// Stack size in KiB.
    #[serde(rename = "stack-size", default, skip_serializing_if = "Option::is_none")]
    pub stack_size: Option<u64>,
    /// Memory in KiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    /// Maximum number of parallel processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<u64>,
    /// Disk quota in KiB.
    #[serde(rename = "disk-size", default, skip_serializing_if = "Option::is_none")]
    pub disk_size: Option<u64>,
    /// Maximum number of open files on disk.
    #[serde(rename = "disk-files", default, skip_serializing_if = "Option::is_none")]
    pub disk_files: Option<u64>,
    #[serde(
        rename = "environ-variable",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub environ_variable: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chdir: Option<String>,
    #[serde(
        rename = "bound-directories",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub bound_directories: Vec<BoundDirectory>,
}

impl Limits {
    /// Empty envelope for a hardware group.
    pub fn new(hw_group_id: impl Into<HwGroupId>) -> Self {
        Self {
            hw_group_id: hw_group_id.into(),
            time: None,
            wall_time: None,
            extra_time: None,
            stack_size: None,
            memory: None,
            parallel: None,
            disk_size: None,
            disk_files: None,
            environ_variable: BTreeMap::new(),
            chdir: None,
            bound_directories: Vec::new(),
        }
    }

    /// Effectively unrestricted envelope (sentinel-large time and memory).
    pub fn infinite(hw_group_id: impl Into<HwGroupId>) -> Self {
        let mut limits = Self::new(hw_group_id);
        limits.time = Some(INFINITE_TIME);
        limits.wall_time = Some(INFINITE_TIME);
        limits.memory = Some(INFINITE_MEMORY);
        limits
    }

    /// Envelope signalling "limits intentionally removed": serializes to
    /// only the hardware-group id.
    pub fn undefined(hw_group_id: impl Into<HwGroupId>) -> Self {
        Self::new(hw_group_id)
    }

    /// True when no field besides the group id is set.
    pub fn is_undefined(&self) -> bool {
        self.time.is_none()
            && self.wall_time.is_none()
            && self.extra_time.is_none()
            && self.stack_size.is_none()
            && self.memory.is_none()
            && self.parallel.is_none()
            && self.disk_size.is_none()
            && self.disk_files.is_none()
            && self.environ_variable.is_empty()
            && self.chdir.is_none()
            && self.bound_directories.is_empty()
    }

    /// Field-by-field merge; set fields of `overrides` win, unset fields
    /// keep the value from `self`. The group id of `self` is kept.
    pub fn merged_with(&self, overrides: &Limits) -> Limits {
        Limits {
            hw_group_id: self.hw_group_id.clone(),
            time: overrides.time.or(self.time),
            wall_time: overrides.wall_time.or(self.wall_time),
            extra_time: overrides.extra_time.or(self.extra_time),
            stack_size: overrides.stack_size.or(self.stack_size),
            memory: overrides.memory.or(self.memory),
            parallel: overrides.parallel.or(self.parallel),
            disk_size: overrides.disk_size.or(self.disk_size),
            disk_files: overrides.disk_files.or(self.disk_files),
            environ_variable: if overrides.environ_variable.is_empty() {
                self.environ_variable.clone()
            } else {
                overrides.environ_variable.clone()
            },
            chdir: overrides.chdir.clone().or_else(|| self.chdir.clone()),
            bound_directories: if overrides.bound_directories.is_empty() {
                self.bound_directories.clone()
            } else {
                overrides.bound_directories.clone()
            },
        }
    }
}

/// Directory mapped into the sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BoundDirectory {
    pub src: String,
    pub dst: String,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_undefined_serializes_to_group_only() {
        let limits = Limits::undefined("group-A");
        let yaml = serde_yaml::to_string(&limits).unwrap();
        assert_eq!(yaml.trim(), "hw-group-id: group-A");
    }

    #[test]
    fn test_infinite_is_not_undefined() {
        assert!(Limits::undefined("g").is_undefined());
        assert!(!Limits::infinite("g").is_undefined());
    }

    #[test]
    fn test_merge_overrides_set_fields_only() {
        let mut base = Limits::new("group1");
        base.time = Some(2.0);
        base.memory = Some(65536);
        base.chdir = Some("/box".to_string());

        let mut over = Limits::new("group1");
        over.time = Some(5.0);
        over.parallel = Some(4);

        let merged = base.merged_with(&over);
        assert_eq!(merged.time, Some(5.0));
        assert_eq!(merged.memory, Some(65536));
        assert_eq!(merged.parallel, Some(4));
        assert_eq!(merged.chdir.as_deref(), Some("/box"));
    }

    #[test]
    fn test_limits_yaml_roundtrip() {
        let mut limits = Limits::new("group2");
        limits.time = Some(1.5);
        limits.wall_time = Some(3.0);
        limits.disk_files = Some(16);
        limits.environ_variable.insert("PATH".into(), "/usr/bin".into());
        limits.bound_directories.push(BoundDirectory {
            src: "/src".into(),
            dst: "/dst".into(),
            mode: "RW".into(),
        });

        let yaml = serde_yaml::to_string(&limits).unwrap();
        let parsed: Limits = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, limits);
    }
}

//! Typed pipeline variables.
//!
//! Variables are the only channel through which boxes exchange data. Each
//! variable is a named scalar or array of plain strings (logical file names,
//! flags, judge arguments) tagged with a [`VariableType`]. The same variable
//! can be addressed in two contexts: the physical location used while the
//! job is being prepared (source dir) and the logical location seen by the
//! sandboxed process (eval dir). Addressing only prepends a root, so one
//! compiled pipeline can be deployed under different physical layouts.

use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Path separator used when prefixing variable values with directory roots.
pub const PATH_DELIM: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum VariableType {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file[]")]
    FileArray,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringArray,
    #[serde(rename = "remote-file")]
    RemoteFile,
    #[serde(rename = "remote-file[]")]
    RemoteFileArray,
    #[serde(rename = "undefined")]
    Undefined,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::File => "file",
            VariableType::FileArray => "file[]",
            VariableType::String => "string",
            VariableType::StringArray => "string[]",
            VariableType::RemoteFile => "remote-file",
            VariableType::RemoteFileArray => "remote-file[]",
            VariableType::Undefined => "undefined",
        }
    }

    /// Whether values of this type are ordered sequences.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            VariableType::FileArray | VariableType::StringArray | VariableType::RemoteFileArray
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            VariableType::RemoteFile | VariableType::RemoteFileArray
        )
    }

    pub fn is_file(&self) -> bool {
        matches!(self, VariableType::File | VariableType::FileArray)
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VariableType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "file" => Ok(VariableType::File),
            "file[]" => Ok(VariableType::FileArray),
            "string" => Ok(VariableType::String),
            "string[]" => Ok(VariableType::StringArray),
            "remote-file" => Ok(VariableType::RemoteFile),
            "remote-file[]" => Ok(VariableType::RemoteFileArray),
            "undefined" => Ok(VariableType::Undefined),
            other => Err(Error::UnknownVariableType(other.to_string())),
        }
    }
}

/// A scalar or an ordered sequence of bare string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(String),
    Array(Vec<String>),
}

impl VariableValue {
    pub fn is_array(&self) -> bool {
        matches!(self, VariableValue::Array(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            VariableValue::Scalar(s) => s.is_empty(),
            VariableValue::Array(items) => items.is_empty(),
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Scalar(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Scalar(value)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        VariableValue::Array(values)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        VariableValue::Array(values.iter().map(|s| s.to_string()).collect())
    }
}

/// A named, typed value flowing between boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Variable {
    name: String,
    #[serde(rename = "type")]
    vtype: VariableType,
    value: VariableValue,
    /// Per-test subdirectory assigned at pipeline assembly; inserted between
    /// the addressing root and the bare value by `dir_prefixed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    directory: Option<String>,
}

impl Variable {
    /// Create a variable, enforcing that the value arity matches the type.
    pub fn new(
        name: impl Into<String>,
        vtype: VariableType,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        check_arity(&name, vtype, &value)?;
        Ok(Self {
            name,
            vtype,
            value,
            directory: None,
        })
    }

    /// An empty variable of the given type, used for tolerated unbound ports.
    pub fn empty(name: impl Into<String>, vtype: VariableType) -> Self {
        let value = if vtype.is_array() {
            VariableValue::Array(vec![])
        } else {
            VariableValue::Scalar(String::new())
        };
        Self {
            name: name.into(),
            vtype,
            value,
            directory: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_type(&self) -> VariableType {
        self.vtype
    }

    pub fn value(&self) -> &VariableValue {
        &self.value
    }

    pub fn is_array_value(&self) -> bool {
        self.value.is_array()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    pub fn set_directory(&mut self, directory: impl Into<String>) {
        self.directory = Some(directory.into());
    }

    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Replace the value; the arity of the new value must still match.
    pub fn set_value(&mut self, value: impl Into<VariableValue>) -> Result<()> {
        let value = value.into();
        check_arity(&self.name, self.vtype, &value)?;
        self.value = value;
        Ok(())
    }

    /// The scalar value. Arity mismatch is a configuration error.
    pub fn as_scalar(&self) -> Result<&str> {
        match &self.value {
            VariableValue::Scalar(s) => Ok(s),
            VariableValue::Array(_) => Err(Error::VariableArity {
                name: self.name.clone(),
                expected: "a scalar",
                actual: "an array",
            }),
        }
    }

    /// The array value. Arity mismatch is a configuration error.
    pub fn as_array(&self) -> Result<&[String]> {
        match &self.value {
            VariableValue::Array(items) => Ok(items),
            VariableValue::Scalar(_) => Err(Error::VariableArity {
                name: self.name.clone(),
                expected: "an array",
                actual: "a scalar",
            }),
        }
    }

    /// Scalar value with the addressing root prepended.
    pub fn prefixed(&self, root: &str) -> Result<String> {
        Ok(join_path(&[root, self.as_scalar()?]))
    }

    /// Array values with the addressing root prepended to each element.
    pub fn prefixed_array(&self, root: &str) -> Result<Vec<String>> {
        Ok(self
            .as_array()?
            .iter()
            .map(|v| join_path(&[root, v]))
            .collect())
    }

    /// Scalar value with the root and the per-test directory prepended.
    pub fn dir_prefixed(&self, root: &str) -> Result<String> {
        let dir = self.directory.as_deref().unwrap_or("");
        Ok(join_path(&[root, dir, self.as_scalar()?]))
    }

    /// Array values with the root and the per-test directory prepended.
    pub fn dir_prefixed_array(&self, root: &str) -> Result<Vec<String>> {
        let dir = self.directory.as_deref().unwrap_or("");
        Ok(self
            .as_array()?
            .iter()
            .map(|v| join_path(&[root, dir, v]))
            .collect())
    }
}

fn check_arity(name: &str, vtype: VariableType, value: &VariableValue) -> Result<()> {
    if vtype == VariableType::Undefined {
        return Ok(());
    }
    if vtype.is_array() != value.is_array() {
        return Err(Error::VariableArity {
            name: name.to_string(),
            expected: if vtype.is_array() {
                "an array"
            } else {
                "a scalar"
            },
            actual: if value.is_array() {
                "an array"
            } else {
                "a scalar"
            },
        });
    }
    Ok(())
}

/// Join path segments with a single delimiter, skipping empty segments.
fn join_path(segments: &[&str]) -> String {
    let mut out = String::new();
    for segment in segments {
        let trimmed = segment.trim_matches(PATH_DELIM);
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(PATH_DELIM);
        }
        out.push_str(trimmed);
    }
    // An absolute or token root keeps its leading form
    if let Some(first) = segments.first()
        && first.starts_with(PATH_DELIM)
    {
        out.insert(0, PATH_DELIM);
    }
    out
}

/// Name-keyed table of resolved variables for one pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VariablesTable {
    variables: HashMap<String, Variable>,
}

impl VariablesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, variable: Variable) {
        self.variables.insert(variable.name().to_string(), variable);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    /// Lookup that treats a missing entry as a configuration error.
    pub fn resolve(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| Error::UnboundVariable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Variable)> {
        self.variables.iter_mut()
    }
}

impl FromIterator<Variable> for VariablesTable {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        let mut table = Self::new();
        for variable in iter {
            table.insert(variable);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_enforced_at_construction() {
        let err = Variable::new("sources", VariableType::FileArray, "main.c").unwrap_err();
        assert!(matches!(err, Error::VariableArity { .. }));

        let ok = Variable::new("sources", VariableType::FileArray, vec!["main.c"]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_scalar_accessor_on_array_fails() {
        let var = Variable::new("sources", VariableType::FileArray, vec!["a.c", "b.c"]).unwrap();
        assert!(var.as_scalar().is_err());
        assert_eq!(var.as_array().unwrap(), ["a.c", "b.c"]);
    }

    #[test]
    fn test_prefixed_addressing() {
        let var = Variable::new("binary", VariableType::File, "a.out").unwrap();
        assert_eq!(var.prefixed("${EVAL_DIR}").unwrap(), "${EVAL_DIR}/a.out");

        let dir_var = var.with_directory("A");
        assert_eq!(
            dir_var.dir_prefixed("${EVAL_DIR}").unwrap(),
            "${EVAL_DIR}/A/a.out"
        );
    }

    #[test]
    fn test_prefixed_keeps_absolute_root() {
        let var = Variable::new("input", VariableType::File, "in.txt").unwrap();
        assert_eq!(var.prefixed("/var/job/").unwrap(), "/var/job/in.txt");
    }

    #[test]
    fn test_variable_type_parse() {
        assert_eq!(
            "remote-file[]".parse::<VariableType>().unwrap(),
            VariableType::RemoteFileArray
        );
        assert!("folder".parse::<VariableType>().is_err());
    }

    #[test]
    fn test_table_resolve_missing_is_error() {
        let table = VariablesTable::new();
        assert!(matches!(
            table.resolve("ghost"),
            Err(Error::UnboundVariable(_))
        ));
    }
}

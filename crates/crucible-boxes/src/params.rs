//! Cross-cutting context threaded into every box's compile call.

use crucible_core::ids::{TaskId, TestId};
use crucible_core::variable::{Variable, VariablesTable};
use std::cell::Cell;

/// Directory roles for the dual addressing contexts.
///
/// `source_root` is the physical location of job files while the job is
/// being prepared; `eval_root` is the logical location the sandboxed process
/// sees. Both are usually worker-substituted tokens rather than literal
/// paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    pub source_root: String,
    pub eval_root: String,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self {
            source_root: "${SOURCE_DIR}".to_string(),
            eval_root: "${EVAL_DIR}".to_string(),
        }
    }
}

/// Context handed to [`compile`](crate::base::PipelineBox::compile).
///
/// Holds the resolved variables table, the directory layout, the test the
/// current box belongs to, and a deterministic task-id allocator. Allocation
/// uses a shared counter behind a `Cell` so `compile` stays a pure,
/// replay-stable transformation over `&self`.
#[derive(Debug)]
pub struct CompilationParams<'a> {
    variables: &'a VariablesTable,
    layout: &'a DirectoryLayout,
    test_id: Option<TestId>,
    counter: &'a Cell<u32>,
}

impl<'a> CompilationParams<'a> {
    pub fn new(
        variables: &'a VariablesTable,
        layout: &'a DirectoryLayout,
        counter: &'a Cell<u32>,
    ) -> Self {
        Self {
            variables,
            layout,
            test_id: None,
            counter,
        }
    }

    /// Same context scoped to one test; task ids get the test prefix and
    /// emitted tasks belong to the test.
    pub fn for_test(mut self, test_id: impl Into<TestId>) -> Self {
        self.test_id = Some(test_id.into());
        self
    }

    pub fn variables(&self) -> &'a VariablesTable {
        self.variables
    }

    pub fn test_id(&self) -> Option<&TestId> {
        self.test_id.as_ref()
    }

    pub fn source_root(&self) -> &str {
        &self.layout.source_root
    }

    pub fn eval_root(&self) -> &str {
        &self.layout.eval_root
    }

    /// Source-context directory of the current test (the root itself
    /// outside a test).
    pub fn source_dir(&self) -> String {
        join_dir(self.source_root(), self.test_id.as_ref())
    }

    /// Eval-context directory of the current test.
    pub fn eval_dir(&self) -> String {
        join_dir(self.eval_root(), self.test_id.as_ref())
    }

    /// Variable value addressed in the source (preparation) context.
    pub fn source_path(&self, variable: &Variable) -> crucible_core::Result<String> {
        variable.dir_prefixed(self.source_root())
    }

    pub fn source_paths(&self, variable: &Variable) -> crucible_core::Result<Vec<String>> {
        variable.dir_prefixed_array(self.source_root())
    }

    /// Variable value addressed as the sandboxed process sees it.
    pub fn eval_path(&self, variable: &Variable) -> crucible_core::Result<String> {
        variable.dir_prefixed(self.eval_root())
    }

    pub fn eval_paths(&self, variable: &Variable) -> crucible_core::Result<Vec<String>> {
        variable.dir_prefixed_array(self.eval_root())
    }

    /// Allocate the next task id: `<test>.<slug>.<n>` within a test,
    /// `<slug>.<n>` otherwise.
    pub fn next_task_id(&self, slug: &str) -> TaskId {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        let slug = sanitize_slug(slug);
        match &self.test_id {
            Some(test) => TaskId::new(format!("{}.{}.{}", test, slug, n)),
            None => TaskId::new(format!("{}.{}", slug, n)),
        }
    }
}

fn join_dir(root: &str, test_id: Option<&TestId>) -> String {
    match test_id {
        Some(test) => format!("{}/{}", root.trim_end_matches('/'), test),
        None => root.to_string(),
    }
}

/// Lowercase the box name and collapse anything outside `[a-z0-9_-]`.
fn sanitize_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

//! Structural and bookkeeping utility boxes.
//!
//! The pure boxes emit no tasks at all: they only rewrite their output
//! variables, which the driver folds back into the table before downstream
//! boxes compile. The bookkeeping boxes emit internal worker commands, and
//! only when the source and destination actually differ.

use crate::base::{BoxOutput, PipelineBox, PortAccess, bookkeeping_task, commands, declare_box};
use crate::params::CompilationParams;
use crucible_core::Result;
use crucible_core::port::PortDef;
use crucible_core::variable::{Variable, VariableType};

/// Rewritten output variable: same binding name and declared type, new value.
fn rewrite(
    bx: &(impl PipelineBox + ?Sized),
    output: &Variable,
    value: impl Into<crucible_core::variable::VariableValue>,
) -> Result<Variable> {
    let mut variable = output.clone();
    variable
        .set_value(value)
        .map_err(|e| bx.config_error(e.to_string()))?;
    Ok(variable)
}

declare_box! {
    /// Exposes a file's logical name as a string variable.
    FileNameBox {
        type_key: "file-name",
        default_name: "File Name",
        inputs: &[PortDef::required("file", VariableType::File)],
        outputs: &[PortDef::required("name", VariableType::String)],
    }
}

impl FileNameBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let file = self.input_variable(params, "file")?;
        let output = self.output_variable(params, "name")?;
        let write = rewrite(self, output, self.scalar_of(file)?)?;
        Ok(BoxOutput::writes(vec![write]))
    }
}

declare_box! {
    /// Wraps a single file in a one-element array.
    FileToArrayBox {
        type_key: "file-to-array",
        default_name: "File to Array",
        inputs: &[PortDef::required("file", VariableType::File)],
        outputs: &[PortDef::required("files", VariableType::FileArray)],
    }
}

impl FileToArrayBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let file = self.input_variable(params, "file")?;
        let output = self.output_variable(params, "files")?;
        let write = rewrite(self, output, vec![self.scalar_of(file)?])?;
        Ok(BoxOutput::writes(vec![write]))
    }
}

declare_box! {
    /// Wraps a single string in a one-element array.
    StringToArrayBox {
        type_key: "string-to-array",
        default_name: "String to Array",
        inputs: &[PortDef::required("string", VariableType::String)],
        outputs: &[PortDef::required("strings", VariableType::StringArray)],
    }
}

impl StringToArrayBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let string = self.input_variable(params, "string")?;
        let output = self.output_variable(params, "strings")?;
        let write = rewrite(self, output, vec![self.scalar_of(string)?])?;
        Ok(BoxOutput::writes(vec![write]))
    }
}

declare_box! {
    /// Concatenates two files into a file array.
    MergeTwoFilesBox {
        type_key: "merge-two-files",
        default_name: "Merge Two Files",
        inputs: &[
            PortDef::required("file1", VariableType::File),
            PortDef::required("file2", VariableType::File),
        ],
        outputs: &[PortDef::required("files", VariableType::FileArray)],
    }
}

impl MergeTwoFilesBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let first = self.input_variable(params, "file1")?;
        let second = self.input_variable(params, "file2")?;
        let output = self.output_variable(params, "files")?;
        let write = rewrite(
            self,
            output,
            vec![self.scalar_of(first)?, self.scalar_of(second)?],
        )?;
        Ok(BoxOutput::writes(vec![write]))
    }
}

declare_box! {
    /// Prepends a file to a file array.
    MergeFileAndFilesBox {
        type_key: "merge-file-and-files",
        default_name: "Merge File and Files",
        inputs: &[
            PortDef::required("file", VariableType::File),
            PortDef::required("files", VariableType::FileArray),
        ],
        outputs: &[PortDef::required("files", VariableType::FileArray)],
    }
}

impl MergeFileAndFilesBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let file = self.input_variable(params, "file")?;
        let rest = self.input_variable(params, "files")?;
        let output = self.output_variable(params, "files")?;
        let mut merged = vec![self.scalar_of(file)?];
        merged.extend(self.array_of(rest)?);
        let write = rewrite(self, output, merged)?;
        Ok(BoxOutput::writes(vec![write]))
    }
}

declare_box! {
    /// Concatenates two string arrays.
    MergeStringsBox {
        type_key: "merge-strings",
        default_name: "Merge Strings",
        inputs: &[
            PortDef::required("strings1", VariableType::StringArray),
            PortDef::required("strings2", VariableType::StringArray),
        ],
        outputs: &[PortDef::required("strings", VariableType::StringArray)],
    }
}

impl MergeStringsBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        merge_arrays(self, params, "strings1", "strings2", "strings")
    }
}

declare_box! {
    /// Concatenates two file arrays.
    MergeFilesBox {
        type_key: "merge-files",
        default_name: "Merge Files",
        inputs: &[
            PortDef::required("files1", VariableType::FileArray),
            PortDef::required("files2", VariableType::FileArray),
        ],
        outputs: &[PortDef::required("files", VariableType::FileArray)],
    }
}

impl MergeFilesBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        merge_arrays(self, params, "files1", "files2", "files")
    }
}

fn merge_arrays(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    first_key: &str,
    second_key: &str,
    output_key: &str,
) -> Result<BoxOutput> {
    let first = bx.input_variable(params, first_key)?;
    let second = bx.input_variable(params, second_key)?;
    let output = bx.output_variable(params, output_key)?;
    let mut merged = bx.array_of(first)?;
    merged.extend(bx.array_of(second)?);
    let write = rewrite(bx, output, merged)?;
    Ok(BoxOutput::writes(vec![write]))
}

declare_box! {
    /// Renames a file inside the job directory.
    RenameBox {
        type_key: "rename",
        default_name: "Rename",
        inputs: &[PortDef::required("source", VariableType::File)],
        outputs: &[PortDef::required("destination", VariableType::File)],
    }
}

impl RenameBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        move_like(self, params, commands::RENAME)
    }
}

declare_box! {
    /// Copies a file inside the job directory.
    CopyBox {
        type_key: "copy",
        default_name: "Copy",
        inputs: &[PortDef::required("source", VariableType::File)],
        outputs: &[PortDef::required("destination", VariableType::File)],
    }
}

impl CopyBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        move_like(self, params, commands::COPY)
    }
}

/// Shared rename/copy shape: equal logical names compile to nothing.
fn move_like(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    bin: &str,
) -> Result<BoxOutput> {
    let source = bx.input_variable(params, "source")?;
    let destination = bx.output_variable(params, "destination")?;
    if bx.scalar_of(source)? == bx.scalar_of(destination)? {
        return Ok(BoxOutput::none());
    }
    let task = bookkeeping_task(
        params,
        bx.name(),
        bin,
        vec![params.source_path(source)?, params.source_path(destination)?],
    );
    Ok(BoxOutput::tasks(vec![task]))
}

declare_box! {
    /// Unpacks an archive into the test directory.
    ExtractBox {
        type_key: "extract",
        default_name: "Extract",
        inputs: &[PortDef::required("archive", VariableType::File)],
        outputs: &[PortDef::required("files", VariableType::FileArray)],
    }
}

impl ExtractBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let archive = self.input_variable(params, "archive")?;
        let task = bookkeeping_task(
            params,
            self.name(),
            commands::EXTRACT,
            vec![params.source_path(archive)?, params.source_dir()],
        );
        Ok(BoxOutput::tasks(vec![task]))
    }
}

declare_box! {
    /// Creates a directory inside the job directory.
    MkdirBox {
        type_key: "mkdir",
        default_name: "Mkdir",
        inputs: &[PortDef::required("path", VariableType::String)],
        outputs: &[],
    }
}

impl MkdirBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let path = self.input_variable(params, "path")?;
        let task = bookkeeping_task(
            params,
            self.name(),
            commands::MKDIR,
            vec![format!(
                "{}/{}",
                params.source_root().trim_end_matches('/'),
                self.scalar_of(path)?
            )],
        );
        Ok(BoxOutput::tasks(vec![task]))
    }
}

declare_box! {
    /// Bridges a variable of one pipeline to a differently named variable
    /// of the next.
    JoinPipelinesBox {
        type_key: "join-pipelines",
        default_name: "Join Pipelines",
        inputs: &[PortDef::required("source", VariableType::File)],
        outputs: &[PortDef::required("destination", VariableType::File)],
    }
}

impl JoinPipelinesBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        move_like(self, params, commands::COPY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DirectoryLayout;
    use crucible_core::variable::VariablesTable;
    use std::cell::Cell;

    fn compile_plain<B: PipelineBox>(bx: &B, table: &VariablesTable) -> BoxOutput {
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = CompilationParams::new(table, &layout, &counter);
        bx.compile(&params).unwrap()
    }

    #[test]
    fn test_file_to_array_writes_single_element() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("binary", VariableType::File, "a.out").unwrap());
        table.insert(Variable::new("binaries", VariableType::FileArray, Vec::<String>::new()).unwrap());

        let mut bx = FileToArrayBox::default();
        bx.bind_input("file", "binary").unwrap();
        bx.bind_output("files", "binaries").unwrap();

        let output = compile_plain(&bx, &table);
        assert!(output.tasks.is_empty());
        assert_eq!(output.writes.len(), 1);
        assert_eq!(output.writes[0].name(), "binaries");
        assert_eq!(output.writes[0].as_array().unwrap(), ["a.out"]);
    }

    #[test]
    fn test_merge_files_concatenates_in_order() {
        let mut table = VariablesTable::new();
        table.insert(
            Variable::new("first", VariableType::FileArray, vec!["a.c", "b.c"]).unwrap(),
        );
        table.insert(Variable::new("second", VariableType::FileArray, vec!["c.c"]).unwrap());
        table.insert(
            Variable::new("all", VariableType::FileArray, Vec::<String>::new()).unwrap(),
        );

        let mut bx = MergeFilesBox::default();
        bx.bind_input("files1", "first").unwrap();
        bx.bind_input("files2", "second").unwrap();
        bx.bind_output("files", "all").unwrap();

        let output = compile_plain(&bx, &table);
        assert_eq!(output.writes[0].as_array().unwrap(), ["a.c", "b.c", "c.c"]);
    }

    #[test]
    fn test_rename_with_equal_names_is_noop() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("in", VariableType::File, "same.txt").unwrap());
        table.insert(Variable::new("out", VariableType::File, "same.txt").unwrap());

        let mut bx = RenameBox::default();
        bx.bind_input("source", "in").unwrap();
        bx.bind_output("destination", "out").unwrap();

        let output = compile_plain(&bx, &table);
        assert!(output.tasks.is_empty());
        assert!(output.writes.is_empty());
    }

    #[test]
    fn test_rename_with_distinct_names_emits_task() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("in", VariableType::File, "old.txt").unwrap());
        table.insert(Variable::new("out", VariableType::File, "new.txt").unwrap());

        let mut bx = RenameBox::default();
        bx.bind_input("source", "in").unwrap();
        bx.bind_output("destination", "out").unwrap();

        let output = compile_plain(&bx, &table);
        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].cmd.bin, "rename");
        assert_eq!(
            output.tasks[0].cmd.args,
            vec!["${SOURCE_DIR}/old.txt", "${SOURCE_DIR}/new.txt"]
        );
    }

    #[test]
    fn test_join_pipelines_with_equal_names_is_noop() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("left", VariableType::File, "bridge.txt").unwrap());
        table.insert(Variable::new("right", VariableType::File, "bridge.txt").unwrap());

        let mut bx = JoinPipelinesBox::default();
        bx.bind_input("source", "left").unwrap();
        bx.bind_output("destination", "right").unwrap();

        let output = compile_plain(&bx, &table);
        assert!(output.tasks.is_empty());
    }

    #[test]
    fn test_mkdir_always_emits() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("dir", VariableType::String, "A").unwrap());

        let mut bx = MkdirBox::default();
        bx.bind_input("path", "dir").unwrap();

        let output = compile_plain(&bx, &table);
        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].cmd.bin, "mkdir");
        assert_eq!(output.tasks[0].cmd.args, vec!["${SOURCE_DIR}/A"]);
    }

    #[test]
    fn test_file_name_extracts_string() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("script", VariableType::File, "solution.py").unwrap());
        table.insert(Variable::new("entry", VariableType::String, "").unwrap());

        let mut bx = FileNameBox::default();
        bx.bind_input("file", "script").unwrap();
        bx.bind_output("name", "entry").unwrap();

        let output = compile_plain(&bx, &table);
        assert_eq!(output.writes[0].as_scalar().unwrap(), "solution.py");
        assert_eq!(output.writes[0].var_type(), VariableType::String);
    }
}

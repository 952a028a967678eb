//! Data source and sink boxes.
//!
//! Input boxes materialize exercise data inside the job directory: remote
//! variables always compile to one `fetch` task per file, local variables to
//! a `cp` only when the source and destination names differ. Equal names
//! mean the file is already in place and compile to nothing.

use crate::base::{BoxOutput, PipelineBox, PortAccess, bookkeeping_task, commands, declare_box};
use crate::params::CompilationParams;
use crucible_core::Result;
use crucible_core::port::PortDef;
use crucible_core::task::Task;
use crucible_core::variable::{Variable, VariableType};

/// Fetch or copy one file into place.
fn materialize_single(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
    source: &Variable,
    destination: &Variable,
) -> Result<Vec<Task>> {
    let dest_path = params.source_path(destination)?;
    if source.var_type().is_remote() {
        let remote_name = bx.scalar_of(source)?;
        return Ok(vec![bookkeeping_task(
            params,
            bx.name(),
            commands::FETCH,
            vec![remote_name, dest_path],
        )]);
    }
    let source_name = bx.scalar_of(source)?;
    let dest_name = bx.scalar_of(destination)?;
    if source_name == dest_name {
        return Ok(vec![]);
    }
    Ok(vec![bookkeeping_task(
        params,
        bx.name(),
        commands::COPY,
        vec![params.source_path(source)?, dest_path],
    )])
}

fn compile_single_in(
    bx: &(impl PipelineBox + ?Sized),
    params: &CompilationParams,
) -> Result<BoxOutput> {
    let destination = bx.output_variable(params, "input")?;
    let Some(source) = bx.optional_input_variable(params, "input")? else {
        // Unbound input: the file is supplied directly under its own name
        return Ok(BoxOutput::none());
    };
    Ok(BoxOutput::tasks(materialize_single(
        bx,
        params,
        source,
        destination,
    )?))
}

declare_box! {
    /// Single test-data file entering the pipeline.
    DataInBox {
        type_key: "data-in",
        default_name: "Data Input",
        inputs: &[PortDef::optional("input", VariableType::RemoteFile)],
        outputs: &[PortDef::required("input", VariableType::File)],
    }
}

impl DataInBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        compile_single_in(self, params)
    }
}

declare_box! {
    /// Single exercise file (wrapper, expected output, ...) entering the
    /// pipeline.
    FileInBox {
        type_key: "file-in",
        default_name: "File Input",
        inputs: &[PortDef::optional("input", VariableType::RemoteFile)],
        outputs: &[PortDef::required("input", VariableType::File)],
    }
}

impl FileInBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        compile_single_in(self, params)
    }
}

declare_box! {
    /// Array of files entering the pipeline.
    FilesInBox {
        type_key: "files-in",
        default_name: "Files Input",
        inputs: &[PortDef::optional("input", VariableType::RemoteFileArray)],
        outputs: &[PortDef::required("input", VariableType::FileArray)],
    }
}

impl FilesInBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let destination = self.output_variable(params, "input")?;
        let Some(source) = self.optional_input_variable(params, "input")? else {
            return Ok(BoxOutput::none());
        };

        let source_names = self.array_of(source)?;
        let dest_names = self.array_of(destination)?;
        if source_names.len() != dest_names.len() {
            return Err(self.config_error(format!(
                "input file count ({}) does not match local name count ({})",
                source_names.len(),
                dest_names.len()
            )));
        }

        let dest_paths = params.source_paths(destination)?;
        let mut tasks = Vec::new();
        if source.var_type().is_remote() {
            for (remote_name, dest_path) in source_names.iter().zip(dest_paths) {
                tasks.push(bookkeeping_task(
                    params,
                    self.name(),
                    commands::FETCH,
                    vec![remote_name.clone(), dest_path],
                ));
            }
        } else {
            let source_paths = params.source_paths(source)?;
            for (i, dest_name) in dest_names.iter().enumerate() {
                if &source_names[i] == dest_name {
                    continue;
                }
                tasks.push(bookkeeping_task(
                    params,
                    self.name(),
                    commands::COPY,
                    vec![source_paths[i].clone(), dest_paths[i].clone()],
                ));
            }
        }
        Ok(BoxOutput::tasks(tasks))
    }
}

declare_box! {
    /// Result file leaving the pipeline for collection.
    DataOutBox {
        type_key: "data-out",
        default_name: "Data Output",
        inputs: &[PortDef::required("output", VariableType::File)],
        outputs: &[PortDef::required("output-file", VariableType::File)],
    }
}

impl DataOutBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let source = self.input_variable(params, "output")?;
        let destination = self.output_variable(params, "output-file")?;
        Ok(BoxOutput::tasks(materialize_single(
            self,
            params,
            source,
            destination,
        )?))
    }
}

declare_box! {
    /// Unconditional fetch of one remote file.
    FetchFileBox {
        type_key: "fetch-file",
        default_name: "Fetch File",
        inputs: &[PortDef::required("remote", VariableType::RemoteFile)],
        outputs: &[PortDef::required("file", VariableType::File)],
    }
}

impl FetchFileBox {
    fn compile_box(&self, params: &CompilationParams) -> Result<BoxOutput> {
        let remote = self.input_variable(params, "remote")?;
        let destination = self.output_variable(params, "file")?;
        let task = bookkeeping_task(
            params,
            self.name(),
            commands::FETCH,
            vec![self.scalar_of(remote)?, params.source_path(destination)?],
        );
        Ok(BoxOutput::tasks(vec![task]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DirectoryLayout;
    use crucible_core::error::Error;
    use crucible_core::variable::VariablesTable;
    use std::cell::Cell;

    fn compile_in_test<B: PipelineBox>(bx: &B, table: &VariablesTable) -> Result<BoxOutput> {
        let layout = DirectoryLayout::default();
        let counter = Cell::new(0);
        let params = CompilationParams::new(table, &layout, &counter).for_test("A");
        bx.compile(&params)
    }

    #[test]
    fn test_remote_input_fetches() {
        let mut table = VariablesTable::new();
        table.insert(
            Variable::new("remote-input", VariableType::RemoteFile, "bf26cd4e").unwrap(),
        );
        table.insert(
            Variable::new("local-input", VariableType::File, "in.txt")
                .unwrap()
                .with_directory("A"),
        );

        let mut bx = DataInBox::default();
        bx.bind_input("input", "remote-input").unwrap();
        bx.bind_output("input", "local-input").unwrap();

        let output = compile_in_test(&bx, &table).unwrap();
        assert_eq!(output.tasks.len(), 1);
        let task = &output.tasks[0];
        assert!(task.is_internal());
        assert_eq!(task.cmd.bin, "fetch");
        assert_eq!(task.cmd.args, vec!["bf26cd4e", "${SOURCE_DIR}/A/in.txt"]);
        assert_eq!(task.test_id.as_ref().unwrap().as_str(), "A");
    }

    #[test]
    fn test_local_input_with_equal_name_is_noop() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("provided", VariableType::File, "in.txt").unwrap());
        table.insert(
            Variable::new("local-input", VariableType::File, "in.txt")
                .unwrap()
                .with_directory("A"),
        );

        let mut bx = FileInBox::default();
        bx.bind_input("input", "provided").unwrap();
        bx.bind_output("input", "local-input").unwrap();

        let output = compile_in_test(&bx, &table).unwrap();
        assert!(output.tasks.is_empty());
    }

    #[test]
    fn test_files_in_count_mismatch_names_box_type() {
        let mut table = VariablesTable::new();
        table.insert(
            Variable::new(
                "remote-files",
                VariableType::RemoteFileArray,
                vec!["aa11", "bb22"],
            )
            .unwrap(),
        );
        table.insert(
            Variable::new("local-files", VariableType::FileArray, vec!["data.txt"]).unwrap(),
        );

        let mut bx = FilesInBox::default();
        bx.bind_input("input", "remote-files").unwrap();
        bx.bind_output("input", "local-files").unwrap();

        let err = compile_in_test(&bx, &table).unwrap_err();
        assert!(matches!(
            err,
            Error::BoxConfig {
                box_type: "files-in",
                ..
            }
        ));
    }

    #[test]
    fn test_files_in_fetches_each_remote_file() {
        let mut table = VariablesTable::new();
        table.insert(
            Variable::new(
                "remote-files",
                VariableType::RemoteFileArray,
                vec!["aa11", "bb22"],
            )
            .unwrap(),
        );
        table.insert(
            Variable::new("local-files", VariableType::FileArray, vec!["d1.txt", "d2.txt"])
                .unwrap()
                .with_directory("A"),
        );

        let mut bx = FilesInBox::default();
        bx.bind_input("input", "remote-files").unwrap();
        bx.bind_output("input", "local-files").unwrap();

        let output = compile_in_test(&bx, &table).unwrap();
        assert_eq!(output.tasks.len(), 2);
        assert_eq!(output.tasks[0].cmd.args[0], "aa11");
        assert_eq!(output.tasks[1].cmd.args[1], "${SOURCE_DIR}/A/d2.txt");
    }

    #[test]
    fn test_fetch_file_always_fetches() {
        let mut table = VariablesTable::new();
        table.insert(Variable::new("hash", VariableType::RemoteFile, "cc33").unwrap());
        table.insert(Variable::new("wrapper", VariableType::File, "wrap.sh").unwrap());

        let mut bx = FetchFileBox::default();
        bx.bind_input("remote", "hash").unwrap();
        bx.bind_output("file", "wrapper").unwrap();

        let output = compile_in_test(&bx, &table).unwrap();
        assert_eq!(output.tasks.len(), 1);
        assert_eq!(output.tasks[0].cmd.bin, "fetch");
    }
}

//! The closed catalog of box types.
//!
//! [`BoxType`] is the stable wire discriminant; [`create_box`] is the one
//! place instances are made, with an exhaustive match so a new variant
//! cannot be added without deciding its construction.

use crate::base::PipelineBox;
use crate::compilers::*;
use crate::custom::CustomBox;
use crate::data::*;
use crate::executors::*;
use crate::judge::JudgeBox;
use crate::util::*;
use crucible_core::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoxType {
    #[serde(rename = "gcc")]
    Gcc,
    #[serde(rename = "g++")]
    Gpp,
    #[serde(rename = "fpc")]
    Fpc,
    #[serde(rename = "javac")]
    Javac,
    #[serde(rename = "jvm-compilation")]
    JvmCompilation,
    #[serde(rename = "custom-compilation")]
    CustomCompilation,
    #[serde(rename = "prolog")]
    Prolog,
    #[serde(rename = "bison")]
    Bison,
    #[serde(rename = "python-compile")]
    PythonCompile,
    #[serde(rename = "elf-exec")]
    ElfExec,
    #[serde(rename = "mono-exec")]
    MonoExec,
    #[serde(rename = "python3")]
    Python3,
    #[serde(rename = "script-exec")]
    ScriptExec,
    #[serde(rename = "wrapped-exec")]
    WrappedExec,
    #[serde(rename = "jvm-runner")]
    JvmRunner,
    #[serde(rename = "haskell-exec")]
    HaskellExec,
    #[serde(rename = "node")]
    Node,
    #[serde(rename = "php")]
    Php,
    #[serde(rename = "judge")]
    Judge,
    #[serde(rename = "data-in")]
    DataIn,
    #[serde(rename = "file-in")]
    FileIn,
    #[serde(rename = "files-in")]
    FilesIn,
    #[serde(rename = "data-out")]
    DataOut,
    #[serde(rename = "fetch-file")]
    FetchFile,
    #[serde(rename = "file-name")]
    FileName,
    #[serde(rename = "file-to-array")]
    FileToArray,
    #[serde(rename = "string-to-array")]
    StringToArray,
    #[serde(rename = "merge-two-files")]
    MergeTwoFiles,
    #[serde(rename = "merge-file-and-files")]
    MergeFileAndFiles,
    #[serde(rename = "merge-strings")]
    MergeStrings,
    #[serde(rename = "merge-files")]
    MergeFiles,
    #[serde(rename = "rename")]
    Rename,
    #[serde(rename = "copy")]
    Copy,
    #[serde(rename = "extract")]
    Extract,
    #[serde(rename = "mkdir")]
    Mkdir,
    #[serde(rename = "join-pipelines")]
    JoinPipelines,
    #[serde(rename = "custom")]
    Custom,
}

impl BoxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxType::Gcc => "gcc",
            BoxType::Gpp => "g++",
            BoxType::Fpc => "fpc",
            BoxType::Javac => "javac",
            BoxType::JvmCompilation => "jvm-compilation",
            BoxType::CustomCompilation => "custom-compilation",
            BoxType::Prolog => "prolog",
            BoxType::Bison => "bison",
            BoxType::PythonCompile => "python-compile",
            BoxType::ElfExec => "elf-exec",
            BoxType::MonoExec => "mono-exec",
            BoxType::Python3 => "python3",
            BoxType::ScriptExec => "script-exec",
            BoxType::WrappedExec => "wrapped-exec",
            BoxType::JvmRunner => "jvm-runner",
            BoxType::HaskellExec => "haskell-exec",
            BoxType::Node => "node",
            BoxType::Php => "php",
            BoxType::Judge => "judge",
            BoxType::DataIn => "data-in",
            BoxType::FileIn => "file-in",
            BoxType::FilesIn => "files-in",
            BoxType::DataOut => "data-out",
            BoxType::FetchFile => "fetch-file",
            BoxType::FileName => "file-name",
            BoxType::FileToArray => "file-to-array",
            BoxType::StringToArray => "string-to-array",
            BoxType::MergeTwoFiles => "merge-two-files",
            BoxType::MergeFileAndFiles => "merge-file-and-files",
            BoxType::MergeStrings => "merge-strings",
            BoxType::MergeFiles => "merge-files",
            BoxType::Rename => "rename",
            BoxType::Copy => "copy",
            BoxType::Extract => "extract",
            BoxType::Mkdir => "mkdir",
            BoxType::JoinPipelines => "join-pipelines",
            BoxType::Custom => "custom",
        }
    }

    /// Every type in the catalog, in a stable order.
    pub fn all() -> &'static [BoxType] {
        &[
            BoxType::Gcc,
            BoxType::Gpp,
            BoxType::Fpc,
            BoxType::Javac,
            BoxType::JvmCompilation,
            BoxType::CustomCompilation,
            BoxType::Prolog,
            BoxType::Bison,
            BoxType::PythonCompile,
            BoxType::ElfExec,
            BoxType::MonoExec,
            BoxType::Python3,
            BoxType::ScriptExec,
            BoxType::WrappedExec,
            BoxType::JvmRunner,
            BoxType::HaskellExec,
            BoxType::Node,
            BoxType::Php,
            BoxType::Judge,
            BoxType::DataIn,
            BoxType::FileIn,
            BoxType::FilesIn,
            BoxType::DataOut,
            BoxType::FetchFile,
            BoxType::FileName,
            BoxType::FileToArray,
            BoxType::StringToArray,
            BoxType::MergeTwoFiles,
            BoxType::MergeFileAndFiles,
            BoxType::MergeStrings,
            BoxType::MergeFiles,
            BoxType::Rename,
            BoxType::Copy,
            BoxType::Extract,
            BoxType::Mkdir,
            BoxType::JoinPipelines,
            BoxType::Custom,
        ]
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoxType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoxType::all()
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownBoxType(s.to_string()))
    }
}

/// Instantiate a box with its default ports and display name.
pub fn create_box(box_type: BoxType) -> Box<dyn PipelineBox> {
    match box_type {
        BoxType::Gcc => Box::new(GccCompilationBox::default()),
        BoxType::Gpp => Box::new(GppCompilationBox::default()),
        BoxType::Fpc => Box::new(FpcCompilationBox::default()),
        BoxType::Javac => Box::new(JavacCompilationBox::default()),
        BoxType::JvmCompilation => Box::new(JvmCompilationBox::default()),
        BoxType::CustomCompilation => Box::new(CustomCompilationBox::default()),
        BoxType::Prolog => Box::new(PrologCompilationBox::default()),
        BoxType::Bison => Box::new(BisonCompilationBox::default()),
        BoxType::PythonCompile => Box::new(PythonCompilationBox::default()),
        BoxType::ElfExec => Box::new(ElfExecutionBox::default()),
        BoxType::MonoExec => Box::new(MonoExecutionBox::default()),
        BoxType::Python3 => Box::new(PythonExecutionBox::default()),
        BoxType::ScriptExec => Box::new(ScriptExecutionBox::default()),
        BoxType::WrappedExec => Box::new(WrappedExecutionBox::default()),
        BoxType::JvmRunner => Box::new(JvmRunExecutionBox::default()),
        BoxType::HaskellExec => Box::new(HaskellExecutionBox::default()),
        BoxType::Node => Box::new(NodeExecutionBox::default()),
        BoxType::Php => Box::new(PhpExecutionBox::default()),
        BoxType::Judge => Box::new(JudgeBox::default()),
        BoxType::DataIn => Box::new(DataInBox::default()),
        BoxType::FileIn => Box::new(FileInBox::default()),
        BoxType::FilesIn => Box::new(FilesInBox::default()),
        BoxType::DataOut => Box::new(DataOutBox::default()),
        BoxType::FetchFile => Box::new(FetchFileBox::default()),
        BoxType::FileName => Box::new(FileNameBox::default()),
        BoxType::FileToArray => Box::new(FileToArrayBox::default()),
        BoxType::StringToArray => Box::new(StringToArrayBox::default()),
        BoxType::MergeTwoFiles => Box::new(MergeTwoFilesBox::default()),
        BoxType::MergeFileAndFiles => Box::new(MergeFileAndFilesBox::default()),
        BoxType::MergeStrings => Box::new(MergeStringsBox::default()),
        BoxType::MergeFiles => Box::new(MergeFilesBox::default()),
        BoxType::Rename => Box::new(RenameBox::default()),
        BoxType::Copy => Box::new(CopyBox::default()),
        BoxType::Extract => Box::new(ExtractBox::default()),
        BoxType::Mkdir => Box::new(MkdirBox::default()),
        BoxType::JoinPipelines => Box::new(JoinPipelinesBox::default()),
        BoxType::Custom => Box::new(CustomBox::default()),
    }
}

/// Instantiate a box from its wire type key.
pub fn create_box_by_key(key: &str) -> crucible_core::Result<Box<dyn PipelineBox>> {
    Ok(create_box(key.parse()?))
}

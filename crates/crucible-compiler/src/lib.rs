//! Crucible Compiler
//!
//! Turns authored evaluation pipelines (typed boxes wired through named
//! variables) into dispatchable job configurations. The driver orders each
//! test's box graph by its variable data flow, threads the compilation
//! context through every box, attaches per-hardware-group limits to the
//! execution tasks, and assembles the validated [`JobConfig`].
//!
//! [`JobConfig`]: crucible_core::job::JobConfig

pub mod compiler;
pub mod graph;

pub use compiler::{CompilationRequest, Compiler, TestPlan};
pub use graph::{GraphError, sort_boxes};

//! Crucible Core
//!
//! Core domain types for the Crucible pipeline compilation engine.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates: typed variables, ports, tasks, sandbox
//! limits, and the compiled job configuration.

pub mod error;
pub mod ids;
pub mod job;
pub mod limits;
pub mod port;
pub mod sandbox;
pub mod task;
pub mod variable;

pub use error::{Error, Result, SoftErrorCode};
pub use ids::*;

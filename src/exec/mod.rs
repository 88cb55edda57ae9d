// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] owns one OS process at a time: spawning via
//!   `tokio::process::Command`, pumping merged stdout/stderr under a label
//!   prefix, and reacting to cancellation.
//! - [`group`] runs a flat list of commands concurrently or serially under
//!   one shared cancellation.

pub mod group;
pub mod process;

pub use group::{GroupConfig, GroupRun, run_concurrently, run_serially};
pub use process::{ArgvCommandConfig, ProcessRunner, RunConfig, ShellCommandConfig};

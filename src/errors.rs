// src/errors.rs

//! Structured error types for the orchestration core.
//!
//! Command-level failures are kept distinct so callers can tell an expected
//! "the command exited non-zero" apart from operational failures (the
//! executable was missing, or the output pipe broke). Graph configuration
//! errors are raised before any process is spawned.

use thiserror::Error;

/// Failure of a single command invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be started (executable missing, not runnable).
    #[error("starting command: {0}")]
    Spawn(#[source] std::io::Error),

    /// Reading the merged stdout/stderr stream failed.
    #[error("reading command output: {0}")]
    OutputStream(#[source] std::io::Error),

    /// Waiting on the process failed.
    #[error("waiting for command: {0}")]
    Wait(#[source] std::io::Error),

    /// The command ran but exited non-zero. This is the expected, reportable
    /// per-command failure; the prefix is the command's display label.
    #[error("{prefix}exited with error: {status}")]
    NonZeroExit {
        prefix: String,
        status: std::process::ExitStatus,
    },
}

/// Configuration error in the dependency graph. Raised before execution,
/// with zero side effects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// An edge referenced a node that was never declared.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// A node reappeared on the current depth-first path.
    #[error("cycle detected: {node:?} reached via {path:?}")]
    CycleDetected { node: String, path: Vec<String> },
}

/// Caller-supplied labels did not line up with the command list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("number of labels ({labels}) must match number of commands ({commands})")]
pub struct LabelCountMismatch {
    pub labels: usize,
    pub commands: usize,
}

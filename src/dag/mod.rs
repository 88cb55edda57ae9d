// src/dag/mod.rs

//! Dependency-graph execution.
//!
//! - [`graph`] holds the directed graph of named commands and performs
//!   cycle-checked traversal.
//! - [`gate`] is the run-wide mutual-exclusion primitive for `exclusive`
//!   commands.
//! - [`scheduler`] executes the reachable set of a target command, one task
//!   per node, synchronized by per-node completion tokens.

pub mod gate;
pub mod graph;
pub mod scheduler;

pub use gate::ExclusivityGate;
pub use graph::DirectedGraph;
pub use scheduler::{ExecuteConfig, execute};

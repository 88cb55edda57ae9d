// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level droverfile as read from JSON, YAML or TOML.
///
/// All three formats share one shape:
///
/// ```toml
/// [commands.build]
/// run = "cargo build"
///
/// [commands.ci]
/// run = "echo done"
/// needs = ["build", "lint"]
/// exclusive = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandFile {
    /// All named commands. Keys are the command names, which double as the
    /// output labels when a command runs.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSpec>,
}

/// One named unit of work. Immutable once parsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandSpec {
    /// Shell command to run. A command with an empty `run` is a pure
    /// aggregation node: it only gathers its dependencies.
    #[serde(default)]
    pub run: String,

    /// Names of commands that must complete before this one starts.
    #[serde(default)]
    pub needs: Vec<String>,

    /// If true, no other command may be running while this one runs.
    #[serde(default)]
    pub exclusive: bool,

    /// Filesystem paths whose modification cancels and restarts this
    /// command after it has run.
    #[serde(default)]
    pub watch: Vec<String>,
}

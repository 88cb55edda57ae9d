// src/config/mod.rs

//! Input discovery for the orchestration core.
//!
//! Responsibilities:
//! - Define the droverfile data model (`model.rs`).
//! - Load a droverfile from disk in JSON/YAML/TOML form (`loader.rs`).
//! - Parse Procfiles and `.env` files (`procfile.rs`).
//! - Expand npm script references from package.json (`scripts.rs`).
//!
//! None of this runs processes; it only produces the command lists and
//! dependency maps that `exec` and `dag` consume.

pub mod loader;
pub mod model;
pub mod procfile;
pub mod scripts;

pub use loader::{find_command_file, load_command_file};
pub use model::{CommandFile, CommandSpec};
pub use procfile::{parse_env_lines, parse_procfile};
pub use scripts::expand_script_refs;

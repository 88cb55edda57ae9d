// src/config/loader.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::config::model::CommandFile;

/// Base name searched for when no explicit path is given.
const COMMAND_FILE_NAME: &str = "droverfile";

/// Resolve the droverfile to load.
///
/// With an explicit path, that path is used as-is. Otherwise the working
/// directory is searched for `droverfile`, then `droverfile.json`,
/// `droverfile.toml`, `droverfile.yaml` and `droverfile.yml`, in that order.
pub fn find_command_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let candidates = [
        COMMAND_FILE_NAME.to_string(),
        format!("{COMMAND_FILE_NAME}.json"),
        format!("{COMMAND_FILE_NAME}.toml"),
        format!("{COMMAND_FILE_NAME}.yaml"),
        format!("{COMMAND_FILE_NAME}.yml"),
    ];

    for candidate in &candidates {
        let path = PathBuf::from(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }

    bail!("no droverfile found in the working directory")
}

/// Load a droverfile, picking the parser from the file extension.
///
/// An extensionless file is tried as JSON, then YAML, then TOML.
pub fn load_command_file(path: impl AsRef<Path>) -> Result<CommandFile> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading droverfile at {path:?}"))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    let file = match ext {
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("parsing JSON droverfile from {path:?}"))?,
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing YAML droverfile from {path:?}"))?,
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("parsing TOML droverfile from {path:?}"))?,
        "" => parse_any(&contents)
            .with_context(|| format!("parsing droverfile from {path:?}"))?,
        other => bail!("unrecognized droverfile extension: .{other}"),
    };

    Ok(file)
}

fn parse_any(contents: &str) -> Result<CommandFile> {
    if let Ok(file) = serde_json::from_str(contents) {
        return Ok(file);
    }
    if let Ok(file) = serde_yaml::from_str(contents) {
        return Ok(file);
    }
    toml::from_str(contents).context("contents are not valid JSON, YAML or TOML")
}

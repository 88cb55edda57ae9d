// src/config/scripts.rs

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PackageFile {
    #[serde(default)]
    scripts: std::collections::BTreeMap<String, String>,
}

/// Expand `--npm` script references into `(label, command)` pairs.
///
/// A plain reference `build` becomes `("build", "npm run build")`. A
/// reference with a trailing `*` reads `package.json` in `dir` and expands
/// every script whose name starts with the prefix, sorted by name.
pub fn expand_script_refs(refs: &[String], dir: &Path) -> Result<Vec<(String, String)>> {
    let mut commands = Vec::new();

    for script_ref in refs {
        if let Some(prefix) = script_ref.strip_suffix('*') {
            let pkg = read_package_file(dir)?;

            // BTreeMap iteration keeps matching script names sorted.
            for name in pkg.scripts.keys().filter(|n| n.starts_with(prefix)) {
                commands.push((name.clone(), format!("npm run {name}")));
            }
        } else {
            commands.push((script_ref.clone(), format!("npm run {script_ref}")));
        }
    }

    Ok(commands)
}

fn read_package_file(dir: &Path) -> Result<PackageFile> {
    let path = dir.join("package.json");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {path:?}"))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {path:?}"))
}

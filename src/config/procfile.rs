// src/config/procfile.rs

use anyhow::{Context, Result, anyhow};

/// Parse Procfile contents into ordered `(label, command)` pairs.
///
/// Each non-empty line has the form `name: command`. Surrounding whitespace
/// is trimmed on both sides of the first colon; blank lines are skipped.
pub fn parse_procfile(contents: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();

    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (name, command) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("Procfile line {} has no colon: {line:?}", lineno + 1))?;

        entries.push((name.trim().to_string(), command.trim().to_string()));
    }

    Ok(entries)
}

/// Parse `.env`-style lines into `KEY=VALUE` entries.
///
/// Quoted values are unquoted with shell rules, so `FOO="a b"` becomes
/// `FOO=a b`. Blank lines are skipped; a line that splits into more than
/// one shell word is rejected.
pub fn parse_env_lines(lines: &[String]) -> Result<Vec<String>> {
    let mut parsed = Vec::with_capacity(lines.len());

    for line in lines {
        let words = shell_words::split(line)
            .with_context(|| format!("parsing env line: {line:?}"))?;

        match words.len() {
            0 => continue,
            1 => parsed.push(words.into_iter().next().unwrap_or_default()),
            _ => return Err(anyhow!("invalid env line: {line:?}")),
        }
    }

    Ok(parsed)
}

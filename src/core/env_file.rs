//! Reader for the sourced `KEY=VALUE` variable file that holds the image coordinates.
//!
//! Supports the subset of shell assignment syntax such files use in practice:
//! `export` prefixes, comments, single/double quotes, and `$VAR` / `${VAR}`
//! references to earlier keys or the process environment.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::io;

pub type EnvVars = BTreeMap<String, String>;

/// Read and parse an env file, resolving references against the process environment.
pub fn load(path: &Path) -> Result<EnvVars> {
    if !path.exists() {
        return Err(Error::env_file_not_found(path.to_string_lossy().to_string()));
    }
    let content = io::read_file(path, &format!("read {}", path.display()))?;
    parse(&content, |name| std::env::var(name).ok())
}

/// Parse env file content. `lookup` resolves names not defined earlier in the file.
pub fn parse<F>(content: &str, lookup: F) -> Result<EnvVars>
where
    F: Fn(&str) -> Option<String>,
{
    let mut vars = EnvVars::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::config_invalid_value(
                format!("line {}", index + 1),
                Some(raw.to_string()),
                "expected KEY=VALUE",
            )
        })?;

        let key = key.trim();
        if !is_valid_name(key) {
            return Err(Error::config_invalid_value(
                format!("line {}", index + 1),
                Some(key.to_string()),
                "invalid variable name",
            ));
        }

        let value = parse_value(value.trim(), |name| {
            vars.get(name).cloned().or_else(|| lookup(name))
        });
        vars.insert(key.to_string(), value);
    }

    Ok(vars)
}

fn parse_value<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(inner) = value.strip_prefix('\'') {
        // Single quotes: literal, no expansion.
        return inner.split('\'').next().unwrap_or_default().to_string();
    }

    let unquoted = if let Some(inner) = value.strip_prefix('"') {
        inner.split('"').next().unwrap_or_default()
    } else {
        strip_inline_comment(value)
    };

    // Unset variables expand to the empty string, as in sh.
    shellexpand::env_with_context_no_errors(unquoted, |name: &str| {
        Some(lookup(name).unwrap_or_default())
    })
    .into_owned()
}

fn strip_inline_comment(value: &str) -> &str {
    match value.find(" #") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

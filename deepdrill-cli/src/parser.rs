//! Profile files: ini-style sections of `key = value` pairs.
//!
//! ```text
//! [location]
//! # comment lines start with '#'
//! real = -0.745
//! imag = 0.186
//! zoom = 1e12
//! ```
//!
//! Keys are flattened to `section.key` and lowercased. Comments occupy a
//! whole line; a `#` after a value belongs to the value. Syntax errors
//! carry the file path and line number.

use anyhow::{anyhow, bail, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parse a profile file into flat `section.key → value` pairs.
pub fn parse_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to open file {}: {}", path.display(), e))?;
    parse_str(&text).map_err(|e| anyhow!("{}: {}", path.display(), e))
}

/// Parse profile text. Exposed separately so overrides given on the command
/// line can reuse the key-value handling.
pub fn parse_str(text: &str) -> Result<BTreeMap<String, String>> {
    let mut keys = BTreeMap::new();
    let mut section = String::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].trim().to_ascii_lowercase();
            continue;
        }

        if let Some(pos) = line.find('=') {
            let key = line[..pos].trim().to_ascii_lowercase();
            let value = line[pos + 1..].trim().to_string();
            if key.is_empty() {
                bail!("syntax error in line {}", index + 1);
            }
            let full_key = if section.is_empty() {
                key
            } else {
                format!("{}.{}", section, key)
            };
            keys.insert(full_key, value);
            continue;
        }

        bail!("syntax error in line {}", index + 1);
    }

    Ok(keys)
}

/// Split a `key=value` override argument.
pub fn parse_override(arg: &str) -> Result<(String, String)> {
    let pos = arg
        .find('=')
        .ok_or_else(|| anyhow!("invalid override '{}': expected key=value", arg))?;
    let key = arg[..pos].trim().to_ascii_lowercase();
    let value = arg[pos + 1..].trim().to_string();
    if key.is_empty() {
        bail!("invalid override '{}': empty key", arg);
    }
    Ok((key, value))
}

//! Readers for the manifest formats an app can declare its name and version in.
//!
//! - `pyproject.toml`: `[project] name/version`
//! - `setup.cfg`: `[metadata] name/version`
//! - Python sources (`__init__.py`, `setup.py`, `hooks.py`): `field = "value"` assignments
//!
//! Missing files read as `Ok(None)`; only unreadable or unparsable files are errors.

use crate::core::error::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const PYPROJECT_FILE: &str = "pyproject.toml";
pub const SETUP_CFG_FILE: &str = "setup.cfg";
pub const SETUP_PY_FILE: &str = "setup.py";
pub const INIT_FILE: &str = "__init__.py";
pub const HOOKS_FILE: &str = "hooks.py";

/// `name = "value"` at the start of a line
static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?m)^\s*(\w+)\s*=\s*['"](.+?)['"]"#));

/// `name="value"` anywhere, e.g. a keyword argument of `setup(...)`
static KEYWORD_ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"\b(\w+)\s*=\s*['"]([^'"]+)['"]"#));

/// Compile a pattern known at build time
pub(crate) fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("regex pattern should be valid at compile time: {e}"),
    }
}

/// `[project] <field>` from a `pyproject.toml`
pub fn pyproject_field(path: &Path, field: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let document: toml::Table = toml::from_str(&content)?;

    Ok(document
        .get("project")
        .and_then(|project| project.get(field))
        .and_then(|value| value.as_str())
        .map(str::to_string))
}

/// `<key>` inside `[<section>]` of an INI-style `setup.cfg`
pub fn setup_cfg_field(path: &Path, section: &str, key: &str) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    Ok(ini_value(&content, section, key))
}

fn ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_section = trimmed[1..trimmed.len() - 1].trim() == section;
            continue;
        }

        // continuation lines belong to the previous key
        if !in_section || line.starts_with([' ', '\t']) {
            continue;
        }

        if let Some((name, value)) = trimmed.split_once(['=', ':']) {
            if name.trim() == key {
                let value = value.trim();
                // `attr:` / `file:` directives are resolved by setuptools at build time
                if value.is_empty() || value.starts_with("attr:") || value.starts_with("file:") {
                    return None;
                }
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Value of the first `field = "value"` (or `'value'`) assignment starting a line
pub fn assignment_value(contents: &str, field: &str) -> Option<String> {
    first_named_value(&ASSIGNMENT, contents, field)
}

/// Value of a `field="value"` keyword argument anywhere in the file, e.g. inside `setup(...)`
pub fn keyword_argument_value(contents: &str, field: &str) -> Option<String> {
    first_named_value(&KEYWORD_ARGUMENT, contents, field)
}

fn first_named_value(re: &Regex, contents: &str, field: &str) -> Option<String> {
    re.captures_iter(contents)
        .find(|caps| &caps[1] == field)
        .map(|caps| caps[2].to_string())
}

/// Read a text file if it exists
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

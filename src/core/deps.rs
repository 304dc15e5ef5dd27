//! Extraction of the `required_apps` declaration from an app's `hooks.py`.
//!
//! Only one level of dependencies is read. The declaration must be a literal list
//! of strings:
//!
//! ```text
//! required_apps = ["frappe", "erpnext"]
//! ```
//!
//! A missing assignment or anything other than a string-list literal is an error,
//! never an empty list.

use crate::core::{
    error::{AppyardError, Result},
    manifest::compile,
};
use regex::Regex;
use std::iter::Peekable;
use std::path::PathBuf;
use std::str::Chars;
use std::sync::LazyLock;

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*required_apps[ \t]*=[ \t]*"));

/// Where a dependency manifest comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Local(PathBuf),
    /// Already fetched content, `name` identifies it in errors
    Content { name: String, content: String },
}

impl ManifestSource {
    pub fn name(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Content { name, .. } => name.clone(),
        }
    }
}

/// Ordered `required_apps` of a manifest
pub fn required_apps(source: &ManifestSource) -> Result<Vec<String>> {
    match source {
        ManifestSource::Local(path) => {
            let content = std::fs::read_to_string(path)?;
            required_apps_from_str(&content, &source.name())
        }
        ManifestSource::Content { name, content } => required_apps_from_str(content, name),
    }
}

pub fn required_apps_from_str(content: &str, source_name: &str) -> Result<Vec<String>> {
    let assignment = ASSIGNMENT
        .find(content)
        .ok_or_else(|| AppyardError::dependency_manifest(source_name, "no required_apps assignment"))?;

    let apps = parse_string_list(&content[assignment.end()..]).map_err(|detail| {
        AppyardError::dependency_manifest(source_name, format!("required_apps is not a literal list: {detail}"))
    })?;

    log::debug!("{source_name} requires {apps:?}");
    Ok(apps)
}

type Cursor<'a> = Peekable<Chars<'a>>;

fn parse_string_list(input: &str) -> std::result::Result<Vec<String>, String> {
    let mut chars = input.chars().peekable();
    match chars.next() {
        Some('[') => {}
        Some(c) => return Err(format!("expected '[' but found '{c}'")),
        None => return Err("expected '[' but found end of input".to_string()),
    }

    let mut items = Vec::new();
    loop {
        skip_insignificant(&mut chars);
        match chars.next() {
            Some(']') => return Ok(items),
            Some(quote @ ('"' | '\'')) => items.push(parse_quoted(&mut chars, quote)?),
            Some(c) => return Err(format!("unexpected '{c}', only string items are allowed")),
            None => return Err("unterminated list".to_string()),
        }

        skip_insignificant(&mut chars);
        match chars.next() {
            Some(',') => continue,
            Some(']') => return Ok(items),
            Some(c) => return Err(format!("expected ',' or ']' but found '{c}'")),
            None => return Err("unterminated list".to_string()),
        }
    }
}

/// Whitespace, newlines and `#` comments between items
fn skip_insignificant(chars: &mut Cursor) {
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            while chars.next_if(|&c| c != '\n').is_some() {}
        } else {
            break;
        }
    }
}

fn parse_quoted(chars: &mut Cursor, quote: char) -> std::result::Result<String, String> {
    let mut value = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => return Ok(value),
            Some('\\') => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(escaped @ ('\\' | '\'' | '"')) => value.push(escaped),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => return Err("unterminated string".to_string()),
            },
            Some('\n') | None => return Err("unterminated string".to_string()),
            Some(c) => value.push(c),
        }
    }
}

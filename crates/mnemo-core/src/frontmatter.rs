//! Front-matter handling for markdown notes.
//!
//! A note may start with a block delimited by `---` lines:
//! ```markdown
//! ---
//! title: "Async drops"
//! project: acme__widgets
//! ---
//!
//! Body here.
//! ```
//!
//! Tagging never reorders or removes existing lines. The only edit it
//! makes is adding a `project:` line.

use std::borrow::Cow;

use crate::document::ProjectId;
use crate::error::MnemoError;

/// Front-matter block delimiter.
pub const DELIMITER: &str = "---";

/// Byte offsets of a front-matter block inside a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    yaml_start: usize,
    close_start: usize,
    body_start: usize,
}

/// What [`ensure_project`] did to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectTag {
    /// A `project` field was already present and was left untouched.
    Present,
    /// The block existed; a `project:` line was appended to it.
    Appended,
    /// No block existed; one was injected at the top.
    Injected,
}

/// The note's line ending, taken from its first line break.
fn line_ending(content: &str) -> &'static str {
    match content.find('\n') {
        Some(i) if content[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

fn locate(content: &str) -> Result<Option<Block>, MnemoError> {
    let yaml_start = if content.starts_with("---\n") {
        4
    } else if content.starts_with("---\r\n") {
        5
    } else {
        return Ok(None);
    };

    let mut pos = yaml_start;
    for line in content[yaml_start..].split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Ok(Some(Block {
                yaml_start,
                close_start: pos,
                body_start: pos + line.len(),
            }));
        }
        pos += line.len();
    }

    Err(MnemoError::Parse(
        "No closing '---' front-matter delimiter found".to_string(),
    ))
}

/// Split a note into its front-matter YAML and body.
///
/// Returns `None` for the YAML part when the note has no front-matter.
///
/// # Errors
///
/// Returns [`MnemoError::Parse`] if an opening delimiter has no matching
/// closing delimiter.
pub fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str), MnemoError> {
    match locate(content)? {
        Some(block) => Ok((
            Some(&content[block.yaml_start..block.close_start]),
            &content[block.body_start..],
        )),
        None => Ok((None, content)),
    }
}

/// Whether the YAML block declares `key` at its top level.
fn declares_key(yaml: &str, key: &str) -> Result<bool, MnemoError> {
    if yaml.trim().is_empty() {
        return Ok(false);
    }
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| MnemoError::Parse(e.to_string()))?;
    match value {
        serde_yaml::Value::Null => Ok(false),
        serde_yaml::Value::Mapping(map) => Ok(map.contains_key(key)),
        _ => Err(MnemoError::Parse(
            "front-matter is not a key/value mapping".to_string(),
        )),
    }
}

/// Make sure the note's front-matter carries a `project` field.
///
/// An existing `project` field is kept as is, even when it names a
/// different project. Applying this twice gives the same output as once.
///
/// # Errors
///
/// Returns [`MnemoError::Parse`] if the front-matter is unterminated or
/// is not a YAML mapping.
pub fn ensure_project<'a>(
    content: &'a str,
    project: &ProjectId,
) -> Result<(Cow<'a, str>, ProjectTag), MnemoError> {
    let nl = line_ending(content);
    let Some(block) = locate(content)? else {
        let injected = format!("{DELIMITER}{nl}project: {project}{nl}{DELIMITER}{nl}{content}");
        return Ok((Cow::Owned(injected), ProjectTag::Injected));
    };

    let yaml = &content[block.yaml_start..block.close_start];
    if declares_key(yaml, "project")? {
        return Ok((Cow::Borrowed(content), ProjectTag::Present));
    }

    let mut out = String::with_capacity(content.len() + project.as_str().len() + 12);
    out.push_str(&content[..block.close_start]);
    out.push_str(&format!("project: {project}{nl}"));
    out.push_str(&content[block.close_start..]);
    Ok((Cow::Owned(out), ProjectTag::Appended))
}

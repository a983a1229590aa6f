//! Document type: the indexed record of a single note.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MnemoError;

/// Kind of knowledge a note carries. Decides where the note lives in the
/// note tree and whether its vault path is nested under a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Principle,
    Pattern,
    Learning,
    Retrospective,
    Handoff,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Principle,
        Category::Pattern,
        Category::Learning,
        Category::Retrospective,
        Category::Handoff,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principle => "principle",
            Self::Pattern => "pattern",
            Self::Learning => "learning",
            Self::Retrospective => "retrospective",
            Self::Handoff => "handoff",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| MnemoError::Parse(format!("unknown category '{s}'")))
    }
}

/// Identifier of the project a working copy belongs to.
///
/// Always a single path segment, so a project's vault directory can never
/// contain another project's directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Validate a project id.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Parse`] for empty ids, ids starting with `.`,
    /// or ids containing anything but ASCII alphanumerics, `.`, `_`, `-`.
    pub fn new(id: impl Into<String>) -> Result<Self, MnemoError> {
        let id = id.into();
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if id.is_empty() || id.starts_with('.') || !valid_chars {
            return Err(MnemoError::Parse(format!("invalid project id '{id}'")));
        }
        Ok(Self(id))
    }

    /// Derive a project id from a git remote URL.
    ///
    /// Both `https://host/owner/repo.git` and `git@host:owner/repo.git`
    /// become `owner__repo`, lowercased.
    #[must_use]
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let path = match trimmed.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, p)| p)?,
            None => trimmed.rsplit_once(':').map(|(_, p)| p).unwrap_or(trimmed),
        };
        let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
        let repo = segments.next()?;
        let owner = segments.next()?;
        ProjectId::new(format!("{owner}__{repo}").to_lowercase()).ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = MnemoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ProjectId::new(value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

/// Soft-deletion annotation. A superseded document stays in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supersession {
    /// Id of the replacing document, or a marker such as `_orphaned`.
    pub by: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A note as recorded in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    // === Identity ===
    pub id: String,
    pub category: Category,
    /// Path relative to the working copy root, `/`-separated.
    pub source_path: String,

    // === Scope (None = universal) ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectId>,

    // === Content ===
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,

    // === Lifecycle ===
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub indexed_at: DateTime<Utc>,

    // === Provenance ===
    pub provenance: String,

    // === Supersession ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded: Option<Supersession>,
}

impl Document {
    /// Whether this document has been annotated as superseded.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.superseded.is_some()
    }
}

/// Derive the stable id of a document from its source path, creation
/// date, and slug. Indexing the same file twice yields the same id.
#[must_use]
pub fn document_id(category: Category, source_path: &str, created_at: DateTime<Utc>) -> String {
    let stem = source_path
        .rsplit('/')
        .next()
        .unwrap_or(source_path)
        .trim_end_matches(".md");
    let digest = Sha256::digest(source_path.as_bytes());
    let short: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!(
        "{}_{}_{}_{}",
        category.as_str(),
        created_at.format("%Y-%m-%d"),
        slugify(stem),
        short
    )
}

/// Lowercase, hyphen-separated slug of `text`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn category_parses_and_displays() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
        assert!("recipe".parse::<Category>().is_err());
        assert_eq!(Category::Retrospective.to_string(), "retrospective");
    }

    #[test]
    fn project_id_rejects_nested_or_hidden_ids() {
        assert!(ProjectId::new("mnemo").is_ok());
        assert!(ProjectId::new("acme__api-v2.1").is_ok());
        assert!(ProjectId::new("").is_err());
        assert!(ProjectId::new("a/b").is_err());
        assert!(ProjectId::new(".git").is_err());
        assert!(ProjectId::new("..").is_err());
    }

    #[test]
    fn project_id_from_remote_url() {
        let https = ProjectId::from_remote_url("https://github.com/Acme/Widgets.git").unwrap();
        assert_eq!(https.as_str(), "acme__widgets");

        let ssh = ProjectId::from_remote_url("git@github.com:acme/widgets.git").unwrap();
        assert_eq!(ssh, https);

        assert!(ProjectId::from_remote_url("not-a-remote").is_none());
    }

    #[test]
    fn project_id_deserialization_validates() {
        let ok: ProjectId = serde_json::from_str("\"alpha\"").unwrap();
        assert_eq!(ok.as_str(), "alpha");
        assert!(serde_json::from_str::<ProjectId>("\"a/b\"").is_err());
    }

    #[test]
    fn document_id_is_deterministic() {
        let created = Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap();
        let a = document_id(Category::Learning, "notes/learnings/Async Drops.md", created);
        let b = document_id(Category::Learning, "notes/learnings/Async Drops.md", created);
        assert_eq!(a, b);
        assert!(a.starts_with("learning_2025-03-04_async-drops_"));

        let other = document_id(Category::Learning, "notes/learnings/async-drops.md", created);
        assert_ne!(a, other, "different paths must not collide");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Hello,  World!! "), "hello-world");
        assert_eq!(slugify("2025-03-04_retro"), "2025-03-04-retro");
    }
}

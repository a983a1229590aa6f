//! Note tree layout and the static category table.
//!
//! Every category owns one directory under the note root. The table is
//! ordered; the first prefix that matches a path decides its category.

use std::path::{Path, PathBuf};

use crate::document::Category;

/// Whether a category's vault path carries the owning project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultScope {
    /// `category/<project>/rest` in the vault.
    Nested,
    /// Same path in the vault as locally; shared by every project.
    Universal,
}

/// One row of the category table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    /// Directory prefix relative to the note root, with trailing `/`.
    pub prefix: &'static str,
    pub category: Category,
    pub scope: VaultScope,
}

pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        prefix: "learnings/",
        category: Category::Learning,
        scope: VaultScope::Nested,
    },
    CategoryRule {
        prefix: "retrospectives/",
        category: Category::Retrospective,
        scope: VaultScope::Nested,
    },
    CategoryRule {
        prefix: "handoffs/",
        category: Category::Handoff,
        scope: VaultScope::Nested,
    },
    CategoryRule {
        prefix: "principles/",
        category: Category::Principle,
        scope: VaultScope::Universal,
    },
    CategoryRule {
        prefix: "patterns/",
        category: Category::Pattern,
        scope: VaultScope::Universal,
    },
];

/// Area for notes that are never indexed (drafts, captures).
pub const UNINDEXED_PREFIX: &str = "inbox/";

/// The rule whose prefix `note_path` starts with, if any.
///
/// `note_path` is relative to the note root and `/`-separated.
#[must_use]
pub fn rule_for_path(note_path: &str) -> Option<&'static CategoryRule> {
    CATEGORY_RULES
        .iter()
        .find(|rule| note_path.starts_with(rule.prefix))
}

/// The rule for `category`, or `None` if the table has no entry for it.
#[must_use]
pub fn rule_for_category(category: Category) -> Option<&'static CategoryRule> {
    CATEGORY_RULES.iter().find(|rule| rule.category == category)
}

/// Location of the note tree inside a working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLayout {
    working_copy: PathBuf,
    note_root: String,
}

impl NoteLayout {
    pub fn new(working_copy: impl Into<PathBuf>, note_root: impl Into<String>) -> Self {
        let note_root: String = note_root.into();
        Self {
            working_copy: working_copy.into(),
            note_root: note_root.trim_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn working_copy(&self) -> &Path {
        &self.working_copy
    }

    /// Absolute directory of the note tree.
    #[must_use]
    pub fn note_dir(&self) -> PathBuf {
        self.working_copy.join(&self.note_root)
    }

    /// Convert a note-root-relative path into the working-copy-relative
    /// form stored as a document's `source_path`.
    #[must_use]
    pub fn source_path(&self, note_path: &str) -> String {
        format!("{}/{}", self.note_root, note_path)
    }

    /// Inverse of [`NoteLayout::source_path`].
    #[must_use]
    pub fn note_path<'a>(&self, source_path: &'a str) -> Option<&'a str> {
        source_path
            .strip_prefix(self.note_root.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

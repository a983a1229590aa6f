//! Depth-first walk over a note or vault tree.
//!
//! Symbolic links are never followed and never yielded. Entries that
//! vanish or cannot be read mid-walk are skipped with a warning.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// A regular file found by [`TreeWalk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
    pub absolute: PathBuf,
}

/// A restartable walk configuration. Each call to [`TreeWalk::entries`]
/// starts a fresh traversal.
#[derive(Debug, Clone)]
pub struct TreeWalk {
    root: PathBuf,
    skip_hidden: bool,
    extension: Option<String>,
}

impl TreeWalk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_hidden: false,
            extension: None,
        }
    }

    /// Skip files and directories whose name starts with `.` (e.g. `.git`).
    #[must_use]
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Only yield files with this extension (without the dot).
    #[must_use]
    pub fn extension(mut self, ext: &str) -> Self {
        self.extension = Some(ext.to_string());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Iterate regular files in depth-first, name-sorted order.
    pub fn entries(&self) -> impl Iterator<Item = WalkEntry> + '_ {
        let skip_hidden = self.skip_hidden;
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                !(skip_hidden && e.depth() > 0 && e.file_name().to_string_lossy().starts_with('.'))
            })
            .filter_map(|res| match res {
                Ok(entry) => Some(entry),
                Err(e) => {
                    // A missing root is an empty tree, not a warning.
                    if e.depth() > 0 {
                        warn!(error = %e, "skipping unreadable entry");
                    }
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(move |entry| match &self.extension {
                Some(ext) => entry.path().extension().and_then(|e| e.to_str()) == Some(ext),
                None => true,
            })
            .filter_map(move |entry| {
                let relative = entry.path().strip_prefix(&self.root).ok()?;
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                Some(WalkEntry {
                    relative,
                    absolute: entry.into_path(),
                })
            })
    }
}

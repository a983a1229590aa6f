//! Working-copy configuration, read from `.mnemo/config.toml`.
//!
//! Every field has a default, so a missing file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MnemoError;
use crate::layout::NoteLayout;

/// Directory (relative to the working copy) holding the config file.
pub const CONFIG_DIR: &str = ".mnemo";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MnemoConfig {
    /// Note tree directory relative to the working copy.
    pub note_root: String,
    /// Directory holding `mnemo.db` and `vectors.db`. Relative paths are
    /// resolved against the working copy.
    pub data_dir: PathBuf,
    /// Explicit project id, bypassing detection.
    pub project: Option<String>,
    pub search: SearchConfig,
}

impl Default for MnemoConfig {
    fn default() -> Self {
        Self {
            note_root: "notes".to_string(),
            data_dir: PathBuf::from(CONFIG_DIR),
            project: None,
            search: SearchConfig::default(),
        }
    }
}

/// Retrieval tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Added to the best score of a hit found by both sub-searches.
    pub hybrid_bonus: f64,
    /// Minimum number of nearest neighbours requested from the vector index.
    pub vector_candidates: usize,
    pub vector_enabled: bool,
    /// Decay rate turning full-text ranks into `[0, 1)` scores.
    pub rank_decay: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hybrid_bonus: 0.1,
            vector_candidates: 100,
            vector_enabled: true,
            rank_decay: 0.3,
        }
    }
}

impl MnemoConfig {
    /// Load the configuration of a working copy, falling back to defaults
    /// when no config file exists.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Config`] if the file exists but is not valid
    /// TOML for this schema, or [`MnemoError::Io`] if it cannot be read.
    pub fn load(working_copy: &Path) -> Result<Self, MnemoError> {
        let path = working_copy.join(CONFIG_DIR).join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        Self::from_toml(&text).map_err(|e| match e {
            MnemoError::Config(msg) => MnemoError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Config`] on invalid TOML.
    pub fn from_toml(text: &str) -> Result<Self, MnemoError> {
        toml::from_str(text).map_err(|e| MnemoError::Config(e.to_string()))
    }

    #[must_use]
    pub fn layout(&self, working_copy: &Path) -> NoteLayout {
        NoteLayout::new(working_copy, self.note_root.clone())
    }

    #[must_use]
    pub fn data_dir(&self, working_copy: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            working_copy.join(&self.data_dir)
        }
    }

    #[must_use]
    pub fn store_path(&self, working_copy: &Path) -> PathBuf {
        self.data_dir(working_copy).join("mnemo.db")
    }

    #[must_use]
    pub fn vector_path(&self, working_copy: &Path) -> PathBuf {
        self.data_dir(working_copy).join("vectors.db")
    }
}

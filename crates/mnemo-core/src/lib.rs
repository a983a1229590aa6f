//! # mnemo-core
//!
//! Core types for the mnemo knowledge store.
//!
//! This crate defines the foundational pieces shared by all other crates:
//! - [`Document`]: the indexed record of a note, with [`Category`],
//!   [`ProjectId`] scope and soft [`Supersession`]
//! - Error hierarchy ([`MnemoError`])
//! - Front-matter tagging ([`frontmatter`])
//! - Note layout and the category table ([`layout`])
//! - [`TreeWalk`]: symlink-free traversal of note and vault trees
//! - [`MnemoConfig`] and the [`SettingsStore`] contract

pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod layout;
pub mod settings;
pub mod walk;

pub use config::{MnemoConfig, SearchConfig};
pub use document::{document_id, Category, Document, ProjectId, Supersession};
pub use error::{MnemoError, Result};
pub use layout::{CategoryRule, NoteLayout, VaultScope};
pub use settings::{SettingsStore, SyncSettings};
pub use walk::{TreeWalk, WalkEntry};

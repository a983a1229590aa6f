//! # mnemo-vault
//!
//! Mirrors the note tree of a working copy into a shared, git-backed
//! vault and back.
//!
//! In the vault, notes of project-nested categories live under
//! `<category>/<project>/…` so many working copies can share one
//! repository without stepping on each other; universal categories are
//! shared as is. A sync only ever deletes vault files its own project
//! owns.

pub mod mapper;
pub mod migrate;
mod mirror;
pub mod project;
pub mod sync;
pub mod vcs;

pub use mapper::{from_vault_path, owned_by, to_vault_path};
pub use migrate::{discover_working_copies, migrate, CopyReport, MigrateMode, MigrateReport};
pub use project::{resolve_project, FixedProject, GitRemoteDetector, ProjectDetector};
pub use sync::{init_vault, PullReport, SyncReport, Synchronizer, VaultStatus};
pub use vcs::{parse_status, GitCli, Tally, VersionControl};

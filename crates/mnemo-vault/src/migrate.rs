//! Bulk seeding of the vault from many working copies.
//!
//! Migration only adds and updates vault files. It never deletes, since
//! one copy's missing note may be another copy's universal note.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use mnemo_core::{MnemoConfig, MnemoError, ProjectId, SettingsStore, SyncSettings};

use crate::mirror::MirrorPlan;
use crate::project::{resolve_project, ProjectDetector};
use crate::sync::{commit_and_push, open_vault, timestamp};
use crate::vcs::{parse_status, Tally, VersionControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrateMode {
    /// Report what each copy holds.
    List,
    /// Predict the vault tally without writing.
    DryRun,
    /// Mirror every copy and commit once.
    Apply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub path: PathBuf,
    pub project: Option<ProjectId>,
    pub notes: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    pub mode: MigrateMode,
    pub copies: Vec<CopyReport>,
    pub tally: Tally,
    pub committed: bool,
}

fn has_note_tree(dir: &Path) -> bool {
    match MnemoConfig::load(dir) {
        Ok(config) => config.layout(dir).note_dir().is_dir(),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "ignoring directory with unreadable config");
            false
        }
    }
}

/// Directories under `parent` (up to `max_depth` levels deep, `parent`
/// included) that contain a note tree. Hidden directories are skipped,
/// symlinks are not followed, and found copies are not searched further.
#[must_use]
pub fn discover_working_copies(parent: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut walk = WalkDir::new(parent)
        .max_depth(max_depth)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walk.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.') {
            walk.skip_current_dir();
            continue;
        }
        if has_note_tree(entry.path()) {
            found.push(entry.into_path());
            walk.skip_current_dir();
        }
    }
    found
}

/// Seed the vault from `copies`.
///
/// Per-copy problems (bad config, undetectable project) are reported on
/// that copy and do not stop the migration.
///
/// # Errors
///
/// `DryRun` and `Apply` fail with a configuration error when no vault is
/// set up. `Apply` propagates write and version control failures.
pub fn migrate(
    copies: &[PathBuf],
    mode: MigrateMode,
    settings: &dyn SettingsStore,
    vcs: &dyn VersionControl,
    detector: &dyn ProjectDetector,
) -> Result<MigrateReport, MnemoError> {
    let vault = match mode {
        MigrateMode::List => None,
        MigrateMode::DryRun | MigrateMode::Apply => {
            Some(open_vault(&SyncSettings::load(settings)?)?)
        }
    };

    let mut combined = MirrorPlan::default();
    let mut reports = Vec::with_capacity(copies.len());
    for copy in copies {
        let mut report = CopyReport {
            path: copy.clone(),
            project: None,
            notes: 0,
            skipped: 0,
            warning: None,
        };

        let resolved = MnemoConfig::load(copy).and_then(|config| {
            let project = resolve_project(config.project.as_deref(), detector, copy)?;
            Ok((config, project))
        });
        let (config, project) = match resolved {
            Ok(pair) => pair,
            Err(e) => {
                warn!(path = %copy.display(), error = %e, "skipping working copy");
                report.warning = Some(e.to_string());
                reports.push(report);
                continue;
            }
        };
        if project.is_none() {
            report.warning = Some("no project detected; project-nested notes skipped".to_string());
        }

        let plan = MirrorPlan::build(&config.layout(copy).note_dir(), project.as_ref());
        report.project = project;
        report.notes = plan.files.len();
        report.skipped = plan.skipped;
        reports.push(report);
        combined.extend(plan);
    }

    let mut result = MigrateReport {
        mode,
        copies: reports,
        tally: Tally::default(),
        committed: false,
    };

    let Some(vault) = vault else {
        return Ok(result);
    };
    if mode == MigrateMode::DryRun {
        result.tally = combined.predict(&vault);
        return Ok(result);
    }

    combined.write(&vault)?;
    result.tally = parse_status(&vcs.status_porcelain(&vault)?);
    if result.tally.is_empty() {
        return Ok(result);
    }

    let now = Utc::now();
    let message = format!(
        "mnemo migrate {}: +{} ~{} -{} [{} working copies]",
        timestamp(now),
        result.tally.added,
        result.tally.modified,
        result.tally.deleted,
        result.copies.len(),
    );
    commit_and_push(vcs, settings, &vault, &message, now)?;
    result.committed = true;
    info!(copies = result.copies.len(), added = result.tally.added, "vault seeded");
    Ok(result)
}

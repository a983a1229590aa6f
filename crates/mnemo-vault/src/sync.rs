//! The vault synchronizer: init, sync, pull and status.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use mnemo_core::settings::{KEY_VAULT_ENABLED, KEY_VAULT_PATH, KEY_VAULT_REPO};
use mnemo_core::{MnemoError, NoteLayout, ProjectId, SettingsStore, SyncSettings, TreeWalk};

use crate::mapper::from_vault_path;
use crate::mirror::{remove_stale, MirrorPlan};
use crate::project::ProjectDetector;
use crate::vcs::{parse_status, Tally, VersionControl};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub project: Option<ProjectId>,
    /// Notes mapped into the vault.
    pub files_mirrored: usize,
    /// Vault files whose bytes actually changed.
    pub written: usize,
    pub skipped: usize,
    /// Stale vault files deleted, or that would be deleted on a dry run.
    pub removed: usize,
    pub tally: Tally,
    pub dry_run: bool,
    pub committed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub project: ProjectId,
    pub copied: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultStatus {
    pub configured: bool,
    pub enabled: bool,
    pub vault_repo: Option<String>,
    pub vault_path: Option<PathBuf>,
    pub last_sync: Option<DateTime<Utc>>,
    pub project: Option<ProjectId>,
    /// Uncommitted vault changes. Zero when status could not be read.
    pub pending: Tally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Clone `repo` into `dest` (unless `dest` already is a work tree) and
/// persist it as the vault of this store.
///
/// # Errors
///
/// Returns [`MnemoError::Vault`] if `dest` is a non-empty directory that
/// is not a work tree, and propagates clone and settings failures.
pub fn init_vault(
    settings: &dyn SettingsStore,
    vcs: &dyn VersionControl,
    repo: &str,
    dest: &Path,
) -> Result<SyncSettings, MnemoError> {
    if vcs.is_work_tree(dest) {
        info!(path = %dest.display(), "using existing vault checkout");
    } else {
        if dest.is_dir() && fs::read_dir(dest)?.next().is_some() {
            return Err(MnemoError::Vault(format!(
                "{} exists and is not a git work tree",
                dest.display()
            )));
        }
        vcs.clone_repo(repo, dest)?;
        info!(repo, path = %dest.display(), "cloned vault");
    }

    settings.set_setting(KEY_VAULT_REPO, repo)?;
    settings.set_setting(KEY_VAULT_PATH, &dest.to_string_lossy())?;
    settings.set_setting(KEY_VAULT_ENABLED, "true")?;
    SyncSettings::load(settings)
}

/// The vault directory, if sync is configured and the checkout exists.
pub(crate) fn open_vault(settings: &SyncSettings) -> Result<PathBuf, MnemoError> {
    let vault = settings.require_vault()?;
    if !settings.enabled {
        return Err(MnemoError::NotConfigured("vault sync is disabled".to_string()));
    }
    if !vault.is_dir() {
        return Err(MnemoError::Vault(format!(
            "vault checkout {} does not exist",
            vault.display()
        )));
    }
    Ok(vault.clone())
}

/// Stage, commit and push everything pending in `vault`, then record the
/// sync time.
pub(crate) fn commit_and_push(
    vcs: &dyn VersionControl,
    settings: &dyn SettingsStore,
    vault: &Path,
    message: &str,
    at: DateTime<Utc>,
) -> Result<(), MnemoError> {
    vcs.add_all(vault)?;
    vcs.commit(vault, message)?;
    if vcs.remote_url(vault)?.is_some() {
        vcs.push(vault)?;
    } else {
        warn!(path = %vault.display(), "vault has no origin remote; committed locally only");
    }
    SyncSettings::record_sync(settings, at)
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Synchronizes one working copy with the configured vault.
pub struct Synchronizer<'a> {
    layout: &'a NoteLayout,
    settings: &'a dyn SettingsStore,
    vcs: &'a dyn VersionControl,
    detector: &'a dyn ProjectDetector,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        layout: &'a NoteLayout,
        settings: &'a dyn SettingsStore,
        vcs: &'a dyn VersionControl,
        detector: &'a dyn ProjectDetector,
    ) -> Self {
        Self {
            layout,
            settings,
            vcs,
            detector,
        }
    }

    /// Mirror the note tree into the vault, delete this copy's stale vault
    /// files, then commit and push whatever changed.
    ///
    /// Without a detected project only universal categories are synced.
    /// A dry run predicts the tally and touches nothing.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before anything is written.
    /// Filesystem and version control failures propagate.
    pub fn sync(&self, dry_run: bool) -> Result<SyncReport, MnemoError> {
        let settings = SyncSettings::load(self.settings)?;
        let vault = open_vault(&settings)?;
        let project = self.detector.detect(self.layout.working_copy())?;
        if project.is_none() {
            warn!(path = %self.layout.working_copy().display(), "no project detected; syncing universal notes only");
        }

        let plan = MirrorPlan::build(&self.layout.note_dir(), project.as_ref());
        let stale = plan.stale(&vault, project.as_ref());
        let mut report = SyncReport {
            project: project.clone(),
            files_mirrored: plan.files.len(),
            written: 0,
            skipped: plan.skipped,
            removed: stale.len(),
            tally: Tally::default(),
            dry_run,
            committed: false,
        };

        if dry_run {
            report.tally = plan.predict(&vault);
            report.tally.deleted += stale.len();
            return Ok(report);
        }

        report.written = plan.write(&vault)?;
        report.removed = remove_stale(&vault, &stale)?;
        report.tally = parse_status(&self.vcs.status_porcelain(&vault)?);
        if report.tally.is_empty() {
            debug!("vault already up to date");
            return Ok(report);
        }

        let now = Utc::now();
        let message = format!(
            "mnemo sync {}: +{} ~{} -{} [{}]",
            timestamp(now),
            report.tally.added,
            report.tally.modified,
            report.tally.deleted,
            project.as_ref().map_or("universal", ProjectId::as_str),
        );
        commit_and_push(self.vcs, self.settings, &vault, &message, now)?;
        report.committed = true;

        info!(
            project = project.as_ref().map_or("universal", ProjectId::as_str),
            added = report.tally.added,
            modified = report.tally.modified,
            deleted = report.tally.deleted,
            "vault synced"
        );
        Ok(report)
    }

    /// Copy this project's nested notes and all universal notes from the
    /// vault into the working copy.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::ProjectUndetected`] if the working copy has
    /// no project, and propagates configuration, version control and
    /// filesystem failures.
    pub fn pull(&self) -> Result<PullReport, MnemoError> {
        let settings = SyncSettings::load(self.settings)?;
        let vault = open_vault(&settings)?;
        let working_copy = self.layout.working_copy();
        let project = self.detector.detect(working_copy)?.ok_or_else(|| {
            MnemoError::ProjectUndetected(format!(
                "{}: set `project` in .mnemo/config.toml or add an origin remote",
                working_copy.display()
            ))
        })?;

        if self.vcs.remote_url(&vault)?.is_some() {
            self.vcs.pull(&vault)?;
        }

        let note_dir = self.layout.note_dir();
        let mut report = PullReport {
            project: project.clone(),
            copied: 0,
            unchanged: 0,
        };
        // Hidden entries cover `.git` and `.gitkeep` placeholders.
        for entry in TreeWalk::new(&vault).skip_hidden(true).entries() {
            let Some(local) = from_vault_path(&entry.relative, &project) else {
                continue;
            };
            let bytes = match fs::read(&entry.absolute) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %entry.relative, error = %e, "skipping unreadable vault file");
                    continue;
                }
            };

            let dest = note_dir.join(&local);
            if fs::read(&dest).is_ok_and(|existing| existing == bytes) {
                report.unchanged += 1;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, &bytes)?;
            debug!(path = %local, "pulled note");
            report.copied += 1;
        }

        info!(project = %project, copied = report.copied, "vault pulled");
        Ok(report)
    }

    /// Configuration plus a best-effort count of uncommitted vault
    /// changes. Never mutates anything.
    ///
    /// # Errors
    ///
    /// Only fails if the stored settings cannot be read.
    pub fn status(&self) -> Result<VaultStatus, MnemoError> {
        let settings = SyncSettings::load(self.settings)?;
        let mut warning = None;

        let project = match self.detector.detect(self.layout.working_copy()) {
            Ok(project) => project,
            Err(e) => {
                warning = Some(format!("project detection failed: {e}"));
                None
            }
        };

        let mut pending = Tally::default();
        if let Some(vault) = &settings.vault_path {
            match self.vcs.status_porcelain(vault) {
                Ok(out) => pending = parse_status(&out),
                Err(e) => {
                    warn!(path = %vault.display(), error = %e, "vault status unavailable");
                    warning = Some(format!("pending changes unknown: {e}"));
                }
            }
        }

        Ok(VaultStatus {
            configured: settings.vault_path.is_some(),
            enabled: settings.enabled,
            vault_repo: settings.vault_repo,
            vault_path: settings.vault_path,
            last_sync: settings.last_sync,
            project,
            pending,
            warning,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::project::FixedProject;
    use mnemo_index::DocumentStore;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// A [`VersionControl`] that replays a fixed status and records calls.
    #[derive(Default)]
    pub(crate) struct ScriptedVcs {
        pub status: String,
        pub remote: Option<String>,
        pub fail_status: bool,
        pub calls: RefCell<Vec<String>>,
    }

    impl ScriptedVcs {
        pub(crate) fn with_status(status: &str) -> Self {
            Self {
                status: status.to_string(),
                remote: Some("git@example.com:me/vault.git".to_string()),
                ..Self::default()
            }
        }

        pub(crate) fn called(&self, prefix: &str) -> bool {
            self.calls.borrow().iter().any(|c| c.starts_with(prefix))
        }
    }

    impl VersionControl for ScriptedVcs {
        fn clone_repo(&self, repo: &str, dest: &Path) -> Result<(), MnemoError> {
            fs::create_dir_all(dest.join(".git"))?;
            self.calls.borrow_mut().push(format!("clone {repo}"));
            Ok(())
        }

        fn is_work_tree(&self, dir: &Path) -> bool {
            dir.join(".git").is_dir()
        }

        fn status_porcelain(&self, _dir: &Path) -> Result<String, MnemoError> {
            if self.fail_status {
                return Err(MnemoError::Vcs("fatal: not a git repository".to_string()));
            }
            Ok(self.status.clone())
        }

        fn add_all(&self, _dir: &Path) -> Result<(), MnemoError> {
            self.calls.borrow_mut().push("add".to_string());
            Ok(())
        }

        fn commit(&self, _dir: &Path, message: &str) -> Result<(), MnemoError> {
            self.calls.borrow_mut().push(format!("commit {message}"));
            Ok(())
        }

        fn push(&self, _dir: &Path) -> Result<(), MnemoError> {
            self.calls.borrow_mut().push("push".to_string());
            Ok(())
        }

        fn pull(&self, _dir: &Path) -> Result<(), MnemoError> {
            self.calls.borrow_mut().push("pull".to_string());
            Ok(())
        }

        fn remote_url(&self, _dir: &Path) -> Result<Option<String>, MnemoError> {
            Ok(self.remote.clone())
        }
    }

    pub(crate) fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub(crate) fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    pub(crate) fn configured_store(vault: &Path) -> DocumentStore {
        let store = DocumentStore::in_memory().unwrap();
        store.set_setting(KEY_VAULT_PATH, &vault.to_string_lossy()).unwrap();
        store.set_setting(KEY_VAULT_ENABLED, "true").unwrap();
        store
    }

    struct Fixture {
        wc: TempDir,
        vault: TempDir,
        layout: NoteLayout,
        store: DocumentStore,
    }

    fn fixture() -> Fixture {
        let wc = TempDir::new().unwrap();
        let vault = TempDir::new().unwrap();
        let layout = NoteLayout::new(wc.path(), "notes");
        let store = configured_store(vault.path());
        Fixture {
            wc,
            vault,
            layout,
            store,
        }
    }

    fn alpha() -> FixedProject {
        FixedProject(Some(ProjectId::new("alpha").unwrap()))
    }

    #[test]
    fn sync_without_vault_fails_before_touching_anything() {
        let f = fixture();
        let store = DocumentStore::in_memory().unwrap();
        write(f.wc.path(), "notes/principles/p.md", "p");
        let vcs = ScriptedVcs::with_status("?? x\n");
        let detector = alpha();

        let err = Synchronizer::new(&f.layout, &store, &vcs, &detector)
            .sync(false)
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(vcs.calls.borrow().is_empty());
        assert!(!f.vault.path().join("principles").exists());
    }

    #[test]
    fn sync_mirrors_tags_and_commits() {
        let f = fixture();
        write(f.wc.path(), "notes/learnings/rust/a.md", "# A\n");
        write(f.wc.path(), "notes/principles/p.md", "---\ntitle: P\n---\nbody\n");
        let vcs = ScriptedVcs::with_status("?? learnings/alpha/rust/a.md\n M principles/p.md\n D principles/old.md\n");
        let detector = alpha();

        let report = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(false)
            .unwrap();

        assert_eq!(
            report.tally,
            Tally {
                added: 1,
                modified: 1,
                deleted: 1
            }
        );
        assert!(report.committed);
        assert_eq!(report.files_mirrored, 2);
        assert_eq!(report.written, 2);
        assert_eq!(
            read(f.vault.path(), "learnings/alpha/rust/a.md"),
            "---\nproject: alpha\n---\n# A\n"
        );
        assert_eq!(read(f.vault.path(), "principles/p.md"), "---\ntitle: P\n---\nbody\n");

        let calls = vcs.calls.borrow();
        assert_eq!(calls[0], "add");
        assert!(calls[1].starts_with("commit mnemo sync "));
        assert!(calls[1].ends_with(": +1 ~1 -1 [alpha]"));
        assert_eq!(calls[2], "push");
        assert!(SyncSettings::load(&f.store).unwrap().last_sync.is_some());
    }

    #[test]
    fn sync_never_deletes_other_projects_files() {
        let f = fixture();
        write(f.wc.path(), "notes/learnings/a.md", "a");
        write(f.vault.path(), "learnings/beta/b.md", "beta's");
        write(f.vault.path(), "learnings/alpha/stale/old.md", "old");
        write(f.vault.path(), "principles/gone.md", "gone");
        write(f.vault.path(), "README.md", "readme");
        write(f.vault.path(), ".git/HEAD", "ref: refs/heads/main");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();

        let report = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(false)
            .unwrap();

        assert_eq!(report.removed, 2);
        assert_eq!(read(f.vault.path(), "learnings/beta/b.md"), "beta's");
        assert!(f.vault.path().join("README.md").exists());
        assert!(f.vault.path().join(".git/HEAD").exists());
        assert!(!f.vault.path().join("learnings/alpha/stale").exists());
        assert!(!f.vault.path().join("principles").exists());
        assert!(f.vault.path().join("learnings/alpha/a.md").exists());
    }

    #[test]
    fn dry_run_predicts_without_writing() {
        let f = fixture();
        write(f.wc.path(), "notes/learnings/new.md", "new");
        write(f.wc.path(), "notes/patterns/same.md", "same");
        write(f.wc.path(), "notes/patterns/edited.md", "v2");
        write(f.vault.path(), "patterns/same.md", "same");
        write(f.vault.path(), "patterns/edited.md", "v1");
        write(f.vault.path(), "patterns/dropped.md", "x");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();

        let report = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(true)
            .unwrap();

        assert_eq!(
            report.tally,
            Tally {
                added: 1,
                modified: 1,
                deleted: 1
            }
        );
        assert!(!report.committed);
        assert!(!f.vault.path().join("learnings").exists());
        assert!(f.vault.path().join("patterns/dropped.md").exists());
        assert_eq!(read(f.vault.path(), "patterns/edited.md"), "v1");
        assert!(vcs.calls.borrow().is_empty());
    }

    #[test]
    fn clean_vault_is_not_committed() {
        let f = fixture();
        write(f.wc.path(), "notes/principles/p.md", "p");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();

        let report = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(false)
            .unwrap();
        assert!(!report.committed);
        assert!(!vcs.called("commit"));
        assert!(SyncSettings::load(&f.store).unwrap().last_sync.is_none());
    }

    #[test]
    fn undetected_project_syncs_universal_notes_only() {
        let f = fixture();
        write(f.wc.path(), "notes/learnings/a.md", "a");
        write(f.wc.path(), "notes/principles/p.md", "p");
        write(f.vault.path(), "learnings/alpha/kept.md", "kept");
        let vcs = ScriptedVcs::with_status("");
        let detector = FixedProject(None);

        let report = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(false)
            .unwrap();
        assert_eq!(report.project, None);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.files_mirrored, 1);
        assert!(f.vault.path().join("principles/p.md").exists());
        assert!(f.vault.path().join("learnings/alpha/kept.md").exists());
    }

    #[test]
    fn malformed_front_matter_is_skipped() {
        let f = fixture();
        write(f.wc.path(), "notes/learnings/bad.md", "---\ntitle: never closed\n");
        write(f.wc.path(), "notes/learnings/good.md", "fine");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();

        let report = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(false)
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert!(!f.vault.path().join("learnings/alpha/bad.md").exists());
        assert!(f.vault.path().join("learnings/alpha/good.md").exists());
    }

    #[test]
    fn note_broken_after_sync_keeps_its_vault_copy() {
        let f = fixture();
        write(f.wc.path(), "notes/learnings/n.md", "---\ntitle: n\n---\nbody\n");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();
        let sync = Synchronizer::new(&f.layout, &f.store, &vcs, &detector);

        sync.sync(false).unwrap();
        assert!(f.vault.path().join("learnings/alpha/n.md").exists());

        write(f.wc.path(), "notes/learnings/n.md", "---\ntitle: never closed\n");
        let report = sync.sync(false).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(
            read(f.vault.path(), "learnings/alpha/n.md"),
            "---\ntitle: n\nproject: alpha\n---\nbody\n"
        );

        let dry = sync.sync(true).unwrap();
        assert_eq!(dry.tally.deleted, 0);
    }

    #[test]
    fn existing_project_field_is_respected() {
        let f = fixture();
        write(f.wc.path(), "notes/handoffs/h.md", "---\nproject: legacy\n---\nnote\n");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();

        Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .sync(false)
            .unwrap();
        assert_eq!(
            read(f.vault.path(), "handoffs/alpha/h.md"),
            "---\nproject: legacy\n---\nnote\n"
        );
    }

    #[test]
    fn pull_copies_own_and_universal_notes() {
        let f = fixture();
        write(f.vault.path(), "learnings/alpha/x.md", "mine");
        write(f.vault.path(), "learnings/beta/y.md", "theirs");
        write(f.vault.path(), "principles/p.md", "shared");
        write(f.vault.path(), "principles/.gitkeep", "");
        write(f.vault.path(), "README.md", "readme");
        let vcs = ScriptedVcs::with_status("");
        let detector = alpha();
        let sync = Synchronizer::new(&f.layout, &f.store, &vcs, &detector);

        let report = sync.pull().unwrap();
        assert_eq!(report.copied, 2);
        assert!(vcs.called("pull"));
        assert_eq!(read(f.wc.path(), "notes/learnings/x.md"), "mine");
        assert_eq!(read(f.wc.path(), "notes/principles/p.md"), "shared");
        assert!(!f.wc.path().join("notes/learnings/y.md").exists());
        assert!(!f.wc.path().join("notes/principles/.gitkeep").exists());
        assert!(!f.wc.path().join("notes/README.md").exists());

        let again = sync.pull().unwrap();
        assert_eq!((again.copied, again.unchanged), (0, 2));
    }

    #[test]
    fn pull_requires_a_project() {
        let f = fixture();
        let vcs = ScriptedVcs::with_status("");
        let detector = FixedProject(None);
        let err = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .pull()
            .unwrap_err();
        assert!(matches!(err, MnemoError::ProjectUndetected(_)));
        assert!(!vcs.called("pull"));
    }

    #[test]
    fn status_swallows_version_control_failures() {
        let f = fixture();
        let vcs = ScriptedVcs {
            fail_status: true,
            ..ScriptedVcs::default()
        };
        let detector = alpha();

        let status = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .status()
            .unwrap();
        assert!(status.configured);
        assert!(status.pending.is_empty());
        assert!(status.warning.unwrap().contains("not a git repository"));
    }

    #[test]
    fn status_reports_pending_and_unconfigured() {
        let f = fixture();
        let vcs = ScriptedVcs::with_status(" M principles/p.md\n?? patterns/n.md\n");
        let detector = alpha();
        let status = Synchronizer::new(&f.layout, &f.store, &vcs, &detector)
            .status()
            .unwrap();
        assert_eq!(status.pending.added, 1);
        assert_eq!(status.pending.modified, 1);
        assert_eq!(status.project.unwrap().as_str(), "alpha");

        let empty = DocumentStore::in_memory().unwrap();
        let status = Synchronizer::new(&f.layout, &empty, &vcs, &detector)
            .status()
            .unwrap();
        assert!(!status.configured);
        assert!(status.warning.is_none());
    }

    #[test]
    fn init_clones_and_persists_settings() {
        let parent = TempDir::new().unwrap();
        let dest = parent.path().join("vault");
        let store = DocumentStore::in_memory().unwrap();
        let vcs = ScriptedVcs::default();

        let settings = init_vault(&store, &vcs, "git@example.com:me/vault.git", &dest).unwrap();
        assert!(vcs.called("clone git@example.com:me/vault.git"));
        assert!(settings.enabled);
        assert_eq!(settings.vault_path.as_deref(), Some(dest.as_path()));

        // A second init reuses the checkout.
        init_vault(&store, &vcs, "git@example.com:me/vault.git", &dest).unwrap();
        assert_eq!(vcs.calls.borrow().len(), 1);
    }

    #[test]
    fn init_refuses_non_empty_foreign_directory() {
        let dest = TempDir::new().unwrap();
        write(dest.path(), "notes.txt", "mine");
        let store = DocumentStore::in_memory().unwrap();
        let err = init_vault(&store, &ScriptedVcs::default(), "repo", dest.path()).unwrap_err();
        assert!(matches!(err, MnemoError::Vault(_)));
    }
}

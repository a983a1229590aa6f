//! Version control seam.
//!
//! The synchronizer only talks to git through [`VersionControl`], so tests
//! can script it. [`GitCli`] shells out to the `git` binary.

use std::path::Path;
use std::process::Command;

use serde::Serialize;
use tracing::debug;

use mnemo_core::MnemoError;

pub trait VersionControl {
    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] if cloning fails.
    fn clone_repo(&self, repo: &str, dest: &Path) -> Result<(), MnemoError>;

    fn is_work_tree(&self, dir: &Path) -> bool;

    /// Machine-readable status including untracked files.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] if status cannot be read.
    fn status_porcelain(&self, dir: &Path) -> Result<String, MnemoError>;

    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] on failure.
    fn add_all(&self, dir: &Path) -> Result<(), MnemoError>;

    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] on failure.
    fn commit(&self, dir: &Path, message: &str) -> Result<(), MnemoError>;

    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] on failure.
    fn push(&self, dir: &Path) -> Result<(), MnemoError>;

    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] on failure.
    fn pull(&self, dir: &Path) -> Result<(), MnemoError>;

    /// URL of the `origin` remote, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vcs`] if `dir` is not a repository.
    fn remote_url(&self, dir: &Path) -> Result<Option<String>, MnemoError>;
}

/// Pending changes derived from status codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl Tally {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.modified == 0 && self.deleted == 0
    }
}

/// Tally `git status --porcelain` output.
///
/// The two-character code decides: `A` or untracked (`??`) is an
/// addition, otherwise `D` a deletion, otherwise `M` or `R` a
/// modification. Other codes are ignored.
#[must_use]
pub fn parse_status(porcelain: &str) -> Tally {
    let mut tally = Tally::default();
    for line in porcelain.lines() {
        let Some(code) = line.get(..2) else {
            continue;
        };
        if code.contains('A') || code == "??" {
            tally.added += 1;
        } else if code.contains('D') {
            tally.deleted += 1;
        } else if code.contains('M') || code.contains('R') {
            tally.modified += 1;
        }
    }
    tally
}

/// [`VersionControl`] backed by the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

fn git(dir: Option<&Path>, args: &[&str]) -> Result<String, MnemoError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    debug!(?args, "running git");

    let output = cmd
        .output()
        .map_err(|e| MnemoError::Vcs(format!("failed to execute git (is it installed?): {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MnemoError::Vcs(format!(
            "git {} failed: {}",
            args.first().copied().unwrap_or_default(),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl VersionControl for GitCli {
    fn clone_repo(&self, repo: &str, dest: &Path) -> Result<(), MnemoError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dest = dest.to_string_lossy();
        git(None, &["clone", repo, dest.as_ref()])?;
        Ok(())
    }

    fn is_work_tree(&self, dir: &Path) -> bool {
        dir.is_dir()
            && git(Some(dir), &["rev-parse", "--is-inside-work-tree"])
                .is_ok_and(|out| out.trim() == "true")
    }

    fn status_porcelain(&self, dir: &Path) -> Result<String, MnemoError> {
        git(Some(dir), &["status", "--porcelain", "-uall"])
    }

    fn add_all(&self, dir: &Path) -> Result<(), MnemoError> {
        git(Some(dir), &["add", "--all"]).map(drop)
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<(), MnemoError> {
        git(Some(dir), &["commit", "--quiet", "-m", message]).map(drop)
    }

    fn push(&self, dir: &Path) -> Result<(), MnemoError> {
        git(Some(dir), &["push", "--quiet"]).map(drop)
    }

    fn pull(&self, dir: &Path) -> Result<(), MnemoError> {
        git(Some(dir), &["pull", "--ff-only", "--quiet"]).map(drop)
    }

    fn remote_url(&self, dir: &Path) -> Result<Option<String>, MnemoError> {
        let remotes = git(Some(dir), &["remote"])?;
        if !remotes.lines().any(|r| r.trim() == "origin") {
            return Ok(None);
        }
        let url = git(Some(dir), &["remote", "get-url", "origin"])?;
        let url = url.trim();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }
}

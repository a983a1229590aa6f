//! Computing and applying the vault image of a note tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use mnemo_core::frontmatter::{ensure_project, ProjectTag};
use mnemo_core::layout::{rule_for_path, VaultScope};
use mnemo_core::{MnemoError, ProjectId, TreeWalk};

use crate::mapper::{owned_by, to_vault_path};
use crate::vcs::Tally;

/// The vault files a note tree should produce, keyed by vault-relative
/// path.
#[derive(Debug, Default)]
pub(crate) struct MirrorPlan {
    pub files: BTreeMap<String, Vec<u8>>,
    pub skipped: usize,
    /// Destinations of notes skipped for a data error. Their vault copies
    /// are left alone rather than treated as stale.
    pub held: BTreeSet<String>,
}

impl MirrorPlan {
    /// Walk `note_dir` (never following symlinks) and render every note
    /// for the vault. Unreadable notes and malformed front-matter are
    /// skipped and counted, as are project-nested notes when `project`
    /// is `None`.
    pub fn build(note_dir: &Path, project: Option<&ProjectId>) -> Self {
        let mut plan = Self::default();
        for entry in TreeWalk::new(note_dir).skip_hidden(true).entries() {
            let nested = rule_for_path(&entry.relative).is_some_and(|r| r.scope == VaultScope::Nested);
            let (dest, tag) = match (nested, project) {
                (true, Some(p)) => (to_vault_path(&entry.relative, p), Some(p)),
                (true, None) => {
                    warn!(path = %entry.relative, "no project detected; skipping project-nested note");
                    plan.skipped += 1;
                    continue;
                }
                (false, _) => (entry.relative.clone(), None),
            };

            match render(&entry.absolute, tag) {
                Ok(bytes) => {
                    plan.files.insert(dest, bytes);
                }
                Err(e) => {
                    warn!(path = %entry.relative, error = %e, "skipping note");
                    plan.skipped += 1;
                    plan.held.insert(dest);
                }
            }
        }
        plan
    }

    pub fn extend(&mut self, other: MirrorPlan) {
        self.files.extend(other.files);
        self.skipped += other.skipped;
        self.held.extend(other.held);
    }

    /// Additions and modifications writing this plan would cause.
    pub fn predict(&self, vault: &Path) -> Tally {
        let mut tally = Tally::default();
        for (rel, bytes) in &self.files {
            match fs::read(vault.join(rel)) {
                Ok(existing) if existing == *bytes => {}
                Ok(_) => tally.modified += 1,
                Err(_) => tally.added += 1,
            }
        }
        tally
    }

    /// Write every planned file whose bytes differ from the vault copy.
    /// Returns the number of files written.
    pub fn write(&self, vault: &Path) -> Result<usize, MnemoError> {
        let mut written = 0;
        for (rel, bytes) in &self.files {
            let path = vault.join(rel);
            if fs::read(&path).is_ok_and(|existing| existing == *bytes) {
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, bytes)?;
            debug!(path = %rel, "wrote vault file");
            written += 1;
        }
        Ok(written)
    }

    /// Vault files owned by `project` that this plan no longer produces.
    /// Files held back by a skipped note are never stale.
    pub fn stale(&self, vault: &Path, project: Option<&ProjectId>) -> Vec<String> {
        TreeWalk::new(vault)
            .skip_hidden(true)
            .entries()
            .filter(|e| {
                owned_by(&e.relative, project)
                    && !self.files.contains_key(&e.relative)
                    && !self.held.contains(&e.relative)
            })
            .map(|e| e.relative)
            .collect()
    }
}

/// Note bytes as they should appear in the vault. Markdown notes in a
/// project-nested category get a `project` front-matter field.
fn render(path: &Path, tag: Option<&ProjectId>) -> Result<Vec<u8>, MnemoError> {
    let is_markdown = path.extension().and_then(|e| e.to_str()) == Some("md");
    match tag {
        Some(project) if is_markdown => {
            let text = fs::read_to_string(path)?;
            let (tagged, outcome) = ensure_project(&text, project)?;
            if outcome != ProjectTag::Present {
                debug!(path = %path.display(), ?outcome, "tagged note with project");
            }
            Ok(tagged.into_owned().into_bytes())
        }
        _ => Ok(fs::read(path)?),
    }
}

/// Delete `stale` vault files and prune directories they leave empty,
/// stopping at the vault root. Returns the number of files deleted.
pub(crate) fn remove_stale(vault: &Path, stale: &[String]) -> Result<usize, MnemoError> {
    let mut removed = 0;
    for rel in stale {
        let path = vault.join(rel);
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
        debug!(path = %rel, "removed stale vault file");

        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == vault || !d.starts_with(vault) || fs::read_dir(d)?.next().is_some() {
                break;
            }
            fs::remove_dir(d)?;
            dir = d.parent();
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn plan_tags_nested_markdown_only() {
        let notes = TempDir::new().unwrap();
        write(notes.path(), "learnings/a.md", "# A\n");
        write(notes.path(), "learnings/diagram.svg", "<svg/>");
        write(notes.path(), "principles/p.md", "# P\n");
        write(notes.path(), ".DS_Store", "junk");

        let acme = ProjectId::new("acme").unwrap();
        let plan = MirrorPlan::build(notes.path(), Some(&acme));

        let keys: Vec<&str> = plan.files.keys().map(String::as_str).collect();
        assert_eq!(keys, ["learnings/acme/a.md", "learnings/acme/diagram.svg", "principles/p.md"]);
        assert_eq!(plan.files["learnings/acme/a.md"], b"---\nproject: acme\n---\n# A\n");
        assert_eq!(plan.files["learnings/acme/diagram.svg"], b"<svg/>");
        assert_eq!(plan.files["principles/p.md"], b"# P\n");
    }

    #[test]
    fn write_skips_identical_files() {
        let notes = TempDir::new().unwrap();
        let vault = TempDir::new().unwrap();
        write(notes.path(), "patterns/x.md", "x");

        let plan = MirrorPlan::build(notes.path(), None);
        assert_eq!(plan.predict(vault.path()).added, 1);
        assert_eq!(plan.write(vault.path()).unwrap(), 1);
        assert!(plan.predict(vault.path()).is_empty());
        assert_eq!(plan.write(vault.path()).unwrap(), 0);
    }

    #[test]
    fn skipped_note_holds_its_vault_copy() {
        let notes = TempDir::new().unwrap();
        let vault = TempDir::new().unwrap();
        write(notes.path(), "learnings/n.md", "---\ntitle: open\n");
        write(vault.path(), "learnings/acme/n.md", "---\nproject: acme\n---\nold\n");
        write(vault.path(), "learnings/acme/gone.md", "gone");

        let acme = ProjectId::new("acme").unwrap();
        let plan = MirrorPlan::build(notes.path(), Some(&acme));
        assert_eq!(plan.skipped, 1);
        assert!(plan.held.contains("learnings/acme/n.md"));
        assert_eq!(plan.stale(vault.path(), Some(&acme)), ["learnings/acme/gone.md"]);
    }

    #[test]
    fn removal_prunes_empty_directories_up_to_root() {
        let vault = TempDir::new().unwrap();
        write(vault.path(), "learnings/acme/deep/er/old.md", "old");
        write(vault.path(), "learnings/acme/keep.md", "keep");

        let removed = remove_stale(vault.path(), &["learnings/acme/deep/er/old.md".to_string()]).unwrap();
        assert_eq!(removed, 1);
        assert!(!vault.path().join("learnings/acme/deep").exists());
        assert!(vault.path().join("learnings/acme/keep.md").exists());

        let removed = remove_stale(vault.path(), &["learnings/acme/keep.md".to_string()]).unwrap();
        assert_eq!(removed, 1);
        assert!(!vault.path().join("learnings").exists());
        assert!(vault.path().exists());
    }
}

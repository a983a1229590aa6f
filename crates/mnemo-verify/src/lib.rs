//! # mnemo-verify
//!
//! Integrity checks between the note tree and the document store.
//!
//! Every note under an indexed category directory is classified against
//! the records that share its `source_path`:
//!
//! - **missing**: no record at all
//! - **drifted**: the file was modified after the newest record was indexed
//! - **healthy**: otherwise
//!
//! Record groups whose file no longer exists on disk are **orphaned**.
//! Findings are the normal product of a check, not errors. With `fix`,
//! orphans are marked superseded; rows are never deleted.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use mnemo_core::layout::{rule_for_category, CategoryRule, CATEGORY_RULES, UNINDEXED_PREFIX};
use mnemo_core::{Category, MnemoError, NoteLayout, Supersession, TreeWalk};
use mnemo_index::DocumentStore;

/// Supersession marker set on orphaned records by a fix.
pub const ORPHAN_MARKER: &str = "_orphaned";
pub const ORPHAN_REASON: &str = "source file no longer exists";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub healthy: usize,
    pub missing: usize,
    pub orphaned: usize,
    pub drifted: usize,
    /// Notes in the unindexed area. Informational only.
    pub untracked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub counts: Counts,
    pub missing: Vec<String>,
    pub orphaned: Vec<String>,
    pub drifted: Vec<String>,
    /// Records marked superseded by this run.
    pub fixed: usize,
    pub recommendation: String,
}

/// Records sharing one source path.
#[derive(Debug, Default)]
struct Group {
    latest: Option<DateTime<Utc>>,
    active: Vec<String>,
}

fn modified_at(path: &Path) -> std::io::Result<DateTime<Utc>> {
    Ok(DateTime::<Utc>::from(fs::metadata(path)?.modified()?))
}

/// Markdown notes under the indexed category directories, keyed by
/// source path, with their modification times.
fn notes_on_disk(layout: &NoteLayout, category: Option<Category>) -> BTreeMap<String, DateTime<Utc>> {
    let note_dir = layout.note_dir();
    let mut notes = BTreeMap::new();
    let rules: Vec<&CategoryRule> = match category {
        Some(c) => rule_for_category(c).into_iter().collect(),
        None => CATEGORY_RULES.iter().collect(),
    };
    for rule in rules {
        let walk = TreeWalk::new(note_dir.join(rule.prefix))
            .skip_hidden(true)
            .extension("md");
        for entry in walk.entries() {
            match modified_at(&entry.absolute) {
                Ok(mtime) => {
                    let note_path = format!("{}{}", rule.prefix, entry.relative);
                    notes.insert(layout.source_path(&note_path), mtime);
                }
                Err(e) => warn!(path = %entry.absolute.display(), error = %e, "note vanished during check"),
            }
        }
    }
    notes
}

fn untracked_count(layout: &NoteLayout) -> usize {
    TreeWalk::new(layout.note_dir().join(UNINDEXED_PREFIX))
        .skip_hidden(true)
        .extension("md")
        .entries()
        .count()
}

/// Compare the note tree of `layout` with the records in `store`.
///
/// # Errors
///
/// Returns [`MnemoError::Index`] or [`MnemoError::InvalidRecord`] if the
/// records cannot be read, or if `fix` fails to mark an orphan.
pub fn verify(
    layout: &NoteLayout,
    store: &DocumentStore,
    category: Option<Category>,
    fix: bool,
) -> Result<VerifyReport, MnemoError> {
    let checked_at = Utc::now();
    let on_disk = notes_on_disk(layout, category);

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for record in store.index_records(category)? {
        let group = groups.entry(record.source_path).or_default();
        group.latest = Some(group.latest.map_or(record.indexed_at, |t| t.max(record.indexed_at)));
        if !record.superseded {
            group.active.push(record.id);
        }
    }

    let mut counts = Counts {
        untracked: untracked_count(layout),
        ..Counts::default()
    };
    let mut missing = Vec::new();
    let mut drifted = Vec::new();
    for (path, mtime) in &on_disk {
        match groups.get(path).and_then(|g| g.latest) {
            None => missing.push(path.clone()),
            // Index timestamps are stored with millisecond precision.
            Some(latest) if mtime.timestamp_millis() > latest.timestamp_millis() => {
                drifted.push(path.clone());
            }
            Some(_) => counts.healthy += 1,
        }
    }

    // A record whose file lives outside the classified tree (the inbox, a
    // non-markdown file) is not an orphan while that file exists.
    let present: BTreeSet<&String> = on_disk.keys().collect();
    let orphans: Vec<(&String, &Group)> = groups
        .iter()
        .filter(|(path, group)| {
            !group.active.is_empty()
                && !present.contains(path)
                && !layout.working_copy().join(path.as_str()).exists()
        })
        .collect();

    let mut fixed = 0;
    if fix && !orphans.is_empty() {
        let marker = Supersession {
            by: ORPHAN_MARKER.to_string(),
            reason: ORPHAN_REASON.to_string(),
            at: checked_at,
        };
        for (_, group) in &orphans {
            fixed += store.supersede(&group.active, &marker)?;
        }
    }
    let orphaned: Vec<String> = orphans.into_iter().map(|(path, _)| path.clone()).collect();

    counts.missing = missing.len();
    counts.drifted = drifted.len();
    counts.orphaned = orphaned.len();
    let recommendation = recommend(&counts, fixed);

    info!(
        healthy = counts.healthy,
        missing = counts.missing,
        drifted = counts.drifted,
        orphaned = counts.orphaned,
        fixed,
        "verify finished"
    );

    Ok(VerifyReport {
        checked_at,
        category,
        counts,
        missing,
        orphaned,
        drifted,
        fixed,
        recommendation,
    })
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("1 {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Advice text, a pure function of the counts.
#[must_use]
pub fn recommend(counts: &Counts, fixed: usize) -> String {
    let mut advice = Vec::new();
    if counts.missing > 0 {
        advice.push(format!(
            "{} not indexed; run the indexer",
            plural(counts.missing, "note is", "notes are")
        ));
    }
    if counts.drifted > 0 {
        advice.push(format!(
            "{} changed since indexing; re-index",
            plural(counts.drifted, "note has", "notes have")
        ));
    }
    if counts.orphaned > 0 {
        let orphans = plural(counts.orphaned, "index entry has", "index entries have");
        if fixed > 0 {
            advice.push(format!(
                "{orphans} no source file; marked {} superseded",
                plural(fixed, "record", "records")
            ));
        } else {
            advice.push(format!("{orphans} no source file; run `mnemo verify --fix`"));
        }
    }

    let mut text = if advice.is_empty() {
        format!("Index is consistent: {} healthy.", plural(counts.healthy, "note", "notes"))
    } else {
        format!("{}.", advice.join("; "))
    };
    if counts.untracked > 0 {
        text.push_str(&format!(
            " {} in {UNINDEXED_PREFIX} {} not tracked.",
            plural(counts.untracked, "note", "notes"),
            if counts.untracked == 1 { "is" } else { "are" }
        ));
    }
    text
}

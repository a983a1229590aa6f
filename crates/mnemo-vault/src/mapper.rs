//! Mapping between note-root-relative paths and vault paths.
//!
//! Project-nested categories get the project id inserted as a path
//! segment right after the category prefix; everything else maps to
//! itself. Paths are `/`-separated and relative. No I/O happens here.

use mnemo_core::layout::{rule_for_path, VaultScope};
use mnemo_core::ProjectId;

/// Vault path of a local note.
///
/// `learnings/rust/async.md` for project `acme` becomes
/// `learnings/acme/rust/async.md`. Universal and unrecognized paths are
/// returned unchanged.
#[must_use]
pub fn to_vault_path(local: &str, project: &ProjectId) -> String {
    match rule_for_path(local) {
        Some(rule) if rule.scope == VaultScope::Nested => {
            let rest = &local[rule.prefix.len()..];
            format!("{}{project}/{rest}", rule.prefix)
        }
        _ => local.to_string(),
    }
}

/// Local path of a vault file, as seen from `project`.
///
/// Returns `None` for nested paths owned by another project and for paths
/// outside every known category.
#[must_use]
pub fn from_vault_path(vault: &str, project: &ProjectId) -> Option<String> {
    let rule = rule_for_path(vault)?;
    match rule.scope {
        VaultScope::Universal => Some(vault.to_string()),
        VaultScope::Nested => {
            let rest = vault[rule.prefix.len()..]
                .strip_prefix(project.as_str())?
                .strip_prefix('/')?;
            if rest.is_empty() {
                return None;
            }
            Some(format!("{}{rest}", rule.prefix))
        }
    }
}

/// Whether a sync from `project` owns `vault`, i.e. may delete it when
/// the working copy no longer has the note.
///
/// Universal categories belong to every sync; nested paths only to their
/// project. A sync with no project owns only universal paths.
#[must_use]
pub fn owned_by(vault: &str, project: Option<&ProjectId>) -> bool {
    match rule_for_path(vault) {
        Some(rule) if rule.scope == VaultScope::Universal => true,
        Some(_) => project.is_some_and(|p| from_vault_path(vault, p).is_some()),
        None => false,
    }
}

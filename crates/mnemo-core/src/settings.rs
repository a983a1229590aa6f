//! Persisted sync settings.
//!
//! Settings live in a key/value store handed to each operation. There is
//! no process-wide settings singleton.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::MnemoError;

pub const KEY_VAULT_REPO: &str = "vault_repo";
pub const KEY_VAULT_PATH: &str = "vault_path";
pub const KEY_VAULT_ENABLED: &str = "vault_enabled";
pub const KEY_LAST_SYNC: &str = "last_sync";

/// Key/value persistence for settings.
pub trait SettingsStore {
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_setting(&self, key: &str) -> Result<Option<String>, MnemoError>;

    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_setting(&self, key: &str, value: &str) -> Result<(), MnemoError>;
}

/// Typed view over the vault keys of a [`SettingsStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSettings {
    pub vault_repo: Option<String>,
    pub vault_path: Option<PathBuf>,
    pub enabled: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

impl SyncSettings {
    /// Read the vault settings.
    ///
    /// # Errors
    ///
    /// Propagates store failures. Returns [`MnemoError::InvalidRecord`] if
    /// the stored `last_sync` is not an RFC 3339 timestamp.
    pub fn load(store: &dyn SettingsStore) -> Result<Self, MnemoError> {
        let last_sync = store
            .get_setting(KEY_LAST_SYNC)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| MnemoError::InvalidRecord(format!("{KEY_LAST_SYNC}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            vault_repo: store.get_setting(KEY_VAULT_REPO)?,
            vault_path: store.get_setting(KEY_VAULT_PATH)?.map(PathBuf::from),
            enabled: store.get_setting(KEY_VAULT_ENABLED)?.as_deref() == Some("true"),
            last_sync,
        })
    }

    /// The configured vault directory.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::NotConfigured`] if no vault was initialized.
    pub fn require_vault(&self) -> Result<&PathBuf, MnemoError> {
        self.vault_path.as_ref().ok_or_else(|| {
            MnemoError::NotConfigured("vault not initialized; run `mnemo vault init`".to_string())
        })
    }

    /// # Errors
    ///
    /// Propagates store failures.
    pub fn record_sync(store: &dyn SettingsStore, at: DateTime<Utc>) -> Result<(), MnemoError> {
        store.set_setting(KEY_LAST_SYNC, &at.to_rfc3339())
    }
}

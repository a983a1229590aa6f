//! Search analytics and the document access trail.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use mnemo_core::error::MnemoError;

use crate::{index_err, millis_to_utc, DocumentStore};

/// Why a document was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Returned in a search result page.
    Search,
}

impl AccessKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
        }
    }
}

/// One search call, as recorded for analytics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLogEntry {
    pub query: String,
    pub mode: String,
    pub category: Option<String>,
    pub project: Option<String>,
    pub result_count: usize,
    pub elapsed_ms: u64,
}

/// A [`SearchLogEntry`] read back with its timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedSearch {
    pub query: String,
    pub mode: String,
    pub result_count: u64,
    pub at: DateTime<Utc>,
}

impl DocumentStore {
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the insert fails.
    pub fn log_search(&self, entry: &SearchLogEntry) -> Result<(), MnemoError> {
        self.conn
            .execute(
                "INSERT INTO search_log
                 (query, mode, category, project, result_count, elapsed_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.query,
                    entry.mode,
                    entry.category,
                    entry.project,
                    entry.result_count as i64,
                    entry.elapsed_ms as i64,
                    Utc::now().timestamp_millis(),
                ],
            )
            .map_err(index_err)?;
        Ok(())
    }

    /// Append one access row per id.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if an insert fails.
    pub fn mark_accessed(&self, ids: &[String], kind: AccessKind) -> Result<(), MnemoError> {
        let now = Utc::now().timestamp_millis();
        let mut stmt = self
            .conn
            .prepare(
                "INSERT INTO access_log (document_id, access_type, created_at) VALUES (?1, ?2, ?3)",
            )
            .map_err(index_err)?;
        for id in ids {
            stmt.execute(params![id, kind.as_str(), now])
                .map_err(index_err)?;
        }
        Ok(())
    }

    /// Number of recorded accesses of a document.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails.
    pub fn access_count(&self, id: &str) -> Result<u64, MnemoError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM access_log WHERE document_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(index_err)?;
        Ok(count as u64)
    }

    /// Most recent searches, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails or
    /// [`MnemoError::InvalidRecord`] if a timestamp is out of range.
    pub fn recent_searches(&self, limit: usize) -> Result<Vec<LoggedSearch>, MnemoError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT query, mode, result_count, created_at
                 FROM search_log ORDER BY id DESC LIMIT ?1",
            )
            .map_err(index_err)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(index_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(index_err)?;

        rows.into_iter()
            .map(|(query, mode, count, at)| {
                Ok(LoggedSearch {
                    query,
                    mode,
                    result_count: count as u64,
                    at: millis_to_utc("created_at", at)?,
                })
            })
            .collect()
    }
}

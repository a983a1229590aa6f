//! # mnemo-index
//!
//! SQLite document store for mnemo.
//!
//! Maintains the durable record of every indexed note:
//! - Documents table, one row per note, with provenance and supersession
//! - FTS5 virtual table over title, content and topics
//! - Settings, search and access audit tables ([`audit`])
//! - An optional vector index behind the [`VectorIndex`] capability ([`vector`])
//!
//! Rows are validated into typed records at this boundary. A row with a
//! missing or malformed field is an [`MnemoError::InvalidRecord`], never a
//! silently defaulted value.

pub mod audit;
pub mod vector;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use mnemo_core::document::{Category, Document, ProjectId, Supersession};
use mnemo_core::error::MnemoError;
use mnemo_core::settings::SettingsStore;

pub use audit::{AccessKind, LoggedSearch, SearchLogEntry};
pub use vector::{HashingEmbedder, SqliteVectorIndex, VectorHit, VectorIndex};

fn index_err(e: rusqlite::Error) -> MnemoError {
    MnemoError::Index(e.to_string())
}

fn millis_to_utc(field: &str, ms: i64) -> Result<DateTime<Utc>, MnemoError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| MnemoError::InvalidRecord(format!("{field}: timestamp {ms} out of range")))
}

fn parse_project(raw: Option<String>) -> Result<Option<ProjectId>, MnemoError> {
    raw.map(|p| ProjectId::new(p).map_err(|e| MnemoError::InvalidRecord(e.to_string())))
        .transpose()
}

fn parse_category(raw: &str) -> Result<Category, MnemoError> {
    raw.parse::<Category>()
        .map_err(|e| MnemoError::InvalidRecord(e.to_string()))
}

/// The DocumentStore manages the SQLite database behind mnemo.
pub struct DocumentStore {
    conn: Connection,
}

impl DocumentStore {
    /// Open or create a store at the given path, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, MnemoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(index_err)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if schema creation fails.
    pub fn in_memory() -> Result<Self, MnemoError> {
        let conn = Connection::open_in_memory().map_err(index_err)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), MnemoError> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                source_path TEXT NOT NULL,
                project TEXT,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                topics TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                indexed_at INTEGER NOT NULL,
                provenance TEXT NOT NULL,
                superseded_by TEXT,
                superseded_reason TEXT,
                superseded_at INTEGER
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
                title,
                content,
                topics,
                content='documents',
                content_rowid='rowid'
            );

            CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
                INSERT INTO documents_fts(rowid, title, content, topics)
                VALUES (new.rowid, new.title, new.content, new.topics);
            END;

            CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
                INSERT INTO documents_fts(documents_fts, rowid, title, content, topics)
                VALUES ('delete', old.rowid, old.title, old.content, old.topics);
            END;

            CREATE TRIGGER IF NOT EXISTS documents_au AFTER UPDATE ON documents BEGIN
                INSERT INTO documents_fts(documents_fts, rowid, title, content, topics)
                VALUES ('delete', old.rowid, old.title, old.content, old.topics);
                INSERT INTO documents_fts(rowid, title, content, topics)
                VALUES (new.rowid, new.title, new.content, new.topics);
            END;

            CREATE INDEX IF NOT EXISTS idx_documents_category ON documents(category);
            CREATE INDEX IF NOT EXISTS idx_documents_project ON documents(project);
            CREATE INDEX IF NOT EXISTS idx_documents_source_path ON documents(source_path);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS search_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                mode TEXT NOT NULL,
                category TEXT,
                project TEXT,
                result_count INTEGER NOT NULL,
                elapsed_ms INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS access_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                access_type TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_access_log_document ON access_log(document_id);
            ",
            )
            .map_err(index_err)?;

        Ok(())
    }

    /// Insert a document, or update the content fields of an existing one.
    ///
    /// `provenance`, `created_at` and any supersession annotation of an
    /// existing row are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the write fails.
    pub fn upsert_document(&self, doc: &Document) -> Result<(), MnemoError> {
        let topics =
            serde_json::to_string(&doc.topics).map_err(|e| MnemoError::Serialization(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO documents
                (id, category, source_path, project, title, content, topics,
                 created_at, updated_at, indexed_at, provenance)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(id) DO UPDATE SET
                    category = excluded.category,
                    source_path = excluded.source_path,
                    project = excluded.project,
                    title = excluded.title,
                    content = excluded.content,
                    topics = excluded.topics,
                    updated_at = excluded.updated_at,
                    indexed_at = excluded.indexed_at",
                params![
                    doc.id,
                    doc.category.as_str(),
                    doc.source_path,
                    doc.project.as_ref().map(ProjectId::as_str),
                    doc.title,
                    doc.content,
                    topics,
                    doc.created_at.timestamp_millis(),
                    doc.updated_at.timestamp_millis(),
                    doc.indexed_at.timestamp_millis(),
                    doc.provenance,
                ],
            )
            .map_err(index_err)?;

        Ok(())
    }

    /// Fetch one document by id.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails or
    /// [`MnemoError::InvalidRecord`] if the row is malformed.
    pub fn get_document(&self, id: &str) -> Result<Option<Document>, MnemoError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, category, source_path, project, title, content, topics,
                        created_at, updated_at, indexed_at, provenance,
                        superseded_by, superseded_reason, superseded_at
                 FROM documents WHERE id = ?1",
                params![id],
                DocumentRow::from_row,
            )
            .optional()
            .map_err(index_err)?;

        row.map(DocumentRow::into_document).transpose()
    }

    /// Summaries of the given documents. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails or
    /// [`MnemoError::InvalidRecord`] if a row is malformed.
    pub fn summaries(&self, ids: &[String]) -> Result<Vec<DocumentSummary>, MnemoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, category, source_path, project, title, superseded_by
             FROM documents WHERE id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(index_err)?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter()), SummaryRow::from_row)
            .map_err(index_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(index_err)?;

        rows.into_iter().map(SummaryRow::into_summary).collect()
    }

    /// Full-text search over title, content and topics.
    ///
    /// `match_expr` is passed to FTS5 as is; callers sanitize user input.
    /// With a `scope`, only documents of that project or universal
    /// documents match. Without one, no project filter applies.
    /// Results are ordered best match first (most negative rank).
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails, including FTS5
    /// syntax errors.
    pub fn search_fts(
        &self,
        match_expr: &str,
        category: Option<Category>,
        scope: Option<&ProjectId>,
    ) -> Result<Vec<FtsHit>, MnemoError> {
        let mut sql = String::from(
            "SELECT d.id, d.category, d.source_path, d.project, d.title, d.superseded_by,
                    snippet(documents_fts, 1, '[', ']', ' ... ', 12) AS snippet,
                    bm25(documents_fts) AS rank
             FROM documents_fts
             JOIN documents d ON d.rowid = documents_fts.rowid
             WHERE documents_fts MATCH ?",
        );
        let mut bind: Vec<SqlValue> = vec![SqlValue::Text(match_expr.to_string())];

        if let Some(category) = category {
            sql.push_str(" AND d.category = ?");
            bind.push(SqlValue::Text(category.as_str().to_string()));
        }
        if let Some(project) = scope {
            sql.push_str(" AND (d.project = ? OR d.project IS NULL)");
            bind.push(SqlValue::Text(project.as_str().to_string()));
        }
        sql.push_str(" ORDER BY rank, d.id");

        let mut stmt = self.conn.prepare(&sql).map_err(index_err)?;
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((SummaryRow::from_row(row)?, row.get::<_, String>(6)?, row.get::<_, f64>(7)?))
            })
            .map_err(index_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(index_err)?;

        rows.into_iter()
            .map(|(summary, snippet, rank)| {
                Ok(FtsHit {
                    summary: summary.into_summary()?,
                    snippet,
                    rank,
                })
            })
            .collect()
    }

    /// Lightweight records for integrity checks, optionally by category.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails or
    /// [`MnemoError::InvalidRecord`] if a row is malformed.
    pub fn index_records(&self, category: Option<Category>) -> Result<Vec<IndexRecord>, MnemoError> {
        let mut sql = String::from(
            "SELECT id, category, source_path, indexed_at, superseded_by FROM documents",
        );
        let mut bind: Vec<SqlValue> = Vec::new();
        if let Some(category) = category {
            sql.push_str(" WHERE category = ?");
            bind.push(SqlValue::Text(category.as_str().to_string()));
        }
        sql.push_str(" ORDER BY source_path, id");

        let mut stmt = self.conn.prepare(&sql).map_err(index_err)?;
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(index_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(index_err)?;

        rows.into_iter()
            .map(|(id, category, source_path, indexed_at, superseded_by)| {
                Ok(IndexRecord {
                    category: parse_category(&category)?,
                    indexed_at: millis_to_utc("indexed_at", indexed_at)?,
                    superseded: superseded_by.is_some(),
                    id,
                    source_path,
                })
            })
            .collect()
    }

    /// Annotate documents as superseded. Rows are never deleted; rows that
    /// already carry an annotation keep it.
    ///
    /// Returns the number of rows annotated.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the update fails.
    pub fn supersede(&self, ids: &[String], marker: &Supersession) -> Result<usize, MnemoError> {
        let mut stmt = self
            .conn
            .prepare(
                "UPDATE documents
                 SET superseded_by = ?1, superseded_reason = ?2, superseded_at = ?3
                 WHERE id = ?4 AND superseded_by IS NULL",
            )
            .map_err(index_err)?;

        let mut updated = 0;
        for id in ids {
            updated += stmt
                .execute(params![
                    marker.by,
                    marker.reason,
                    marker.at.timestamp_millis(),
                    id
                ])
                .map_err(index_err)?;
        }
        Ok(updated)
    }

    /// Get count of indexed documents.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the query fails.
    pub fn count(&self) -> Result<u64, MnemoError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .map_err(index_err)?;
        Ok(count as u64)
    }
}

impl SettingsStore for DocumentStore {
    fn get_setting(&self, key: &str) -> Result<Option<String>, MnemoError> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(index_err)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<(), MnemoError> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().timestamp_millis()],
            )
            .map_err(index_err)?;
        Ok(())
    }
}

/// Display metadata of a document, without its content.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub category: Category,
    pub source_path: String,
    pub project: Option<ProjectId>,
    pub title: String,
    pub superseded: bool,
}

/// A full-text match with its raw FTS5 rank (more negative is better).
#[derive(Debug, Clone)]
pub struct FtsHit {
    pub summary: DocumentSummary,
    pub snippet: String,
    pub rank: f64,
}

/// What the integrity verifier needs to know about an indexed row.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub category: Category,
    pub source_path: String,
    pub indexed_at: DateTime<Utc>,
    pub superseded: bool,
}

struct SummaryRow {
    id: String,
    category: String,
    source_path: String,
    project: Option<String>,
    title: String,
    superseded_by: Option<String>,
}

impl SummaryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            source_path: row.get(2)?,
            project: row.get(3)?,
            title: row.get(4)?,
            superseded_by: row.get(5)?,
        })
    }

    fn into_summary(self) -> Result<DocumentSummary, MnemoError> {
        Ok(DocumentSummary {
            category: parse_category(&self.category)?,
            project: parse_project(self.project)?,
            superseded: self.superseded_by.is_some(),
            id: self.id,
            source_path: self.source_path,
            title: self.title,
        })
    }
}

struct DocumentRow {
    id: String,
    category: String,
    source_path: String,
    project: Option<String>,
    title: String,
    content: String,
    topics: String,
    created_at: i64,
    updated_at: i64,
    indexed_at: i64,
    provenance: String,
    superseded_by: Option<String>,
    superseded_reason: Option<String>,
    superseded_at: Option<i64>,
}

impl DocumentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            source_path: row.get(2)?,
            project: row.get(3)?,
            title: row.get(4)?,
            content: row.get(5)?,
            topics: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            indexed_at: row.get(9)?,
            provenance: row.get(10)?,
            superseded_by: row.get(11)?,
            superseded_reason: row.get(12)?,
            superseded_at: row.get(13)?,
        })
    }

    fn into_document(self) -> Result<Document, MnemoError> {
        let topics: Vec<String> = serde_json::from_str(&self.topics)
            .map_err(|e| MnemoError::InvalidRecord(format!("{}: topics: {e}", self.id)))?;

        let superseded = match (self.superseded_by, self.superseded_reason, self.superseded_at) {
            (None, _, _) => None,
            (Some(by), Some(reason), Some(at)) => Some(Supersession {
                by,
                reason,
                at: millis_to_utc("superseded_at", at)?,
            }),
            (Some(_), _, _) => {
                return Err(MnemoError::InvalidRecord(format!(
                    "{}: supersession without reason or timestamp",
                    self.id
                )))
            }
        };

        Ok(Document {
            category: parse_category(&self.category)?,
            project: parse_project(self.project)?,
            created_at: millis_to_utc("created_at", self.created_at)?,
            updated_at: millis_to_utc("updated_at", self.updated_at)?,
            indexed_at: millis_to_utc("indexed_at", self.indexed_at)?,
            id: self.id,
            source_path: self.source_path,
            title: self.title,
            content: self.content,
            topics,
            provenance: self.provenance,
            superseded,
        })
    }
}

//! Vector index: optional semantic nearest-neighbour search.
//!
//! The vector index is an acceleration structure, never a source of truth.
//! It may lag behind the document store or be missing entirely, so callers
//! check [`VectorIndex::is_available`] and treat every failure as
//! recoverable.
//!
//! Search only reads. Entries are written by the indexer through
//! [`SqliteVectorIndex::upsert`].

use std::path::Path;
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use tracing::warn;
use zerocopy::IntoBytes;

use mnemo_core::error::MnemoError;

/// A nearest-neighbour match. `distance` is cosine distance in `[0, 2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub distance: f64,
}

/// A semantic search backend.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether the backend can currently answer queries.
    fn is_available(&self) -> bool;

    /// Up to `k` nearest documents to `query`, closest first.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vector`] if the backend fails.
    async fn nearest(&self, query: &str, k: usize) -> Result<Vec<VectorHit>, MnemoError>;
}

/// Feature-hashing text embedder: each lowercase token adds ±1 to one
/// dimension, and the result is L2-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dim: 256 }
    }
}

impl HashingEmbedder {
    /// Embed `text`. Text without any alphanumeric token yields the zero
    /// vector.
    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let bucket = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket % self.dim] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

fn is_zero(v: &[f32]) -> bool {
    v.iter().all(|x| *x == 0.0)
}

fn register_sqlite_vec() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        // SAFETY: sqlite3_vec_init is the extension entry point exported by
        // sqlite-vec; registering it for every new connection is its
        // documented usage.
        unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
    });
}

fn vector_err(e: impl std::fmt::Display) -> MnemoError {
    MnemoError::Vector(e.to_string())
}

/// Vector index kept in its own SQLite database, scored with sqlite-vec's
/// `vec_distance_cosine`.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    embedder: HashingEmbedder,
    available: bool,
}

impl SqliteVectorIndex {
    /// Open or create a vector database at `path`.
    ///
    /// A database that opens but cannot load sqlite-vec is returned as
    /// unavailable rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vector`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, MnemoError> {
        register_sqlite_vec();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(vector_err)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory vector index (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vector`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self, MnemoError> {
        register_sqlite_vec();
        let conn = Connection::open_in_memory().map_err(vector_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, MnemoError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS note_vectors (
                id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            );",
        )
        .map_err(vector_err)?;

        let available = match conn.query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0)) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "sqlite-vec unavailable; vector search disabled");
                false
            }
        };

        Ok(Self {
            conn: Mutex::new(conn),
            embedder: HashingEmbedder::default(),
            available,
        })
    }

    /// Store or replace the embedding of a document. Write side for the
    /// indexer; nothing in the search path calls it.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vector`] if `text` has no embeddable tokens or
    /// the write fails.
    pub fn upsert(&self, id: &str, text: &str, metadata: &serde_json::Value) -> Result<(), MnemoError> {
        let embedding = self.embedder.embed(text);
        if is_zero(&embedding) {
            return Err(MnemoError::Vector(format!("{id}: nothing to embed")));
        }
        let conn = self.conn.lock().map_err(vector_err)?;
        conn.execute(
            "INSERT INTO note_vectors (id, embedding, metadata) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET embedding = excluded.embedding, metadata = excluded.metadata",
            params![id, embedding.as_bytes(), metadata.to_string()],
        )
        .map_err(vector_err)?;
        Ok(())
    }

    /// Number of stored embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Vector`] if the query fails.
    pub fn count(&self) -> Result<u64, MnemoError> {
        let conn = self.conn.lock().map_err(vector_err)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM note_vectors", [], |row| row.get(0))
            .map_err(vector_err)?;
        Ok(count as u64)
    }

    fn nearest_blocking(&self, query: &str, k: usize) -> Result<Vec<VectorHit>, MnemoError> {
        let embedding = self.embedder.embed(query);
        if is_zero(&embedding) || k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().map_err(vector_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, vec_distance_cosine(embedding, ?1) AS distance
                 FROM note_vectors
                 ORDER BY distance, id
                 LIMIT ?2",
            )
            .map_err(vector_err)?;
        let hits = stmt
            .query_map(params![embedding.as_bytes(), k as i64], |row| {
                Ok(VectorHit {
                    id: row.get(0)?,
                    distance: row.get(1)?,
                })
            })
            .map_err(vector_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(vector_err)?;
        Ok(hits)
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn nearest(&self, query: &str, k: usize) -> Result<Vec<VectorHit>, MnemoError> {
        if !self.available {
            return Err(MnemoError::Vector("sqlite-vec is not loaded".to_string()));
        }
        self.nearest_blocking(query, k)
    }
}

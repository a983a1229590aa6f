//! # mnemo-search
//!
//! Hybrid retrieval over the mnemo document store.
//!
//! A search runs a full-text sub-search (FTS5) and, when a vector index
//! is present and available, a semantic sub-search. Both candidate sets
//! are scored into `[0, 1]`, scoped to a project, merged by document id
//! and only then paginated.
//!
//! - [`sanitize`]: user input to FTS5 match expressions
//! - [`score`]: rank normalization and the merge
//! - [`engine`]: [`SearchEngine`] and its request/response types

pub mod engine;
pub mod sanitize;
pub mod score;

pub use engine::{SearchEngine, SearchHit, SearchMode, SearchRequest, SearchResponse};
pub use sanitize::{match_expression, sanitize_query};
pub use score::{merge, normalize_rank, MatchSource};

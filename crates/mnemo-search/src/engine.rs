//! The hybrid search entry point.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use mnemo_core::{Category, MnemoError, ProjectId, SearchConfig};
use mnemo_index::{AccessKind, DocumentStore, DocumentSummary, SearchLogEntry, VectorHit, VectorIndex};

use crate::sanitize::match_expression;
use crate::score::{distance_to_score, merge, normalize_rank, MatchSource, Scored};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Full-text only.
    Fts,
    /// Vector only, degrading to full-text when the vector side is unusable.
    Vector,
    #[default]
    Hybrid,
}

impl SearchMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fts => "fts",
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
        }
    }

    fn uses_vector(self) -> bool {
        !matches!(self, Self::Fts)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fts" => Ok(Self::Fts),
            "vector" => Ok(Self::Vector),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(MnemoError::Parse(format!(
                "unknown search mode '{other}' (expected fts, vector or hybrid)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub category: Option<Category>,
    pub limit: usize,
    pub offset: usize,
    pub mode: SearchMode,
    /// `Some(p)` restricts results to project `p` plus universal documents.
    /// `None` applies no project filter at all.
    pub project: Option<ProjectId>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: None,
            limit: 10,
            offset: 0,
            mode: SearchMode::default(),
            project: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub category: Category,
    pub source_path: String,
    pub project: Option<ProjectId>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    pub score: f64,
    pub source: MatchSource,
    pub superseded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Number of candidates before pagination.
    pub total: usize,
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Outcome of the vector sub-search.
enum VectorOutcome {
    Skipped,
    Hits(Vec<VectorHit>),
    Degraded(String),
}

/// Runs searches against a document store and an optional vector index.
pub struct SearchEngine<'a> {
    store: &'a DocumentStore,
    vectors: Option<&'a dyn VectorIndex>,
    config: &'a SearchConfig,
}

impl<'a> SearchEngine<'a> {
    pub fn new(
        store: &'a DocumentStore,
        vectors: Option<&'a dyn VectorIndex>,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            store,
            vectors,
            config,
        }
    }

    /// Search, merge and paginate.
    ///
    /// Vector failures degrade to full-text results with a `warning`;
    /// full-text failures are returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Index`] if the full-text query or the
    /// re-join of vector hits fails.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, MnemoError> {
        let started = Instant::now();

        if request.query.trim().is_empty() {
            let response = SearchResponse {
                results: Vec::new(),
                total: 0,
                mode: request.mode,
                warning: None,
            };
            self.record(request, &response, started);
            return Ok(response);
        }

        let (vector_hits, warning) = match self.vector_search(request).await {
            VectorOutcome::Skipped => (None, None),
            VectorOutcome::Hits(hits) => (Some(hits), None),
            VectorOutcome::Degraded(reason) => {
                warn!(query = %request.query, %reason, "vector search degraded to full-text");
                (None, Some(format!("{reason}; showing full-text results only")))
            }
        };

        let mut details: HashMap<String, (DocumentSummary, Option<String>)> = HashMap::new();

        let run_fts = request.mode != SearchMode::Vector || vector_hits.is_none();
        let mut fts_scored = Vec::new();
        if run_fts {
            let expr = match_expression(&request.query);
            let hits = self
                .store
                .search_fts(&expr, request.category, request.project.as_ref())?;
            debug!(expr = %expr, count = hits.len(), "full-text candidates");
            for hit in hits {
                fts_scored.push(Scored::new(
                    hit.summary.id.clone(),
                    normalize_rank(hit.rank, self.config.rank_decay),
                ));
                details.insert(hit.summary.id.clone(), (hit.summary, Some(hit.snippet)));
            }
        }

        let mut vector_scored = Vec::new();
        if let Some(hits) = vector_hits {
            let distances: HashMap<String, f64> =
                hits.into_iter().map(|h| (h.id, h.distance)).collect();
            let ids: Vec<String> = distances.keys().cloned().collect();
            for summary in self.store.summaries(&ids)? {
                if !self.eligible(&summary, request) {
                    continue;
                }
                if let Some(distance) = distances.get(&summary.id) {
                    vector_scored.push(Scored::new(summary.id.clone(), distance_to_score(*distance)));
                    details.entry(summary.id.clone()).or_insert((summary, None));
                }
            }
            debug!(count = vector_scored.len(), "vector candidates after scoping");
        }

        let merged = merge(fts_scored, vector_scored, self.config.hybrid_bonus);
        let total = merged.len();
        let results: Vec<SearchHit> = merged
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .filter_map(|m| {
                let (summary, snippet) = details.remove(&m.id)?;
                Some(SearchHit {
                    id: m.id,
                    category: summary.category,
                    source_path: summary.source_path,
                    project: summary.project,
                    title: summary.title,
                    snippet,
                    score: m.score,
                    source: m.source,
                    superseded: summary.superseded,
                })
            })
            .collect();

        let response = SearchResponse {
            results,
            total,
            mode: request.mode,
            warning,
        };
        self.record(request, &response, started);
        Ok(response)
    }

    async fn vector_search(&self, request: &SearchRequest) -> VectorOutcome {
        if !request.mode.uses_vector() {
            return VectorOutcome::Skipped;
        }
        if !self.config.vector_enabled {
            return VectorOutcome::Degraded("vector search is disabled in config".to_string());
        }
        let Some(index) = self.vectors else {
            return VectorOutcome::Degraded("no vector index configured".to_string());
        };
        if !index.is_available() {
            return VectorOutcome::Degraded("vector index unavailable".to_string());
        }

        let k = self
            .config
            .vector_candidates
            .max(request.offset.saturating_add(request.limit));
        match index.nearest(&request.query, k).await {
            Ok(hits) => VectorOutcome::Hits(hits),
            Err(e) => VectorOutcome::Degraded(format!("vector search failed: {e}")),
        }
    }

    /// Category and scope filter for vector hits, matching what the
    /// full-text query applies in SQL.
    fn eligible(&self, summary: &DocumentSummary, request: &SearchRequest) -> bool {
        if request.category.is_some_and(|c| c != summary.category) {
            return false;
        }
        match (&request.project, &summary.project) {
            (None, _) | (Some(_), None) => true,
            (Some(scope), Some(project)) => scope == project,
        }
    }

    /// Analytics and access trail. Failures here never fail the search.
    fn record(&self, request: &SearchRequest, response: &SearchResponse, started: Instant) {
        let entry = SearchLogEntry {
            query: request.query.clone(),
            mode: request.mode.as_str().to_string(),
            category: request.category.map(|c| c.as_str().to_string()),
            project: request.project.as_ref().map(|p| p.as_str().to_string()),
            result_count: response.total,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        if let Err(e) = self.store.log_search(&entry) {
            warn!(error = %e, "failed to log search");
        }

        let ids: Vec<String> = response.results.iter().map(|r| r.id.clone()).collect();
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.store.mark_accessed(&ids, AccessKind::Search) {
            warn!(error = %e, count = ids.len(), "failed to record document access");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use mnemo_core::Document;

    fn doc(id: &str, category: Category, project: Option<&str>, content: &str) -> Document {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        Document {
            id: id.to_string(),
            category,
            source_path: format!("notes/{id}.md"),
            project: project.map(|p| ProjectId::new(p).unwrap()),
            title: id.to_string(),
            content: content.to_string(),
            topics: Vec::new(),
            created_at: at,
            updated_at: at,
            indexed_at: at,
            provenance: "test".to_string(),
            superseded: None,
        }
    }

    fn seeded_store() -> DocumentStore {
        let store = DocumentStore::in_memory().unwrap();
        for d in [
            doc("shared", Category::Learning, Some("alpha"), "tokio runtime shutdown ordering"),
            doc("fts-only", Category::Learning, Some("alpha"), "tokio channels and backpressure"),
            doc("universal", Category::Principle, None, "prefer explicit errors over panics"),
            doc("other", Category::Learning, Some("beta"), "tokio task cancellation in beta"),
        ] {
            store.upsert_document(&d).unwrap();
        }
        store
    }

    struct FixedVectors(Vec<VectorHit>);

    #[async_trait]
    impl VectorIndex for FixedVectors {
        fn is_available(&self) -> bool {
            true
        }

        async fn nearest(&self, _query: &str, k: usize) -> Result<Vec<VectorHit>, MnemoError> {
            Ok(self.0.iter().take(k).cloned().collect())
        }
    }

    struct FailingVectors;

    #[async_trait]
    impl VectorIndex for FailingVectors {
        fn is_available(&self) -> bool {
            true
        }

        async fn nearest(&self, _query: &str, _k: usize) -> Result<Vec<VectorHit>, MnemoError> {
            Err(MnemoError::Vector("connection refused".to_string()))
        }
    }

    struct OfflineVectors;

    #[async_trait]
    impl VectorIndex for OfflineVectors {
        fn is_available(&self) -> bool {
            false
        }

        async fn nearest(&self, _query: &str, _k: usize) -> Result<Vec<VectorHit>, MnemoError> {
            Err(MnemoError::Vector("offline".to_string()))
        }
    }

    fn hit(id: &str, distance: f64) -> VectorHit {
        VectorHit {
            id: id.to_string(),
            distance,
        }
    }

    fn ids(response: &SearchResponse) -> Vec<&str> {
        response.results.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn fts_mode_finds_matches_and_records_side_effects() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let engine = SearchEngine::new(&store, None, &config);

        let mut request = SearchRequest::new("tokio");
        request.mode = SearchMode::Fts;
        let response = engine.search(&request).await.unwrap();

        assert_eq!(response.total, 3);
        assert!(response.warning.is_none());
        assert!(response.results.iter().all(|r| r.source == MatchSource::Fts));
        assert!(response.results.iter().all(|r| r.snippet.is_some()));

        let logged = store.recent_searches(1).unwrap();
        assert_eq!(logged[0].query, "tokio");
        assert_eq!(logged[0].mode, "fts");
        assert_eq!(logged[0].result_count, 3);
        for id in ids(&response) {
            assert_eq!(store.access_count(id).unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn hybrid_merges_and_tags_sources() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let vectors = FixedVectors(vec![hit("shared", 0.1), hit("universal", 0.4)]);
        let engine = SearchEngine::new(&store, Some(&vectors), &config);

        let response = engine.search(&SearchRequest::new("tokio runtime")).await.unwrap();
        let by_id: HashMap<&str, &SearchHit> =
            response.results.iter().map(|r| (r.id.as_str(), r)).collect();

        assert_eq!(by_id["shared"].source, MatchSource::Hybrid);
        assert!((by_id["shared"].score - 1.0).abs() < 1e-9);
        assert_eq!(by_id["universal"].source, MatchSource::Vector);
        assert!((by_id["universal"].score - 0.8).abs() < 1e-9);
        assert!(by_id["universal"].snippet.is_none());
        assert_eq!(response.results[0].id, "shared");
    }

    #[tokio::test]
    async fn failing_vector_index_degrades_with_warning() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let engine = SearchEngine::new(&store, Some(&FailingVectors), &config);

        let response = engine.search(&SearchRequest::new("tokio")).await.unwrap();
        assert_eq!(response.total, 3);
        assert!(response.warning.as_deref().unwrap().contains("connection refused"));
        assert!(response.results.iter().all(|r| r.source == MatchSource::Fts));
    }

    #[tokio::test]
    async fn vector_mode_falls_back_when_capability_is_absent() {
        let store = seeded_store();
        let config = SearchConfig::default();

        for vectors in [None, Some(&OfflineVectors as &dyn VectorIndex)] {
            let engine = SearchEngine::new(&store, vectors, &config);
            let mut request = SearchRequest::new("backpressure");
            request.mode = SearchMode::Vector;
            let response = engine.search(&request).await.unwrap();
            assert_eq!(ids(&response), ["fts-only"]);
            assert!(response.warning.is_some());
        }
    }

    #[tokio::test]
    async fn vector_mode_skips_full_text_when_vectors_answer() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let vectors = FixedVectors(vec![hit("universal", 0.2)]);
        let engine = SearchEngine::new(&store, Some(&vectors), &config);

        let mut request = SearchRequest::new("tokio");
        request.mode = SearchMode::Vector;
        let response = engine.search(&request).await.unwrap();
        assert_eq!(ids(&response), ["universal"]);
        assert_eq!(response.results[0].source, MatchSource::Vector);
    }

    #[tokio::test]
    async fn scope_applies_to_both_sub_searches() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let vectors = FixedVectors(vec![hit("other", 0.0), hit("universal", 0.5), hit("gone", 0.1)]);
        let engine = SearchEngine::new(&store, Some(&vectors), &config);

        let mut request = SearchRequest::new("tokio");
        request.project = Some(ProjectId::new("alpha").unwrap());
        let scoped = engine.search(&request).await.unwrap();
        let mut scoped_ids = ids(&scoped);
        scoped_ids.sort_unstable();
        assert_eq!(scoped_ids, ["fts-only", "shared", "universal"]);

        request.project = None;
        let unscoped = engine.search(&request).await.unwrap();
        assert!(ids(&unscoped).contains(&"other"));
        assert!(!ids(&unscoped).contains(&"gone"));
    }

    #[tokio::test]
    async fn category_filter_applies_to_vector_hits() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let vectors = FixedVectors(vec![hit("universal", 0.0)]);
        let engine = SearchEngine::new(&store, Some(&vectors), &config);

        let mut request = SearchRequest::new("tokio");
        request.category = Some(Category::Learning);
        let response = engine.search(&request).await.unwrap();
        assert!(response.results.iter().all(|r| r.category == Category::Learning));
    }

    #[tokio::test]
    async fn pagination_happens_after_merge() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let vectors = FixedVectors(vec![hit("universal", 0.0)]);
        let engine = SearchEngine::new(&store, Some(&vectors), &config);

        let mut request = SearchRequest::new("tokio");
        request.limit = 1;
        let first = engine.search(&request).await.unwrap();
        assert_eq!(first.total, 4);
        assert_eq!(ids(&first), ["universal"]);

        request.offset = 3;
        let last = engine.search(&request).await.unwrap();
        assert_eq!(last.results.len(), 1);
        request.offset = 10;
        assert!(engine.search(&request).await.unwrap().results.is_empty());
    }

    #[tokio::test]
    async fn grammar_only_queries_do_not_error() {
        let store = seeded_store();
        let config = SearchConfig::default();
        let engine = SearchEngine::new(&store, None, &config);

        let mut request = SearchRequest::new("*:\"");
        request.mode = SearchMode::Fts;
        assert!(engine.search(&request).await.unwrap().results.is_empty());

        request.query = "   ".to_string();
        let response = engine.search(&request).await.unwrap();
        assert_eq!(response.total, 0);
        assert_eq!(store.recent_searches(10).unwrap().len(), 2);
    }

    #[test]
    fn mode_parses_known_names() {
        assert_eq!("vector".parse::<SearchMode>().unwrap(), SearchMode::Vector);
        assert_eq!(SearchMode::default(), SearchMode::Hybrid);
        assert!("semantic".parse::<SearchMode>().is_err());
    }
}

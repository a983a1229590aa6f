//! Score normalization and the hybrid merge.

use std::collections::BTreeMap;

use serde::Serialize;

/// Which sub-search produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Fts,
    Vector,
    /// Found by both sub-searches.
    Hybrid,
}

/// A candidate id with its normalized score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub id: String,
    pub score: f64,
}

impl Scored {
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub id: String,
    pub score: f64,
    pub source: MatchSource,
}

/// Map an FTS5 rank (more negative is a stronger match) to `[0, 1)`.
///
/// `1 - exp(-decay * strength)` with `strength = max(0, -rank)`: a stronger
/// match never scores lower.
#[must_use]
pub fn normalize_rank(rank: f64, decay: f64) -> f64 {
    let strength = (-rank).max(0.0);
    (1.0 - (-decay * strength).exp()).clamp(0.0, 1.0)
}

/// Map a cosine distance in `[0, 2]` to `[0, 1]`.
#[must_use]
pub fn distance_to_score(distance: f64) -> f64 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Merge both candidate lists by id.
///
/// A hit from one side keeps its score; a hit from both scores
/// `min(1, max(a, b) + bonus)`. The result covers every candidate and is
/// sorted by score descending, then id ascending, so pagination over it
/// is stable.
#[must_use]
pub fn merge(fts: Vec<Scored>, vector: Vec<Scored>, bonus: f64) -> Vec<Merged> {
    let mut by_id: BTreeMap<String, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for hit in fts {
        let slot = &mut by_id.entry(hit.id).or_default().0;
        *slot = Some(slot.map_or(hit.score, |s| s.max(hit.score)));
    }
    for hit in vector {
        let slot = &mut by_id.entry(hit.id).or_default().1;
        *slot = Some(slot.map_or(hit.score, |s| s.max(hit.score)));
    }

    let mut merged: Vec<Merged> = by_id
        .into_iter()
        .filter_map(|(id, pair)| {
            let (score, source) = match pair {
                (Some(a), Some(b)) => ((a.max(b) + bonus).min(1.0), MatchSource::Hybrid),
                (Some(a), None) => (a, MatchSource::Fts),
                (None, Some(b)) => (b, MatchSource::Vector),
                (None, None) => return None,
            };
            Some(Merged { id, score, source })
        })
        .collect();

    merged.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    merged
}

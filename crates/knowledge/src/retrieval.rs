//! Ranking of retrieved passages across collections.
//!
//! Scores are cosine distances (`1 - similarity`): lower is closer. Hits
//! from every searched collection are merged into one list, sorted, checked
//! against a confidence cutoff on the best hit, then cut down to the
//! passages that go into the prompt context.

use concierge_core::RagSettings;
use serde::Serialize;

/// Knobs for one retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    /// Nearest passages taken from each collection.
    pub top_k: usize,
    /// Largest accepted distance for the best hit.
    pub max_distance: f32,
    /// Passages kept for the prompt context.
    pub context_top_n: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self::from(&RagSettings::default())
    }
}

impl From<&RagSettings> for RetrievalSettings {
    fn from(rag: &RagSettings) -> Self {
        Self {
            top_k: rag.top_k,
            max_distance: rag.min_retrieval_confidence,
            context_top_n: rag.context_top_n,
        }
    }
}

/// A passage returned by a collection search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub text: String,
    /// Cosine distance to the query.
    pub distance: f32,
    /// Name of the knowledge base it came from.
    pub knowledge_base: String,
    pub metadata: serde_json::Value,
}

/// What a retrieval produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// The registry has no collections at all.
    NoCollections,
    /// None of the requested knowledge bases exist.
    NoMatchingCollections,
    /// Nothing close enough to answer from.
    LowConfidence { searched: Vec<String> },
    Found {
        /// At most `context_top_n` passages, closest first.
        hits: Vec<RetrievedPassage>,
        best_distance: f32,
        searched: Vec<String>,
    },
}

impl RetrievalOutcome {
    /// Knowledge bases that were searched.
    pub fn searched(&self) -> &[String] {
        match self {
            Self::LowConfidence { searched } | Self::Found { searched, .. } => searched,
            Self::NoCollections | Self::NoMatchingCollections => &[],
        }
    }
}

pub fn similarity_to_distance(similarity: f32) -> f32 {
    1.0 - similarity
}

/// Pick the collections to search.
///
/// `None` selects every available collection in registry order. A list
/// selects the names that exist, in the requested order, without repeats.
pub fn select_collections(available: &[String], requested: Option<&[String]>) -> Vec<String> {
    match requested {
        None => available.to_vec(),
        Some(names) => {
            let mut selected: Vec<String> = Vec::with_capacity(names.len());
            for name in names {
                if available.contains(name) && !selected.contains(name) {
                    selected.push(name.clone());
                }
            }
            selected
        }
    }
}

/// Merge, sort, threshold and truncate hits from the searched collections.
///
/// Sorting is stable, so equal distances keep collection order. A best
/// distance that is not a number counts as low confidence.
pub fn rank(
    mut hits: Vec<RetrievedPassage>,
    settings: &RetrievalSettings,
    searched: Vec<String>,
) -> RetrievalOutcome {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let best_distance = match hits.first() {
        Some(best) if best.distance <= settings.max_distance => best.distance,
        Some(best) => {
            tracing::info!(
                "Best retrieval distance {:.3} above cutoff {:.2}",
                best.distance,
                settings.max_distance
            );
            return RetrievalOutcome::LowConfidence { searched };
        }
        None => {
            tracing::info!("No passages retrieved from {:?}", searched);
            return RetrievalOutcome::LowConfidence { searched };
        }
    };

    hits.truncate(settings.context_top_n);

    tracing::debug!(
        "Keeping {} passages (best distance {:.3})",
        hits.len(),
        best_distance
    );

    RetrievalOutcome::Found {
        hits,
        best_distance,
        searched,
    }
}

/// Join passage texts into the prompt context.
pub fn build_context(hits: &[RetrievedPassage]) -> String {
    hits.iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, distance: f32, kb: &str) -> RetrievedPassage {
        RetrievedPassage {
            text: text.to_string(),
            distance,
            knowledge_base: kb.to_string(),
            metadata: serde_json::json!({ "knowledge_base": kb }),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn settings() -> RetrievalSettings {
        RetrievalSettings {
            top_k: 5,
            max_distance: 0.4,
            context_top_n: 3,
        }
    }

    #[test]
    fn test_defaults_follow_rag_settings() {
        let s = RetrievalSettings::default();
        assert_eq!(s.top_k, 5);
        assert!((s.max_distance - 0.40).abs() < f32::EPSILON);
        assert_eq!(s.context_top_n, 3);
    }

    #[test]
    fn test_select_all_when_unspecified() {
        let available = names(&["medical", "drugs"]);
        assert_eq!(select_collections(&available, None), available);
    }

    #[test]
    fn test_select_keeps_requested_order_and_drops_unknown() {
        let available = names(&["medical", "drugs", "policy"]);
        let requested = names(&["policy", "missing", "medical", "policy"]);
        assert_eq!(
            select_collections(&available, Some(&requested)),
            names(&["policy", "medical"])
        );
        assert!(select_collections(&available, Some(&names(&["nope"]))).is_empty());
        assert!(select_collections(&available, Some(&[])).is_empty());
    }

    #[test]
    fn test_rank_merges_and_truncates() {
        let hits = vec![
            passage("a1", 0.30, "a"),
            passage("a2", 0.50, "a"),
            passage("b1", 0.10, "b"),
            passage("b2", 0.35, "b"),
        ];

        match rank(hits, &settings(), names(&["a", "b"])) {
            RetrievalOutcome::Found {
                hits,
                best_distance,
                searched,
            } => {
                let texts: Vec<_> = hits.iter().map(|h| h.text.as_str()).collect();
                assert_eq!(texts, vec!["b1", "a1", "b2"]);
                assert!((best_distance - 0.10).abs() < f32::EPSILON);
                assert_eq!(searched, names(&["a", "b"]));
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_rank_threshold_applies_to_best_hit_only() {
        // The tail above the cutoff is still kept once the best hit passes.
        let hits = vec![passage("close", 0.39, "a"), passage("far", 0.90, "a")];
        match rank(hits, &settings(), names(&["a"])) {
            RetrievalOutcome::Found { hits, .. } => assert_eq!(hits.len(), 2),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_rank_cutoff_is_inclusive() {
        let outcome = rank(vec![passage("edge", 0.4, "a")], &settings(), names(&["a"]));
        assert!(matches!(outcome, RetrievalOutcome::Found { .. }));
    }

    #[test]
    fn test_rank_low_confidence() {
        let outcome = rank(
            vec![passage("x", 0.41, "a"), passage("y", 0.8, "b")],
            &settings(),
            names(&["a", "b"]),
        );
        assert_eq!(
            outcome,
            RetrievalOutcome::LowConfidence {
                searched: names(&["a", "b"])
            }
        );
    }

    #[test]
    fn test_rank_no_hits_is_low_confidence() {
        let outcome = rank(vec![], &settings(), names(&["a"]));
        assert_eq!(outcome.searched(), &names(&["a"])[..]);
        assert!(matches!(outcome, RetrievalOutcome::LowConfidence { .. }));
    }

    #[test]
    fn test_rank_nan_is_low_confidence() {
        let outcome = rank(vec![passage("x", f32::NAN, "a")], &settings(), names(&["a"]));
        assert!(matches!(outcome, RetrievalOutcome::LowConfidence { .. }));
    }

    #[test]
    fn test_rank_ties_keep_collection_order() {
        let hits = vec![passage("from-a", 0.2, "a"), passage("from-b", 0.2, "b")];
        match rank(hits, &settings(), names(&["a", "b"])) {
            RetrievalOutcome::Found { hits, .. } => {
                assert_eq!(hits[0].knowledge_base, "a");
                assert_eq!(hits[1].knowledge_base, "b");
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_build_context() {
        let hits = vec![passage("first", 0.1, "a"), passage("second", 0.2, "a")];
        assert_eq!(build_context(&hits), "first\n\nsecond");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_similarity_to_distance() {
        assert_eq!(similarity_to_distance(1.0), 0.0);
        assert_eq!(similarity_to_distance(0.25), 0.75);
    }
}

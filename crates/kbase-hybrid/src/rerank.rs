//! Second-pass relevance scoring of the fused candidate set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kbase_core::traits::PairwiseScorer;
use kbase_core::types::Passage;

pub const RERANK_SCORE_KEY: &str = "rerank_score";

/// Reranks candidates with a pairwise scorer, degrading to passthrough
/// when no scorer is available. A scorer that fails once is not
/// consulted again for the life of the process; reinitialization happens
/// on restart.
pub struct Reranker {
    scorer: Option<Arc<dyn PairwiseScorer>>,
    poisoned: AtomicBool,
}

impl Reranker {
    pub fn new(scorer: Option<Arc<dyn PairwiseScorer>>) -> Self {
        Self { scorer, poisoned: AtomicBool::new(false) }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_active(&self) -> bool {
        self.scorer.is_some() && !self.poisoned.load(Ordering::Relaxed)
    }

    /// Scores every `(query, candidate text)` pair, records the score in
    /// the candidate's metadata, and returns the best `top_n` in
    /// descending score order. Never fails: any scoring trouble returns
    /// the first `top_n` candidates in their incoming order instead.
    pub fn rerank(&self, query: &str, mut candidates: Vec<Passage>, top_n: usize) -> Vec<Passage> {
        if candidates.is_empty() {
            return candidates;
        }
        let Some(scorer) = self.scorer.as_ref().filter(|_| !self.poisoned.load(Ordering::Relaxed))
        else {
            candidates.truncate(top_n);
            return candidates;
        };

        let mut scores = Vec::with_capacity(candidates.len());
        for passage in &candidates {
            match scorer.score(query, &passage.text) {
                Ok(score) => scores.push(score),
                Err(e) => {
                    tracing::warn!(error = %e, "pairwise scorer failed; passing candidates through unscored");
                    self.poisoned.store(true, Ordering::Relaxed);
                    candidates.truncate(top_n);
                    return candidates;
                }
            }
        }

        let mut scored: Vec<(f32, Passage)> = scores.into_iter().zip(candidates).collect();
        for (score, passage) in &mut scored {
            passage.score_metadata.insert(RERANK_SCORE_KEY.to_string(), *score);
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_n);
        scored.into_iter().map(|(_, p)| p).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct OverlapScorer;

    impl PairwiseScorer for OverlapScorer {
        fn score(&self, query: &str, text: &str) -> anyhow::Result<f32> {
            let hits = query.split_whitespace().filter(|w| text.contains(w)).count();
            Ok(hits as f32)
        }
    }

    struct BrokenScorer {
        calls: AtomicUsize,
    }

    impl PairwiseScorer for BrokenScorer {
        fn score(&self, _query: &str, _text: &str) -> anyhow::Result<f32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("scorer backend is gone")
        }
    }

    fn candidates() -> Vec<Passage> {
        vec![
            Passage::new("1", "nothing relevant here", "a.txt", 0),
            Passage::new("2", "chicken coop ventilation and chicken feed", "b.txt", 0),
            Passage::new("3", "coop cleaning schedule", "c.txt", 0),
            Passage::new("4", "barn door hinges", "d.txt", 0),
        ]
    }

    #[test]
    fn reranks_by_pairwise_score_and_truncates() {
        let reranker = Reranker::new(Some(Arc::new(OverlapScorer)));
        let top = reranker.rerank("chicken coop", candidates(), 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].id, "2");
        assert_eq!(top[1].id, "3");
        assert!(top[0].score_metadata[RERANK_SCORE_KEY] > top[1].score_metadata[RERANK_SCORE_KEY]);
    }

    #[test]
    fn missing_scorer_passes_through_in_order() {
        let reranker = Reranker::disabled();
        let top = reranker.rerank("chicken coop", candidates(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "1");
        assert_eq!(top[1].id, "2");
        assert!(!top[0].score_metadata.contains_key(RERANK_SCORE_KEY));
    }

    #[test]
    fn failing_scorer_degrades_permanently() {
        let scorer = Arc::new(BrokenScorer { calls: AtomicUsize::new(0) });
        let reranker = Reranker::new(Some(Arc::clone(&scorer) as Arc<dyn PairwiseScorer>));
        assert!(reranker.is_active());

        let top = reranker.rerank("query", candidates(), 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].id, "1", "fused order preserved on degradation");
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
        assert!(!reranker.is_active());

        // The broken scorer is never consulted again.
        let again = reranker.rerank("query", candidates(), 3);
        assert_eq!(again.len(), 3);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_candidates_stay_empty() {
        let reranker = Reranker::new(Some(Arc::new(OverlapScorer)));
        assert!(reranker.rerank("query", Vec::new(), 3).is_empty());
    }
}

//! Reciprocal rank fusion of ranked candidate lists.

use std::collections::HashMap;

use kbase_core::types::Passage;

/// Standard RRF smoothing constant; fixed, never tuned per query.
pub const RRF_SMOOTHING: f32 = 60.0;

/// Merge ranked lists into one deduplicated list, descending by fused
/// score.
///
/// Passages are keyed by exact text: candidates with identical text are
/// treated as the same passage and their contributions summed, since the
/// retrievers do not share identifiers. Each passage at 0-based rank `r`
/// contributes `1 / (r + smoothing)` per list. Exact score ties keep
/// first-appearance order. With a single input list the output is that
/// list's own order.
pub fn fuse(lists: &[Vec<Passage>]) -> Vec<Passage> {
    fuse_with_smoothing(lists, RRF_SMOOTHING)
}

pub fn fuse_with_smoothing(lists: &[Vec<Passage>], smoothing: f32) -> Vec<Passage> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut fused: Vec<Passage> = Vec::new();

    for list in lists {
        for (rank, passage) in list.iter().enumerate() {
            let contribution = 1.0 / (rank as f32 + smoothing);
            if let Some(score) = scores.get_mut(&passage.text) {
                *score += contribution;
            } else {
                scores.insert(passage.text.clone(), contribution);
                fused.push(passage.clone());
            }
        }
    }

    // Stable sort: equal scores stay in first-appearance order.
    fused.sort_by(|a, b| {
        let sa = scores.get(&a.text).copied().unwrap_or(0.0);
        let sb = scores.get(&b.text).copied().unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });
    for passage in &mut fused {
        if let Some(score) = scores.get(&passage.text) {
            passage.score_metadata.insert("rrf_score".to_string(), *score);
        }
    }
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(id: &str, text: &str) -> Passage {
        Passage::new(id, text, "doc.txt", 0)
    }

    #[test]
    fn passage_in_both_lists_outranks_single_list_passages() {
        let a = vec![passage("1", "alpha"), passage("2", "beta")];
        let b = vec![passage("3", "beta"), passage("4", "gamma")];
        let fused = fuse(&[a, b]);

        let order: Vec<&str> = fused.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(order, vec!["beta", "alpha", "gamma"]);
        // beta: 1/61 + 1/60; alpha: 1/60; gamma: 1/61
        let beta = fused[0].score_metadata["rrf_score"];
        let expected = 1.0 / 61.0 + 1.0 / 60.0;
        assert!((beta - expected).abs() < 1e-6);
    }

    #[test]
    fn appearing_in_more_lists_strictly_increases_score() {
        let a = vec![passage("1", "x"), passage("2", "y")];
        let b = vec![passage("3", "x"), passage("4", "y")];
        let once = fuse(&[a.clone()]);
        let twice = fuse(&[a, b]);
        assert!(twice[0].score_metadata["rrf_score"] > once[0].score_metadata["rrf_score"]);
    }

    #[test]
    fn single_list_keeps_its_exact_order() {
        let list = vec![passage("1", "first"), passage("2", "second"), passage("3", "third")];
        let fused = fuse(&[list.clone()]);
        let order: Vec<&str> = fused.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
        let ids: Vec<&str> = fused.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn exact_ties_keep_first_appearance_order() {
        // x and y swap ranks across the two lists; their sums share the
        // same addends, so the scores are exactly equal.
        let a = vec![passage("1", "x"), passage("2", "y")];
        let b = vec![passage("3", "y"), passage("4", "x")];
        let fused = fuse(&[a, b]);
        let order: Vec<&str> = fused.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(order, vec!["x", "y"]);
    }

    #[test]
    fn identical_text_across_sources_is_merged() {
        let a = vec![passage("1", "duplicate"), passage("2", "unique")];
        let mut dup = passage("9", "duplicate");
        dup.source = "other.txt".to_string();
        let b = vec![dup];
        let fused = fuse(&[a, b]);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].text, "duplicate");
        // The first-seen copy wins; the later one only adds score.
        assert_eq!(fused[0].id, "1");
    }

    #[test]
    fn all_empty_lists_fuse_to_empty() {
        assert!(fuse(&[Vec::new(), Vec::new()]).is_empty());
        assert!(fuse(&[]).is_empty());
    }
}

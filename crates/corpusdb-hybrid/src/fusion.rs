//! Score fusion for hybrid search.
//!
//! Two strategies: weighted sum over independently min-max-normalized
//! score lists, and reciprocal rank fusion (rank-based, score-agnostic).
//! Both sort descending by fused score with ties broken by the order in
//! which a doc id first appeared scanning the BM25 list then the vector
//! list, so output order is fully deterministic.

use corpusdb_core::types::{DocId, SearchHit, SourceKind};
use std::collections::HashMap;

/// Standard RRF dampening constant from Cormack et al. (SIGIR 2009).
pub const RRF_K: usize = 60;

/// First-appearance ordinal per id, scanning the BM25 list then the
/// vector list. Used as the stable tie-breaker.
fn appearance_order(bm25: &[SearchHit], vector: &[SearchHit]) -> HashMap<DocId, usize> {
    let mut order = HashMap::new();
    for hit in bm25.iter().chain(vector) {
        let next = order.len();
        order.entry(hit.id.clone()).or_insert(next);
    }
    order
}

/// Min-max normalize one list to [0, 1]. A single-score list (span 0)
/// normalizes to 1.0 for every member.
fn normalized(hits: &[SearchHit]) -> HashMap<DocId, f32> {
    if hits.is_empty() {
        return HashMap::new();
    }
    let min = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
    let max = hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
    let span = max - min;
    hits.iter()
        .map(|h| {
            let score = if span > 0.0 { (h.score - min) / span } else { 1.0 };
            (h.id.clone(), score)
        })
        .collect()
}

fn sorted_hits(scores: HashMap<DocId, f32>, order: &HashMap<DocId, usize>) -> Vec<SearchHit> {
    let mut fused: Vec<SearchHit> = scores
        .into_iter()
        .map(|(id, score)| SearchHit {
            id,
            score,
            source: SourceKind::Fused,
        })
        .collect();
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| order.get(&a.id).cmp(&order.get(&b.id)))
    });
    fused
}

/// `score = bm25_weight * norm_bm25 + vector_weight * norm_vector`, with a
/// missing entry contributing 0 for that list.
pub fn weighted_sum(
    bm25: &[SearchHit],
    vector: &[SearchHit],
    bm25_weight: f32,
    vector_weight: f32,
) -> Vec<SearchHit> {
    let order = appearance_order(bm25, vector);
    let bm25_norm = normalized(bm25);
    let vector_norm = normalized(vector);

    let mut scores: HashMap<DocId, f32> = HashMap::new();
    for id in order.keys() {
        let b = bm25_norm.get(id).copied().unwrap_or(0.0);
        let v = vector_norm.get(id).copied().unwrap_or(0.0);
        scores.insert(id.clone(), bm25_weight * b + vector_weight * v);
    }
    sorted_hits(scores, &order)
}

/// `score = Σ 1/(k + rank)` over the lists containing the id, with ranks
/// 1-indexed. Input scores are ignored entirely; only positions matter.
pub fn reciprocal_rank(bm25: &[SearchHit], vector: &[SearchHit], k: usize) -> Vec<SearchHit> {
    let order = appearance_order(bm25, vector);
    let k = k as f32;

    let mut scores: HashMap<DocId, f32> = HashMap::new();
    for list in [bm25, vector] {
        for (rank, hit) in list.iter().enumerate() {
            *scores.entry(hit.id.clone()).or_insert(0.0) += 1.0 / (k + (rank + 1) as f32);
        }
    }
    sorted_hits(scores, &order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(pairs: &[(&str, f32)], source: SourceKind) -> Vec<SearchHit> {
        pairs
            .iter()
            .map(|(id, score)| SearchHit {
                id: (*id).to_string(),
                score: *score,
                source,
            })
            .collect()
    }

    #[test]
    fn weighted_sum_normalizes_each_list_independently() {
        // BM25 scores on a 0..10 scale, vector scores on 0..1.
        let bm25 = hits(&[("a", 10.0), ("b", 5.0), ("c", 0.0)], SourceKind::Lexical);
        let vector = hits(&[("c", 0.99), ("a", 0.01)], SourceKind::Dense);

        let fused = weighted_sum(&bm25, &vector, 0.5, 0.5);
        let score_of = |id: &str| fused.iter().find(|h| h.id == id).map(|h| h.score);

        // a: 0.5*1.0 + 0.5*0.0; c: 0.5*0.0 + 0.5*1.0 -> tie at 0.5.
        assert_eq!(score_of("a"), Some(0.5));
        assert_eq!(score_of("c"), Some(0.5));
        assert_eq!(score_of("b"), Some(0.25));
        // Tie broken by first appearance: a precedes c.
        assert_eq!(fused[0].id, "a");
        assert_eq!(fused[1].id, "c");
    }

    #[test]
    fn weighted_sum_missing_doc_contributes_zero() {
        let bm25 = hits(&[("only-lexical", 3.0)], SourceKind::Lexical);
        let vector = hits(&[("only-dense", 0.9)], SourceKind::Dense);

        let fused = weighted_sum(&bm25, &vector, 0.7, 0.3);
        let score_of = |id: &str| fused.iter().find(|h| h.id == id).map(|h| h.score);
        // Single-element lists normalize to 1.0.
        assert_eq!(score_of("only-lexical"), Some(0.7));
        assert_eq!(score_of("only-dense"), Some(0.3));
    }

    #[test]
    fn rrf_rewards_presence_in_both_lists() {
        let bm25 = hits(&[("both", 9.0), ("lex", 5.0)], SourceKind::Lexical);
        let vector = hits(&[("dense", 0.9), ("both", 0.8)], SourceKind::Dense);

        let fused = reciprocal_rank(&bm25, &vector, RRF_K);
        assert_eq!(fused[0].id, "both", "doc in both lists must rank first");

        let expected = 1.0 / 61.0 + 1.0 / 62.0;
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn rrf_ignores_raw_scores() {
        // Wildly different score scales, same ranks.
        let a = reciprocal_rank(
            &hits(&[("x", 1000.0), ("y", 999.0)], SourceKind::Lexical),
            &hits(&[("y", 0.2), ("x", 0.1)], SourceKind::Dense),
            RRF_K,
        );
        let b = reciprocal_rank(
            &hits(&[("x", 0.2), ("y", 0.1)], SourceKind::Lexical),
            &hits(&[("y", 7.0), ("x", 3.0)], SourceKind::Dense),
            RRF_K,
        );
        let ids_a: Vec<&str> = a.iter().map(|h| h.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn empty_inputs_fuse_to_empty() {
        assert!(weighted_sum(&[], &[], 0.5, 0.5).is_empty());
        assert!(reciprocal_rank(&[], &[], RRF_K).is_empty());
    }

    #[test]
    fn single_list_preserves_its_order() {
        let bm25 = hits(&[("a", 3.0), ("b", 2.0), ("c", 1.0)], SourceKind::Lexical);
        let fused = reciprocal_rank(&bm25, &[], RRF_K);
        let ids: Vec<&str> = fused.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}

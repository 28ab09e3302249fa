// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-signal reranking of conflict-resolved candidates.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use recollect_config::model::RerankWeights;
use recollect_core::tokenize;

use crate::conflict::ScoredCandidate;

/// Ranker tag for the weighted multi-signal path.
pub const MULTI_SIGNAL_RERANK: &str = "multi_signal_rerank";
/// Ranker tag when reranking is disabled.
pub const SEMANTIC_ONLY: &str = "semantic_only";

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-set similarity in [0, 1].
///
/// Compares the shared tokens against each side's full token set and
/// returns the best pairing, so a query whose terms are all contained in the
/// text scores 1.0 regardless of extra text tokens.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<String> = tokenize(a).into_iter().collect();
    let tb: BTreeSet<String> = tokenize(b).into_iter().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = ta.intersection(&tb).map(String::as_str).collect();
    let only_a: Vec<&str> = ta.difference(&tb).map(String::as_str).collect();
    let only_b: Vec<&str> = tb.difference(&ta).map(String::as_str).collect();

    let sect_str = sect.join(" ");
    if !sect.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }
    let rest_a = only_a.join(" ");
    let rest_b = only_b.join(" ");
    let combined_a = join(&[sect_str.as_str(), rest_a.as_str()]);
    let combined_b = join(&[sect_str.as_str(), rest_b.as_str()]);

    let mut best = strsim::normalized_levenshtein(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best
            .max(strsim::normalized_levenshtein(&sect_str, &combined_a))
            .max(strsim::normalized_levenshtein(&sect_str, &combined_b));
    }
    best
}

/// Fraction of query terms that also appear in the text.
pub fn term_overlap(query: &str, text: &str) -> f64 {
    let q: BTreeSet<String> = tokenize(query).into_iter().collect();
    let t: BTreeSet<String> = tokenize(text).into_iter().collect();
    q.intersection(&t).count() as f64 / q.len().max(1) as f64
}

fn sort_descending(candidates: &mut [ScoredCandidate]) {
    // Stable: ties keep input order.
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

#[derive(Debug, Clone)]
pub struct Reranker {
    weights: RerankWeights,
}

impl Reranker {
    pub fn new(weights: RerankWeights) -> Self {
        Self { weights }
    }

    /// Combined score for one candidate.
    pub fn combined_score(&self, query: &str, candidate: &ScoredCandidate) -> f64 {
        let text = candidate.entry.canonical_text();
        let query = query.to_lowercase();
        let w = &self.weights;
        w.semantic * candidate.score
            + w.fuzzy * token_set_ratio(&query, &text)
            + w.overlap * term_overlap(&query, &text)
            + w.kind * candidate.entry.kind.priority()
    }

    /// Replace each score with the weighted combination, sort, truncate.
    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<ScoredCandidate>,
        top_k: usize,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|c| {
                let score = self.combined_score(query, &c);
                ScoredCandidate { score, ..c }
            })
            .collect();
        sort_descending(&mut scored);
        scored.truncate(top_k);
        scored
    }
}

/// Order by decayed score alone and truncate.
pub fn semantic_only(mut candidates: Vec<ScoredCandidate>, top_k: usize) -> Vec<ScoredCandidate> {
    sort_descending(&mut candidates);
    candidates.truncate(top_k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use recollect_core::{MemoryEntry, MemoryKind};

    fn cand(kind: MemoryKind, key: &str, value: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate::new(MemoryEntry::new(kind, key, value, 1, 0.9), score)
    }

    #[test]
    fn token_set_ratio_subset_is_perfect() {
        assert_eq!(token_set_ratio("call time", "preference|call_time=after 9 am"), 1.0);
    }

    #[test]
    fn token_set_ratio_disjoint_is_low() {
        let r = token_set_ratio("zebra", "preference|language=rust");
        assert!(r < 0.5, "ratio {r}");
        assert_eq!(token_set_ratio("", "x"), 0.0);
    }

    #[test]
    fn term_overlap_fraction() {
        assert_eq!(term_overlap("call time now", "preference|call_time=after 9 am"), 2.0 / 3.0);
        assert_eq!(term_overlap("", "anything"), 0.0);
    }

    #[test]
    fn combined_score_uses_all_weights() {
        let reranker = Reranker::new(RerankWeights::default());
        let c = cand(MemoryKind::Constraint, "no_sundays", "true", 0.4);
        let score = reranker.combined_score("no sundays", &c);
        // tokens "no", "sundays" are a subset of the text tokens
        let expected = 0.5 * 0.4 + 0.25 * 1.0 + 0.15 * 1.0 + 0.10 * 0.95;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn kind_priority_breaks_otherwise_equal_candidates() {
        let reranker = Reranker::new(RerankWeights::default());
        let fact = cand(MemoryKind::Fact, "x", "y", 0.5);
        let constraint = cand(MemoryKind::Constraint, "x", "y", 0.5);
        let out = reranker.rerank("unrelated", vec![fact, constraint.clone()], 2);
        assert_eq!(out[0].entry.id, constraint.entry.id);
    }

    #[test]
    fn rerank_truncates_and_keeps_ties_in_input_order() {
        let reranker = Reranker::new(RerankWeights::default());
        let a = cand(MemoryKind::Fact, "x", "y", 0.5);
        let b = cand(MemoryKind::Fact, "x", "y", 0.5);
        let c = cand(MemoryKind::Fact, "x", "y", 0.5);
        let out = reranker.rerank("q", vec![a.clone(), b.clone(), c], 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].entry.id, a.entry.id);
        assert_eq!(out[1].entry.id, b.entry.id);
    }

    #[test]
    fn semantic_only_sorts_by_decayed_score() {
        let low = cand(MemoryKind::Constraint, "a", "1", 0.1);
        let high = cand(MemoryKind::Fact, "b", "2", 0.9);
        let out = semantic_only(vec![low.clone(), high.clone()], 5);
        assert_eq!(out[0].entry.id, high.entry.id);
        assert_eq!(out[0].score, 0.9);
        assert_eq!(out[1].entry.id, low.entry.id);
    }
}

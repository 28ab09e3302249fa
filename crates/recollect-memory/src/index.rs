// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid similarity index over entry canonical text.
//!
//! Semantic nearest neighbors from a [`VectorIndex`] are blended with a
//! substring-based lexical score so exact keyword hits are not lost when the
//! embedding misses them.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use recollect_config::model::HybridConfig;
use recollect_core::{
    EmbeddingAdapter, EmbeddingInput, MemoryEntry, RecollectError, VectorIndex, tokenize,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::embedder::l2_normalize;

/// Brute-force inner-product index over normalized vectors.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIpIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl VectorIndex for FlatIpIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), RecollectError> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RecollectError::Embedding {
                message: format!(
                    "vector has {} dimensions, index expects {}",
                    bad.len(),
                    self.dimensions
                ),
                source: None,
            });
        }
        self.vectors.extend(vectors.iter().cloned());
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.len() != self.dimensions || k == 0 {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(pos, v)| (pos, inner_product(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        scored
    }

    fn score(&self, query: &[f32], position: usize) -> Option<f32> {
        if query.len() != self.dimensions {
            return None;
        }
        self.vectors.get(position).map(|v| inner_product(query, v))
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

/// Average over query terms of (entry terms containing the query term as a
/// substring) / (entry term count).
pub fn lexical_score(query_terms: &[String], entry_terms: &[String]) -> f64 {
    if query_terms.is_empty() || entry_terms.is_empty() {
        return 0.0;
    }
    let total: f64 = query_terms
        .iter()
        .map(|q| {
            let hits = entry_terms.iter().filter(|t| t.contains(q.as_str())).count();
            hits as f64 / entry_terms.len() as f64
        })
        .sum();
    total / query_terms.len() as f64
}

struct IndexedItem {
    id: String,
    terms: Vec<String>,
}

/// Embedded entries waiting to be appended.
#[derive(Default)]
pub struct PreparedBatch {
    vectors: Vec<Vec<f32>>,
    items: Vec<IndexedItem>,
}

impl PreparedBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

struct IndexInner {
    vectors: Box<dyn VectorIndex>,
    items: Vec<IndexedItem>,
}

/// Append-only hybrid index. Positions in the vector index line up with
/// `items`; both are only mutated together under the write lock.
pub struct SimilarityIndex {
    embedder: Arc<dyn EmbeddingAdapter>,
    hybrid: HybridConfig,
    dimensions: usize,
    inner: RwLock<IndexInner>,
}

impl SimilarityIndex {
    pub fn new(
        embedder: Arc<dyn EmbeddingAdapter>,
        vectors: Box<dyn VectorIndex>,
        hybrid: HybridConfig,
    ) -> Self {
        Self {
            embedder,
            hybrid,
            dimensions: vectors.dimensions(),
            inner: RwLock::new(IndexInner {
                vectors,
                items: Vec::new(),
            }),
        }
    }

    /// Hybrid index backed by a [`FlatIpIndex`] of `dimensions`.
    pub fn flat(
        embedder: Arc<dyn EmbeddingAdapter>,
        dimensions: usize,
        hybrid: HybridConfig,
    ) -> Self {
        Self::new(embedder, Box::new(FlatIpIndex::new(dimensions)), hybrid)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Embed and append entries in one step.
    pub async fn add(&self, entries: &[MemoryEntry]) -> Result<(), RecollectError> {
        let batch = self.prepare(entries).await?;
        self.append(batch).await
    }

    /// Embed entries without touching the index.
    ///
    /// Every failure mode of indexing (embedder error, wrong vector count,
    /// wrong dimension) surfaces here, so a prepared batch always appends.
    pub async fn prepare(&self, entries: &[MemoryEntry]) -> Result<PreparedBatch, RecollectError> {
        if entries.is_empty() {
            return Ok(PreparedBatch::default());
        }
        let texts: Vec<String> = entries.iter().map(MemoryEntry::canonical_text).collect();
        let output = self.embedder.embed(EmbeddingInput { texts }).await?;
        if output.embeddings.len() != entries.len() {
            return Err(RecollectError::Embedding {
                message: format!(
                    "embedder returned {} vectors for {} entries",
                    output.embeddings.len(),
                    entries.len()
                ),
                source: None,
            });
        }
        if let Some(bad) = output.embeddings.iter().find(|v| v.len() != self.dimensions) {
            return Err(RecollectError::Embedding {
                message: format!(
                    "vector has {} dimensions, index expects {}",
                    bad.len(),
                    self.dimensions
                ),
                source: None,
            });
        }

        let vectors: Vec<Vec<f32>> = output.embeddings.iter().map(|v| l2_normalize(v)).collect();
        let items: Vec<IndexedItem> = entries
            .iter()
            .map(|e| IndexedItem {
                id: e.id.clone(),
                terms: tokenize(&e.canonical_text()),
            })
            .collect();
        Ok(PreparedBatch { vectors, items })
    }

    /// Append a prepared batch under the write lock.
    pub async fn append(&self, batch: PreparedBatch) -> Result<(), RecollectError> {
        if batch.items.is_empty() {
            return Ok(());
        }
        let added = batch.items.len();
        let mut inner = self.inner.write().await;
        inner.vectors.add(&batch.vectors)?;
        inner.items.extend(batch.items);
        debug!(added, total = inner.items.len(), "indexed entries");
        Ok(())
    }

    /// Up to `top_k` `(id, hybrid score)` pairs, best first.
    ///
    /// 1. Embeds the query
    /// 2. Takes `top_k * oversample` semantic neighbors, capped at the index size
    /// 3. Scores every indexed entry lexically against the query terms
    /// 4. Candidates are the semantic neighbors plus every lexical hit
    /// 5. Blends `w_sem * max(semantic, 0) + w_lex * min(lexical, 1)`
    /// 6. Sorts descending (ties by insertion position), dedups by id
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<(String, f64)>, RecollectError> {
        if top_k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }

        // Step 1: Embed the query
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await?;
        let query_vector = output
            .embeddings
            .into_iter()
            .next()
            .map(|v| l2_normalize(&v))
            .ok_or_else(|| RecollectError::Internal("embedding returned no results".into()))?;

        let inner = self.inner.read().await;
        let size = inner.items.len();
        if size == 0 {
            return Ok(Vec::new());
        }

        // Step 2: Semantic neighbors
        let k = top_k.saturating_mul(self.hybrid.oversample.max(1)).min(size);
        let mut semantic: BTreeMap<usize, f32> =
            inner.vectors.search(&query_vector, k).into_iter().collect();

        // Steps 3-4: Lexical scores, pulling lexical hits into the candidate set
        let query_terms = tokenize(query);
        let mut lexical = vec![0.0_f64; size];
        for (pos, item) in inner.items.iter().enumerate() {
            let score = lexical_score(&query_terms, &item.terms);
            lexical[pos] = score;
            if score > 0.0 && !semantic.contains_key(&pos) {
                let sem = inner.vectors.score(&query_vector, pos).unwrap_or(0.0);
                semantic.insert(pos, sem);
            }
        }

        // Step 5: Blend
        let mut scored: Vec<(usize, f64)> = semantic
            .into_iter()
            .map(|(pos, sem)| {
                let hybrid = self.hybrid.semantic_weight * f64::from(sem).max(0.0)
                    + self.hybrid.lexical_weight * lexical[pos].min(1.0);
                (pos, hybrid)
            })
            .collect();

        // Step 6: Order and dedup
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        let mut seen = HashSet::new();
        let results: Vec<(String, f64)> = scored
            .into_iter()
            .filter_map(|(pos, score)| {
                let id = &inner.items[pos].id;
                seen.insert(id.as_str()).then(|| (id.clone(), score))
            })
            .take(top_k)
            .collect();
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashEmbedder;
    use recollect_core::MemoryKind;

    fn index() -> SimilarityIndex {
        SimilarityIndex::flat(
            Arc::new(HashEmbedder::new(128)),
            128,
            HybridConfig::default(),
        )
    }

    fn terms(text: &str) -> Vec<String> {
        tokenize(text)
    }

    #[test]
    fn flat_index_orders_by_inner_product() {
        let mut flat = FlatIpIndex::new(2);
        flat.add(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]]).unwrap();
        let hits = flat.search(&[0.0, 1.0], 2);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 2);
        assert_eq!(flat.score(&[1.0, 0.0], 2), Some(0.6));
        assert_eq!(flat.score(&[1.0, 0.0], 9), None);
    }

    #[test]
    fn flat_index_rejects_wrong_dimension_atomically() {
        let mut flat = FlatIpIndex::new(2);
        let err = flat.add(&[vec![1.0, 0.0], vec![1.0]]);
        assert!(err.is_err());
        assert!(flat.is_empty());
    }

    #[test]
    fn lexical_score_counts_substring_hits() {
        let entry = terms("preference|call_time=after 9 am");
        // entry terms: preference, call, time, after, 9, am
        let score = lexical_score(&terms("call"), &entry);
        assert!((score - 1.0 / 6.0).abs() < 1e-9);
        assert_eq!(lexical_score(&terms("zebra"), &entry), 0.0);
        assert_eq!(lexical_score(&[], &entry), 0.0);
    }

    #[tokio::test]
    async fn empty_index_returns_empty() {
        let idx = index();
        assert!(idx.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_keyword_ranks_first() {
        let idx = index();
        let entries = vec![
            MemoryEntry::new(MemoryKind::Fact, "meeting_time", "3 pm", 1, 0.9),
            MemoryEntry::new(MemoryKind::Preference, "language", "rust", 2, 0.9),
            MemoryEntry::new(MemoryKind::Fact, "deadline", "friday", 3, 0.9),
        ];
        idx.add(&entries).await.unwrap();
        let hits = idx.search("preferred language", 2).await.unwrap();
        assert_eq!(hits[0].0, entries[1].id);
        assert!(hits.len() <= 2);
    }

    #[tokio::test]
    async fn results_are_deduplicated_by_id() {
        let idx = index();
        let entry = MemoryEntry::new(MemoryKind::Fact, "deadline", "friday", 3, 0.9);
        idx.add(std::slice::from_ref(&entry)).await.unwrap();
        idx.add(std::slice::from_ref(&entry)).await.unwrap();
        let hits = idx.search("deadline", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(idx.len().await, 2);
    }

    #[tokio::test]
    async fn scores_stay_in_unit_range() {
        let idx = index();
        let entries: Vec<_> = (0..20)
            .map(|i| MemoryEntry::new(MemoryKind::Fact, format!("k{i}"), format!("value {i}"), i, 0.9))
            .collect();
        idx.add(&entries).await.unwrap();
        for (_, score) in idx.search("value k3", 10).await.unwrap() {
            assert!((0.0..=1.0 + 1e-9).contains(&score), "score {score}");
        }
    }

    #[tokio::test]
    async fn prepare_rejects_mismatched_embedder_before_append() {
        let idx = SimilarityIndex::flat(Arc::new(HashEmbedder::new(64)), 128, HybridConfig::default());
        let entry = MemoryEntry::new(MemoryKind::Fact, "deadline", "friday", 3, 0.9);
        assert!(matches!(
            idx.prepare(&[entry]).await,
            Err(RecollectError::Embedding { .. })
        ));
        assert!(idx.is_empty().await);
    }

    #[tokio::test]
    async fn prepared_batch_is_invisible_until_appended() {
        let idx = index();
        let entry = MemoryEntry::new(MemoryKind::Fact, "deadline", "friday", 3, 0.9);
        let batch = idx.prepare(std::slice::from_ref(&entry)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(idx.search("deadline", 5).await.unwrap().is_empty());

        idx.append(batch).await.unwrap();
        assert_eq!(idx.search("deadline", 5).await.unwrap()[0].0, entry.id);
    }
}

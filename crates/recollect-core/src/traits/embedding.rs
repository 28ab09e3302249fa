// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter and nearest-neighbor index traits.

use async_trait::async_trait;

use crate::error::RecollectError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for turning text into fixed-dimension vectors.
///
/// A single text is embedded as a batch of one.
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Generates one embedding per input text, in input order.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecollectError>;
}

/// Nearest-neighbor search over an append-only set of vectors.
///
/// Positions are assigned in insertion order starting at zero. Callers hold
/// whatever lock guards the index; implementations are plain data structures.
pub trait VectorIndex: Send + Sync {
    /// Dimension every added vector must have.
    fn dimensions(&self) -> usize;

    /// Append vectors. Fails on a dimension mismatch without adding any.
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), RecollectError>;

    /// Up to `k` `(position, score)` pairs ordered by descending score.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)>;

    /// Score of one stored vector against `query`, if the position exists.
    fn score(&self, query: &[f32], position: usize) -> Option<f32>;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

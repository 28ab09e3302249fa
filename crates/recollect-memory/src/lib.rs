// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval and conflict-resolution engine for Recollect.
//!
//! ## Architecture
//!
//! - **HashEmbedder / HttpEmbedder**: text to normalized vectors
//! - **SimilarityIndex**: semantic neighbors blended with lexical matches
//! - **DecayPolicy**: age cutoff and exponential decay by turns
//! - **ConflictResolver**: one survivor per `(kind, key)`
//! - **Reranker**: semantic, fuzzy, overlap and kind signals
//! - **ExtractionOrchestrator**: cache, circuit breaker and pattern fallback
//! - **MemoryEngine**: `process_turn` / `retrieve` with a background ingest worker

pub mod conflict;
pub mod embedder;
pub mod engine;
pub mod extraction;
pub mod index;
pub mod inject;
pub mod recording;
pub mod rerank;
pub mod scoring;

pub use conflict::{ConflictResolver, ScoredCandidate};
pub use embedder::{HashEmbedder, HttpEmbedder};
pub use engine::{CommitHandle, MemoryEngine, RetrievalOutcome, TurnOutcome};
pub use extraction::{
    ExtractionCache, ExtractionOrchestrator, ExtractionOutcome, ExtractionPath,
    HttpExtractionProvider,
};
pub use index::{FlatIpIndex, PreparedBatch, SimilarityIndex};
pub use inject::format_injection;
pub use rerank::Reranker;
pub use scoring::DecayPolicy;

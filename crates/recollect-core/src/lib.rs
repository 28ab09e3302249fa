// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Recollect memory engine.
//!
//! This crate provides the error type, the memory domain types, and the
//! adapter traits every boundary implementation (stores, embedders,
//! extraction providers) is written against.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RecollectError;
pub use types::{
    AdapterType, CandidateFact, EmbeddingInput, EmbeddingOutput, HealthStatus, MemoryEntry,
    MemoryKind, RankedResult, tokenize, truncate_chars,
};

pub use traits::{
    EmbeddingAdapter, EntryStore, ExtractionCacheBackend, ExtractionProvider, PluginAdapter,
    VectorIndex,
};

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the external boundaries of the engine.
//!
//! Async adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod embedding;
pub mod extraction;
pub mod storage;

pub use adapter::PluginAdapter;
pub use embedding::{EmbeddingAdapter, VectorIndex};
pub use extraction::ExtractionProvider;
pub use storage::{EntryStore, ExtractionCacheBackend};

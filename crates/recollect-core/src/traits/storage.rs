// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for memory entries and the extraction cache.

use async_trait::async_trait;

use crate::error::RecollectError;
use crate::traits::adapter::PluginAdapter;
use crate::types::MemoryEntry;

/// Durable, id-keyed collection of memory entries.
///
/// The store holds no query logic. Each call is atomic: either every entry
/// in an `upsert` batch is written or none is.
#[async_trait]
pub trait EntryStore: PluginAdapter {
    /// Insert entries, overwriting `value`, `use_count`, `last_used_turn`
    /// and `meta` of any row with the same id.
    async fn upsert(&self, entries: &[MemoryEntry]) -> Result<(), RecollectError>;

    /// Every stored entry, ordered by source turn.
    async fn load_all(&self) -> Result<Vec<MemoryEntry>, RecollectError>;
}

/// Backing storage for the extraction result cache.
///
/// Keys are opaque strings derived by the cache; payloads are the entries
/// an extraction produced for that key (possibly none).
#[async_trait]
pub trait ExtractionCacheBackend: PluginAdapter {
    /// All cached results, used once to warm the in-memory cache.
    async fn load_all(&self) -> Result<Vec<(String, Vec<MemoryEntry>)>, RecollectError>;

    /// Store or replace the result for `key`.
    async fn put(&self, key: &str, entries: &[MemoryEntry]) -> Result<(), RecollectError>;
}

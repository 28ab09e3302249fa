// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction result cache keyed by `(turn, exact text)`.
//!
//! Unbounded and write-through: every insert also goes to the optional
//! persistent backend so results survive restarts.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use recollect_core::{ExtractionCacheBackend, MemoryEntry, RecollectError};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Stable cache key for a turn: hex SHA-256 of `"{turn}:{text}"`.
pub fn cache_key(turn: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{turn}:{text}").as_bytes());
    hex::encode(hasher.finalize())
}

pub struct ExtractionCache {
    entries: RwLock<HashMap<String, Vec<MemoryEntry>>>,
    backend: Option<Arc<dyn ExtractionCacheBackend>>,
}

impl ExtractionCache {
    /// Cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            backend: None,
        }
    }

    /// Warm the cache from `backend` and write through to it from now on.
    pub async fn load(backend: Arc<dyn ExtractionCacheBackend>) -> Result<Self, RecollectError> {
        let rows = backend.load_all().await?;
        info!(entries = rows.len(), backend = backend.name(), "extraction cache loaded");
        Ok(Self {
            entries: RwLock::new(rows.into_iter().collect()),
            backend: Some(backend),
        })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached entries for this turn and text, rebuilt with fresh ids.
    pub fn get(&self, turn: u64, text: &str) -> Option<Vec<MemoryEntry>> {
        let key = cache_key(turn, text);
        let hit = self
            .read()
            .get(&key)
            .map(|entries| entries.iter().map(MemoryEntry::fresh_copy).collect::<Vec<_>>());
        if hit.is_some() {
            debug!(turn, "extraction cache hit");
        }
        hit
    }

    /// Remember `entries` for this turn and text.
    ///
    /// A backend write failure is logged and otherwise ignored: the cache
    /// only saves work and never holds the durable copy of an entry.
    pub async fn put(&self, turn: u64, text: &str, entries: &[MemoryEntry]) {
        let key = cache_key(turn, text);
        self.write().insert(key.clone(), entries.to_vec());
        if let Some(backend) = &self.backend
            && let Err(e) = backend.put(&key, entries).await
        {
            warn!(error = %e, turn, "failed to persist extraction cache entry");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<MemoryEntry>>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<MemoryEntry>>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory entry store for deterministic testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use recollect_core::{
    AdapterType, EntryStore, HealthStatus, MemoryEntry, PluginAdapter, RecollectError,
};
use tokio::sync::Mutex;

/// Entry store backed by a vector, keeping insertion order.
///
/// Writes can be made to fail on demand to exercise persistence error paths.
#[derive(Default)]
pub struct InMemoryEntryStore {
    rows: Mutex<Vec<MemoryEntry>>,
    fail_writes: AtomicBool,
    upserts: AtomicUsize,
}

impl InMemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `entries`, as if persisted by an earlier run.
    pub fn with_entries(entries: Vec<MemoryEntry>) -> Self {
        Self {
            rows: Mutex::new(entries),
            ..Self::default()
        }
    }

    /// Make every subsequent `upsert` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `upsert` calls, including failed ones.
    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored rows.
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.rows.lock().await.clone()
    }

    /// Stored row with `id`, if any.
    pub async fn get(&self, id: &str) -> Option<MemoryEntry> {
        self.rows.lock().await.iter().find(|e| e.id == id).cloned()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryEntryStore {
    fn name(&self) -> &str {
        "in-memory-entries"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Ok(HealthStatus::Degraded("writes are failing".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn upsert(&self, entries: &[MemoryEntry]) -> Result<(), RecollectError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RecollectError::Storage {
                source: "injected write failure".into(),
            });
        }

        let mut rows = self.rows.lock().await;
        for entry in entries {
            match rows.iter_mut().find(|row| row.id == entry.id) {
                Some(row) => *row = entry.clone(),
                None => rows.push(entry.clone()),
            }
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<MemoryEntry>, RecollectError> {
        Ok(self.rows.lock().await.clone())
    }
}

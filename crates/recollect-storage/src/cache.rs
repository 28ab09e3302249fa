// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite backing table for the extraction result cache.

use async_trait::async_trait;
use recollect_core::{
    AdapterType, ExtractionCacheBackend, HealthStatus, MemoryEntry, PluginAdapter, RecollectError,
};
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};

/// Cached extraction results in the `extraction_cache` table.
#[derive(Clone)]
pub struct SqliteCacheBackend {
    db: Database,
}

impl SqliteCacheBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PluginAdapter for SqliteCacheBackend {
    fn name(&self) -> &str {
        "sqlite-extraction-cache"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        self.db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM extraction_cache", [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ExtractionCacheBackend for SqliteCacheBackend {
    async fn load_all(&self) -> Result<Vec<(String, Vec<MemoryEntry>)>, RecollectError> {
        let rows = self
            .db
            .connection()
            .call(|conn| -> Result<Vec<(String, String)>, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT cache_key, payload FROM extraction_cache")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(map_tr_err)?;

        // A corrupt payload costs one re-extraction, not startup.
        let mut results = Vec::with_capacity(rows.len());
        for (key, payload) in rows {
            match serde_json::from_str::<Vec<MemoryEntry>>(&payload) {
                Ok(entries) => results.push((key, entries)),
                Err(e) => warn!(key = %key, error = %e, "skipping unreadable extraction cache row"),
            }
        }
        debug!(count = results.len(), "loaded extraction cache");
        Ok(results)
    }

    async fn put(&self, key: &str, entries: &[MemoryEntry]) -> Result<(), RecollectError> {
        let key = key.to_string();
        let payload = serde_json::to_string(entries).map_err(RecollectError::storage)?;
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO extraction_cache (cache_key, payload) VALUES (?1, ?2)
                     ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload",
                    rusqlite::params![key, payload],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

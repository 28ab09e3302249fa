// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`EntryStore`] trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use recollect_core::{
    AdapterType, EntryStore, HealthStatus, MemoryEntry, MemoryKind, PluginAdapter, RecollectError,
};
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};

const SELECT_COLUMNS: &str = "memory_id, kind, key, value, source_turn, confidence, source_text, last_used_turn, use_count, meta";

/// Memory entries persisted in the `memories` table.
///
/// Holds no query logic beyond id-keyed upsert and a full scan.
#[derive(Clone)]
pub struct SqliteEntryStore {
    db: Database,
}

impl SqliteEntryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// A row ready to bind: the entry plus its serialized meta bag.
struct EntryRow {
    entry: MemoryEntry,
    meta_json: String,
}

#[async_trait]
impl PluginAdapter for SqliteEntryStore {
    fn name(&self) -> &str {
        "sqlite-entries"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        let counted = self
            .db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))
            })
            .await;
        match counted {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => {
                let e = map_tr_err(e);
                warn!(error = %e, "memories table unreadable");
                Ok(HealthStatus::Unhealthy(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn upsert(&self, entries: &[MemoryEntry]) -> Result<(), RecollectError> {
        if entries.is_empty() {
            return Ok(());
        }

        let rows = entries
            .iter()
            .map(|entry| -> Result<EntryRow, serde_json::Error> {
                Ok(EntryRow {
                    entry: entry.clone(),
                    meta_json: serde_json::to_string(&entry.meta)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(RecollectError::storage)?;
        let count = rows.len();

        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare_cached(
                        "INSERT INTO memories (memory_id, kind, key, value, source_turn, confidence, source_text, last_used_turn, use_count, meta)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                         ON CONFLICT(memory_id) DO UPDATE SET
                             value = excluded.value,
                             use_count = excluded.use_count,
                             last_used_turn = excluded.last_used_turn,
                             meta = excluded.meta",
                    )?;
                    for row in &rows {
                        let e = &row.entry;
                        stmt.execute(rusqlite::params![
                            e.id,
                            e.kind.as_str(),
                            e.key,
                            e.value,
                            e.source_turn as i64,
                            e.confidence,
                            e.source_text,
                            e.last_used_turn.map(|t| t as i64),
                            e.use_count as i64,
                            row.meta_json,
                        ])?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(map_tr_err)?;

        debug!(count, "upserted memory entries");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<MemoryEntry>, RecollectError> {
        self.db
            .connection()
            .call(|conn| -> Result<Vec<MemoryEntry>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM memories ORDER BY source_turn, rowid"
                );
                let mut stmt = conn.prepare(&sql)?;
                let entries = stmt
                    .query_map([], row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert a SQLite row to a [`MemoryEntry`].
fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<MemoryEntry, rusqlite::Error> {
    let kind_str: String = row.get(1)?;
    let kind: MemoryKind = kind_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let meta_json: String = row.get(9)?;
    let meta: BTreeMap<String, String> = serde_json::from_str(&meta_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(MemoryEntry {
        id: row.get(0)?,
        kind,
        key: row.get(2)?,
        value: row.get(3)?,
        source_turn: row.get::<_, i64>(4)? as u64,
        confidence: row.get(5)?,
        source_text: row.get(6)?,
        last_used_turn: row.get::<_, Option<i64>>(7)?.map(|t| t as u64),
        use_count: row.get::<_, i64>(8)? as u64,
        meta,
    })
}

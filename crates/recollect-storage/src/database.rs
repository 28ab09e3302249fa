// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes; clone the
//! [`Database`] handle instead.

use std::path::Path;
use std::time::Duration;

use recollect_config::model::StorageConfig;
use recollect_core::RecollectError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into [`RecollectError::Storage`].
///
/// The wrapped error can hold the background connection and is not `Sync`,
/// so only its message is kept.
pub(crate) fn map_tr_err<E>(err: tokio_rusqlite::Error<E>) -> RecollectError
where
    E: std::fmt::Display + std::fmt::Debug,
{
    RecollectError::Storage {
        source: err.to_string().into(),
    }
}

/// Handle to the SQLite database shared by the entry store and cache backend.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database described by `config`, apply
    /// PRAGMAs, and run pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, RecollectError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(RecollectError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(RecollectError::storage)?;
        let db = Self { conn };
        db.configure(config.wal_mode).await?;
        db.migrate().await?;
        info!(path = %config.database_path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, RecollectError> {
        let conn = Connection::open_in_memory().await.map_err(RecollectError::storage)?;
        let db = Self { conn };
        db.configure(false).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), RecollectError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn configure(&self, wal_mode: bool) -> Result<(), RecollectError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(Duration::from_secs(5))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn migrate(&self) -> Result<(), RecollectError> {
        self.conn
            .call(|conn| -> Result<(), refinery::Error> { run_migrations(conn) })
            .await
            .map_err(map_tr_err)
    }
}

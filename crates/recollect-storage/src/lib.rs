// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Recollect memory engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. One [`Database`]
//! handle backs both the entry store and the extraction cache.

pub mod cache;
pub mod database;
pub mod entries;
pub mod migrations;

pub use cache::SqliteCacheBackend;
pub use database::Database;
pub use entries::SqliteEntryStore;

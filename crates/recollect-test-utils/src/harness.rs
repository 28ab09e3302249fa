// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete engine over mock adapters: a hash
//! embedder, an in-memory or temp SQLite entry store, and optionally a
//! scripted extraction provider in front of the fallback extractor.

use std::sync::Arc;

use recollect_config::model::{RecollectConfig, RetrievalConfig, StorageConfig};
use recollect_core::{EmbeddingAdapter, EntryStore, MemoryEntry, RecollectError};
use recollect_memory::{
    ExtractionCache, ExtractionOrchestrator, HashEmbedder, MemoryEngine, SimilarityIndex,
};
use recollect_storage::{Database, SqliteEntryStore};

use crate::mock_extractor::{ScriptedExtractionProvider, ScriptedResponse};
use crate::mock_store::InMemoryEntryStore;

const TEST_DIMENSIONS: usize = 256;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    retrieval: RetrievalConfig,
    script: Option<Vec<ScriptedResponse>>,
    seeded: Vec<MemoryEntry>,
    sqlite: bool,
    cache: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            retrieval: RetrievalConfig::recommended(),
            script: None,
            seeded: Vec::new(),
            sqlite: false,
            cache: true,
        }
    }

    /// Override the retrieval parameters.
    pub fn with_retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.retrieval = retrieval;
        self
    }

    /// Put a scripted extraction provider in front of the fallback extractor.
    pub fn with_provider_script(mut self, script: Vec<ScriptedResponse>) -> Self {
        self.script = Some(script);
        self
    }

    /// Entries persisted before the engine starts.
    pub fn with_seeded_entries(mut self, entries: Vec<MemoryEntry>) -> Self {
        self.seeded = entries;
        self
    }

    /// Persist to a temp SQLite database instead of the in-memory store.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Disable the extraction cache.
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, RecollectError> {
        let temp_dir = tempfile::TempDir::new().map_err(RecollectError::storage)?;

        let mut config = RecollectConfig::with_retrieval(self.retrieval);
        config.extraction.cache_enabled = self.cache;
        config.embedding.dimensions = TEST_DIMENSIONS;

        // Entry store: temp SQLite file or the injectable in-memory store.
        let (store, memory_store): (Arc<dyn EntryStore>, Option<Arc<InMemoryEntryStore>>) =
            if self.sqlite {
                config.storage = StorageConfig {
                    database_path: temp_dir
                        .path()
                        .join("test.db")
                        .to_string_lossy()
                        .into_owned(),
                    wal_mode: true,
                };
                let db = Database::open(&config.storage).await?;
                (Arc::new(SqliteEntryStore::new(db)), None)
            } else {
                let store = Arc::new(InMemoryEntryStore::new());
                (store.clone(), Some(store))
            };

        if !self.seeded.is_empty() {
            store.upsert(&self.seeded).await?;
        }

        let provider = self.script.map(ScriptedExtractionProvider::with_script);
        let engine = assemble(&config, store.clone(), provider.clone()).await?;

        Ok(TestHarness {
            engine,
            store,
            memory_store,
            provider,
            config,
            _temp_dir: temp_dir,
        })
    }
}

async fn assemble(
    config: &RecollectConfig,
    store: Arc<dyn EntryStore>,
    provider: Option<ScriptedExtractionProvider>,
) -> Result<MemoryEngine, RecollectError> {
    let embedder: Arc<dyn EmbeddingAdapter> =
        Arc::new(HashEmbedder::new(config.embedding.dimensions));
    let index = SimilarityIndex::flat(
        embedder,
        config.embedding.dimensions,
        config.retrieval.hybrid.clone(),
    );

    let cache = config
        .extraction
        .cache_enabled
        .then(ExtractionCache::in_memory);
    let mut orchestrator = ExtractionOrchestrator::new(&config.extraction, cache);
    if let Some(provider) = provider {
        orchestrator = orchestrator.with_provider(Arc::new(provider));
    }

    MemoryEngine::start(config, store, index, orchestrator).await
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The engine under test.
    pub engine: MemoryEngine,
    /// Entry store the engine persists to.
    pub store: Arc<dyn EntryStore>,
    /// The in-memory store, when SQLite was not requested.
    pub memory_store: Option<Arc<InMemoryEntryStore>>,
    /// The scripted provider, when one was requested.
    pub provider: Option<ScriptedExtractionProvider>,
    /// Effective configuration.
    pub config: RecollectConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Make writes to the in-memory store fail. No-op for SQLite harnesses.
    pub fn fail_writes(&self, fail: bool) {
        if let Some(store) = &self.memory_store {
            store.set_fail_writes(fail);
        }
    }

    /// Shut the engine down and start a new one over the same store,
    /// simulating a process restart.
    pub async fn restart(self) -> Result<Self, RecollectError> {
        self.engine.shutdown().await?;
        let engine = assemble(&self.config, self.store.clone(), self.provider.clone()).await?;
        Ok(Self { engine, ..self })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recollect_core::MemoryKind;

    #[tokio::test]
    async fn builds_with_defaults() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(harness.engine.current_turn(), 0);
        assert_eq!(harness.engine.entry_count().await, 0);
        assert!(harness.memory_store.is_some());
        assert!(harness.provider.is_none());
        harness.engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn seeded_entries_survive_restart_on_sqlite() {
        let harness = TestHarness::builder()
            .with_sqlite()
            .with_seeded_entries(vec![MemoryEntry::new(
                MemoryKind::Fact,
                "deadline",
                "friday",
                7,
                0.9,
            )])
            .build()
            .await
            .unwrap();
        assert_eq!(harness.engine.entry_count().await, 1);
        assert_eq!(harness.engine.current_turn(), 7);

        let harness = harness.restart().await.unwrap();
        assert_eq!(harness.engine.entry_count().await, 1);
        assert_eq!(harness.engine.current_turn(), 7);
        harness.engine.shutdown().await.unwrap();
    }
}

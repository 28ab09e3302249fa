// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine assembly from configuration.

use std::sync::Arc;

use recollect_config::RecollectConfig;
use recollect_config::model::{EmbeddingProviderKind, ExtractionProviderKind};
use recollect_core::{
    EmbeddingAdapter, EntryStore, ExtractionCacheBackend, HealthStatus, PluginAdapter, RecollectError,
};
use recollect_memory::{
    ExtractionCache, ExtractionOrchestrator, HashEmbedder, HttpEmbedder, HttpExtractionProvider,
    MemoryEngine, SimilarityIndex,
};
use recollect_storage::{Database, SqliteCacheBackend, SqliteEntryStore};
use tracing::{info, warn};

/// Open storage, wire the adapters the config selects, and start the engine.
pub async fn open_engine(config: &RecollectConfig) -> Result<MemoryEngine, RecollectError> {
    recollect_memory::recording::register_metrics();

    let db = Database::open(&config.storage).await?;
    let store: Arc<dyn EntryStore> = Arc::new(SqliteEntryStore::new(db.clone()));
    match store.health_check().await? {
        HealthStatus::Healthy => {}
        HealthStatus::Degraded(reason) => warn!(store = store.name(), %reason, "store degraded"),
        HealthStatus::Unhealthy(reason) => {
            return Err(RecollectError::Storage {
                source: format!("{} unhealthy: {reason}", store.name()).into(),
            });
        }
    }

    let embedder: Arc<dyn EmbeddingAdapter> = match config.embedding.provider {
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(config.embedding.dimensions)),
        EmbeddingProviderKind::Http => Arc::new(HttpEmbedder::new(&config.embedding)?),
    };
    let index = SimilarityIndex::flat(
        embedder,
        config.embedding.dimensions,
        config.retrieval.hybrid.clone(),
    );

    let cache = if config.extraction.cache_enabled {
        let backend: Arc<dyn ExtractionCacheBackend> = Arc::new(SqliteCacheBackend::new(db));
        Some(ExtractionCache::load(backend).await?)
    } else {
        None
    };
    let mut orchestrator = ExtractionOrchestrator::new(&config.extraction, cache);
    if config.extraction.provider == ExtractionProviderKind::Http {
        orchestrator =
            orchestrator.with_provider(Arc::new(HttpExtractionProvider::new(&config.extraction)?));
    }

    info!(
        database = %config.storage.database_path,
        embedding = ?config.embedding.provider,
        extraction = ?config.extraction.provider,
        "opening memory engine"
    );
    MemoryEngine::start(config, store, index, orchestrator).await
}

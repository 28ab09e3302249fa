// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Recollect memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.
//!
//! Ambient sections (`agent`, `storage`, `embedding`, `extraction`, `ingest`)
//! fall back to compiled defaults. The `retrieval` section carries the
//! ranking parameters and has no defaults for its core fields: a deployment
//! must state them.

use serde::{Deserialize, Serialize};

/// Top-level Recollect configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecollectConfig {
    /// Process-level settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Entry store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ranking parameters. Required.
    pub retrieval: RetrievalConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Extraction orchestrator settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Background ingest queue settings.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl RecollectConfig {
    /// Build a config from explicit retrieval parameters and ambient defaults.
    pub fn with_retrieval(retrieval: RetrievalConfig) -> Self {
        Self {
            agent: AgentConfig::default(),
            storage: StorageConfig::default(),
            retrieval,
            embedding: EmbeddingConfig::default(),
            extraction: ExtractionConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("recollect").join("recollect.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("recollect.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Retrieval and ranking configuration.
///
/// `top_k`, `rerank`, `decay_lambda`, `max_memory_age_turns` and
/// `max_injected_words` must be present. The sub-tables are optional and
/// default per field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Number of results returned per query.
    pub top_k: usize,

    /// Apply the multi-signal reranker. When false, results are ordered by
    /// decayed score alone.
    pub rerank: bool,

    /// Exponential decay rate per turn of age. Must be non-negative.
    pub decay_lambda: f64,

    /// Entries older than this many turns are never returned.
    pub max_memory_age_turns: u64,

    /// Word budget for the rendered injection context.
    pub max_injected_words: usize,

    /// Semantic/lexical blend used by the similarity index.
    #[serde(default)]
    pub hybrid: HybridConfig,

    /// Conflict resolution policy.
    #[serde(default)]
    pub conflict: ConflictConfig,

    /// Reranker signal weights.
    #[serde(default)]
    pub weights: RerankWeights,
}

impl RetrievalConfig {
    /// Parameters the engine was tuned with: six results, reranking on,
    /// lambda 0.008, a 1400-turn horizon and a 240-word injection budget.
    pub fn recommended() -> Self {
        Self {
            top_k: 6,
            rerank: true,
            decay_lambda: 0.008,
            max_memory_age_turns: 1400,
            max_injected_words: 240,
            hybrid: HybridConfig::default(),
            conflict: ConflictConfig::default(),
            weights: RerankWeights::default(),
        }
    }
}

/// Hybrid similarity blend.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HybridConfig {
    /// Weight of the semantic (inner product) component.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    /// Weight of the lexical (term frequency) component.
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    /// Semantic neighbors requested per result slot.
    #[serde(default = "default_oversample")]
    pub oversample: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            lexical_weight: default_lexical_weight(),
            oversample: default_oversample(),
        }
    }
}

fn default_semantic_weight() -> f64 {
    0.7
}

fn default_lexical_weight() -> f64 {
    0.3
}

fn default_oversample() -> usize {
    5
}

/// Conflict resolution policy for entries sharing `(kind, key)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConflictConfig {
    /// Confidence difference above which the more confident entry wins
    /// outright.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Score multiplier applied to the newer entry when confidences are
    /// within the threshold.
    #[serde(default = "default_recency_boost")]
    pub recency_boost: f64,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            recency_boost: default_recency_boost(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.1
}

fn default_recency_boost() -> f64 {
    1.1
}

/// Reranker signal weights.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RerankWeights {
    #[serde(default = "default_semantic_signal")]
    pub semantic: f64,
    #[serde(default = "default_fuzzy_signal")]
    pub fuzzy: f64,
    #[serde(default = "default_overlap_signal")]
    pub overlap: f64,
    #[serde(default = "default_kind_signal")]
    pub kind: f64,
}

impl RerankWeights {
    pub fn sum(&self) -> f64 {
        self.semantic + self.fuzzy + self.overlap + self.kind
    }
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            semantic: default_semantic_signal(),
            fuzzy: default_fuzzy_signal(),
            overlap: default_overlap_signal(),
            kind: default_kind_signal(),
        }
    }
}

fn default_semantic_signal() -> f64 {
    0.50
}

fn default_fuzzy_signal() -> f64 {
    0.25
}

fn default_overlap_signal() -> f64 {
    0.15
}

fn default_kind_signal() -> f64 {
    0.10
}

/// Which embedding provider backs the similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic local feature hashing. No network.
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProviderKind,

    /// Vector dimension. For `http` this must match the model's output.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Base URL of the embeddings API (required for `http`).
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key. `None` sends no Authorization header.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            dimensions: default_dimensions(),
            api_base: None,
            model: default_embedding_model(),
            api_key: None,
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Hash
}

fn default_dimensions() -> usize {
    384
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_timeout_ms() -> u64 {
    5000
}

/// Which extraction provider the orchestrator calls before falling back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProviderKind {
    /// Pattern rules only.
    Fallback,
    /// OpenAI-compatible chat completions endpoint.
    Http,
}

/// Extraction orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    #[serde(default = "default_extraction_provider")]
    pub provider: ExtractionProviderKind,

    /// Base URL of the chat completions API (required for `http`).
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default = "default_extraction_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call deadline for the provider.
    #[serde(default = "default_extraction_timeout_ms")]
    pub timeout_ms: u64,

    /// Provider candidates below this confidence are discarded.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Consecutive failures that open the circuit breaker.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before a trial call.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Cache extraction results by turn and text.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider: default_extraction_provider(),
            api_base: None,
            model: default_extraction_model(),
            api_key: None,
            timeout_ms: default_extraction_timeout_ms(),
            min_confidence: default_min_confidence(),
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
            cache_enabled: default_cache_enabled(),
        }
    }
}

fn default_extraction_provider() -> ExtractionProviderKind {
    ExtractionProviderKind::Fallback
}

fn default_extraction_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_extraction_timeout_ms() -> u64 {
    800
}

fn default_min_confidence() -> f64 {
    0.70
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_cache_enabled() -> bool {
    true
}

/// Background ingest queue configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IngestConfig {
    /// Pending commits before `process_turn` blocks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

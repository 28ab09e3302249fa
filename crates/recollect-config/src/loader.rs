// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./recollect.toml` > `~/.config/recollect/recollect.toml` >
//! `/etc/recollect/recollect.toml` with environment variable overrides via `RECOLLECT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::{
    AgentConfig, EmbeddingConfig, ExtractionConfig, IngestConfig, RecollectConfig, StorageConfig,
};

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults for the ambient sections
/// 2. `/etc/recollect/recollect.toml` (system-wide)
/// 3. `~/.config/recollect/recollect.toml` (user XDG config)
/// 4. `./recollect.toml` (local directory)
/// 5. `RECOLLECT_*` environment variables
pub fn load_config() -> Result<RecollectConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RecollectConfig, figment::Error> {
    ambient_defaults()
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RecollectConfig, figment::Error> {
    ambient_defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    ambient_defaults()
        .merge(Toml::file("/etc/recollect/recollect.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("recollect/recollect.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("recollect.toml"))
        .merge(env_provider())
}

/// Compiled defaults, one section at a time.
///
/// `retrieval` is deliberately absent so a config without it fails with a
/// missing-key error instead of silently ranking with built-in numbers.
pub fn ambient_defaults() -> Figment {
    Figment::new()
        .merge(Serialized::default("agent", AgentConfig::default()))
        .merge(Serialized::default("storage", StorageConfig::default()))
        .merge(Serialized::default("embedding", EmbeddingConfig::default()))
        .merge(Serialized::default("extraction", ExtractionConfig::default()))
        .merge(Serialized::default("ingest", IngestConfig::default()))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` because key names contain
/// underscores: `RECOLLECT_RETRIEVAL_DECAY_LAMBDA` must map to
/// `retrieval.decay_lambda`, not `retrieval.decay.lambda`. Sub-tables are
/// matched before their parent section.
fn env_provider() -> Env {
    Env::prefixed("RECOLLECT_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    const SECTIONS: &[&str] = &[
        "retrieval_hybrid_",
        "retrieval_conflict_",
        "retrieval_weights_",
        "retrieval_",
        "agent_",
        "storage_",
        "embedding_",
        "extraction_",
        "ingest_",
    ];

    for prefix in SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            let path = prefix.trim_end_matches('_').replace('_', ".");
            return format!("{path}.{rest}");
        }
    }
    key.to_string()
}

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as parameter ranges and provider endpoints.

use tracing::warn;

use crate::diagnostic::ConfigError;
use crate::model::{EmbeddingProviderKind, ExtractionProviderKind, RecollectConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RecollectConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.agent.log_level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let retrieval = &config.retrieval;
    if retrieval.top_k == 0 {
        fail("retrieval.top_k must be at least 1".to_string());
    }
    if !retrieval.decay_lambda.is_finite() || retrieval.decay_lambda < 0.0 {
        fail(format!(
            "retrieval.decay_lambda must be a non-negative number, got {}",
            retrieval.decay_lambda
        ));
    }
    if retrieval.max_injected_words == 0 {
        fail("retrieval.max_injected_words must be at least 1".to_string());
    }

    let hybrid = &retrieval.hybrid;
    for (name, weight) in [
        ("semantic_weight", hybrid.semantic_weight),
        ("lexical_weight", hybrid.lexical_weight),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            fail(format!(
                "retrieval.hybrid.{name} must be non-negative, got {weight}"
            ));
        }
    }
    if hybrid.oversample == 0 {
        fail("retrieval.hybrid.oversample must be at least 1".to_string());
    }

    let conflict = &retrieval.conflict;
    if !(0.0..=1.0).contains(&conflict.confidence_threshold) {
        fail(format!(
            "retrieval.conflict.confidence_threshold must be within [0, 1], got {}",
            conflict.confidence_threshold
        ));
    }
    if !conflict.recency_boost.is_finite() || conflict.recency_boost < 1.0 {
        fail(format!(
            "retrieval.conflict.recency_boost must be at least 1.0, got {}",
            conflict.recency_boost
        ));
    }

    let weights = &retrieval.weights;
    for (name, weight) in [
        ("semantic", weights.semantic),
        ("fuzzy", weights.fuzzy),
        ("overlap", weights.overlap),
        ("kind", weights.kind),
    ] {
        if !weight.is_finite() || weight < 0.0 {
            fail(format!(
                "retrieval.weights.{name} must be non-negative, got {weight}"
            ));
        }
    }

    let embedding = &config.embedding;
    if embedding.dimensions == 0 {
        fail("embedding.dimensions must be at least 1".to_string());
    }
    if embedding.provider == EmbeddingProviderKind::Http && blank(&embedding.api_base) {
        fail("embedding.api_base is required when embedding.provider = \"http\"".to_string());
    }

    let extraction = &config.extraction;
    if extraction.provider == ExtractionProviderKind::Http && blank(&extraction.api_base) {
        fail("extraction.api_base is required when extraction.provider = \"http\"".to_string());
    }
    if extraction.timeout_ms == 0 {
        fail("extraction.timeout_ms must be at least 1".to_string());
    }
    if !(0.0..=1.0).contains(&extraction.min_confidence) {
        fail(format!(
            "extraction.min_confidence must be within [0, 1], got {}",
            extraction.min_confidence
        ));
    }
    if extraction.failure_threshold == 0 {
        fail("extraction.failure_threshold must be at least 1".to_string());
    }

    if config.ingest.queue_capacity == 0 {
        fail("ingest.queue_capacity must be at least 1".to_string());
    }

    if errors.is_empty() {
        let sum = weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            warn!(sum, "retrieval.weights do not sum to 1.0; scores are not normalized");
        }
        Ok(())
    } else {
        Err(errors)
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RetrievalConfig;

    fn valid() -> RecollectConfig {
        RecollectConfig::with_retrieval(RetrievalConfig::recommended())
    }

    fn messages(config: &RecollectConfig) -> Vec<String> {
        match validate_config(config) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn recommended_config_is_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = valid();
        config.retrieval.top_k = 0;
        config.retrieval.decay_lambda = -0.5;
        config.ingest.queue_capacity = 0;

        let msgs = messages(&config);
        assert_eq!(msgs.len(), 3, "got {msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("retrieval.top_k")));
        assert!(msgs.iter().any(|m| m.contains("retrieval.decay_lambda")));
        assert!(msgs.iter().any(|m| m.contains("ingest.queue_capacity")));
    }

    #[test]
    fn zero_lambda_is_allowed() {
        let mut config = valid();
        config.retrieval.decay_lambda = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn recency_boost_below_one_is_rejected() {
        let mut config = valid();
        config.retrieval.conflict.recency_boost = 0.9;
        assert!(messages(&config)[0].contains("recency_boost"));
    }

    #[test]
    fn http_providers_need_an_endpoint() {
        let mut config = valid();
        config.extraction.provider = ExtractionProviderKind::Http;
        config.embedding.provider = EmbeddingProviderKind::Http;
        config.embedding.api_base = Some("  ".to_string());

        let msgs = messages(&config);
        assert!(msgs.iter().any(|m| m.contains("extraction.api_base")));
        assert!(msgs.iter().any(|m| m.contains("embedding.api_base")));

        config.extraction.api_base = Some("http://localhost:8080/v1".to_string());
        config.embedding.api_base = Some("http://localhost:8081/v1".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = valid();
        config.agent.log_level = "loud".to_string();
        assert!(messages(&config)[0].contains("agent.log_level"));
    }
}

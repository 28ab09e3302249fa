// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resilient extraction: cache, circuit breaker, timeout and fallback.
//!
//! Provider failure is never surfaced. Every path ends in a (possibly
//! empty) list of validated entries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use recollect_config::model::ExtractionConfig;
use recollect_core::{ExtractionProvider, MemoryEntry, RecollectError};
use recollect_resilience::{CircuitBreaker, CircuitBreakerConfig};
use strum::{Display, IntoStaticStr};
use tracing::{debug, warn};

use super::cache::ExtractionCache;
use super::fallback::fallback_extract;
use crate::recording;

/// Which path produced a turn's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionPath {
    /// Served from the result cache.
    Cache,
    /// Validated provider output.
    Provider,
    /// Pattern extractor, after a provider failure, empty result, open
    /// breaker, or because no provider is configured.
    Fallback,
}

/// Entries for one turn plus how they were produced.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub entries: Vec<MemoryEntry>,
    pub path: ExtractionPath,
}

pub struct ExtractionOrchestrator {
    provider: Option<Arc<dyn ExtractionProvider>>,
    cache: Option<ExtractionCache>,
    breaker: CircuitBreaker,
    timeout: Duration,
    min_confidence: f64,
}

impl ExtractionOrchestrator {
    /// Fallback-only orchestrator with the breaker and thresholds from
    /// `config`. Attach a provider with [`Self::with_provider`].
    pub fn new(config: &ExtractionConfig, cache: Option<ExtractionCache>) -> Self {
        Self {
            provider: None,
            cache,
            breaker: CircuitBreaker::new(
                "extraction",
                CircuitBreakerConfig {
                    failure_threshold: config.failure_threshold,
                    cooldown: Duration::from_secs(config.cooldown_secs),
                },
            ),
            timeout: Duration::from_millis(config.timeout_ms),
            min_confidence: config.min_confidence,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ExtractionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Extract entries from one turn.
    ///
    /// 1. Returns cached entries (with fresh ids) on a cache hit
    /// 2. Falls back when no provider is set or the breaker rejects the call
    /// 3. Calls the provider under the timeout and records the outcome
    /// 4. Validates candidates and drops those below the minimum confidence
    /// 5. Falls back when nothing survives
    /// 6. Caches whatever was produced
    pub async fn extract(&self, text: &str, turn: u64) -> ExtractionOutcome {
        let started = Instant::now();

        if let Some(entries) = self.cache.as_ref().and_then(|c| c.get(turn, text)) {
            return self.finish(entries, ExtractionPath::Cache, started);
        }

        let (entries, path) = match self.try_provider(text, turn).await {
            Some(entries) => (entries, ExtractionPath::Provider),
            None => (fallback_extract(text, turn), ExtractionPath::Fallback),
        };

        if let Some(cache) = &self.cache {
            cache.put(turn, text, &entries).await;
        }
        self.finish(entries, path, started)
    }

    /// Validated provider entries, or `None` when the fallback should run.
    async fn try_provider(&self, text: &str, turn: u64) -> Option<Vec<MemoryEntry>> {
        let provider = self.provider.as_ref()?;

        if !self.breaker.allow_request() {
            debug!(turn, "circuit open, using fallback extractor");
            return None;
        }

        let result = match tokio::time::timeout(self.timeout, provider.extract(text, turn)).await {
            Ok(result) => result,
            Err(_) => Err(RecollectError::Timeout {
                duration: self.timeout,
            }),
        };

        let candidates = match result {
            Ok(candidates) => {
                self.breaker.record_success();
                candidates
            }
            Err(e) => {
                warn!(
                    error = %e,
                    transient = e.is_transient(),
                    turn,
                    provider = provider.name(),
                    "extraction provider failed, using fallback"
                );
                if self.breaker.record_failure() {
                    recording::record_breaker_trip();
                }
                return None;
            }
        };

        let received = candidates.len();
        let entries: Vec<MemoryEntry> = candidates
            .into_iter()
            .filter_map(|candidate| match candidate.into_entry(turn, text) {
                Ok(entry) if entry.confidence >= self.min_confidence => {
                    Some(entry.with_meta("extractor", provider.name()))
                }
                Ok(entry) => {
                    debug!(key = %entry.key, confidence = entry.confidence, "dropping low-confidence candidate");
                    None
                }
                Err(e) => {
                    debug!(error = %e, "dropping invalid candidate");
                    None
                }
            })
            .collect();

        if entries.is_empty() {
            debug!(turn, received, "provider produced no usable entries, using fallback");
            return None;
        }
        Some(entries)
    }

    fn finish(
        &self,
        entries: Vec<MemoryEntry>,
        path: ExtractionPath,
        started: Instant,
    ) -> ExtractionOutcome {
        recording::record_extraction(path.into());
        recording::record_extraction_latency(started.elapsed().as_secs_f64());
        debug!(path = %path, count = entries.len(), "extraction complete");
        ExtractionOutcome { entries, path }
    }
}

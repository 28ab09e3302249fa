// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted extraction provider for deterministic testing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use recollect_core::{
    AdapterType, CandidateFact, ExtractionProvider, HealthStatus, PluginAdapter, RecollectError,
};
use tokio::sync::Mutex;

/// One scripted outcome of an `extract` call.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return these candidates.
    Facts(Vec<CandidateFact>),
    /// Fail with a transient extraction error carrying this message.
    Fail(String),
    /// Sleep for the duration, then return the candidates.
    Slow(Duration, Vec<CandidateFact>),
}

/// Extraction provider that replays scripted outcomes in FIFO order.
///
/// When the script runs out, calls return an empty candidate list.
#[derive(Clone, Default)]
pub struct ScriptedExtractionProvider {
    script: Arc<Mutex<VecDeque<ScriptedResponse>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedExtractionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with pre-queued outcomes.
    pub fn with_script(script: Vec<ScriptedResponse>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue another outcome.
    pub async fn push(&self, response: ScriptedResponse) {
        self.script.lock().await.push_back(response);
    }

    /// Queue `n` failures.
    pub async fn push_failures(&self, n: usize) {
        let mut script = self.script.lock().await;
        for i in 0..n {
            script.push_back(ScriptedResponse::Fail(format!("scripted failure {}", i + 1)));
        }
    }

    /// How many times `extract` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Convenience constructor for a scripted candidate.
pub fn candidate(kind: &str, key: &str, value: &str, confidence: f64) -> CandidateFact {
    CandidateFact {
        kind: kind.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        confidence,
    }
}

#[async_trait]
impl PluginAdapter for ScriptedExtractionProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extraction
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedExtractionProvider {
    async fn extract(&self, _text: &str, _turn: u64) -> Result<Vec<CandidateFact>, RecollectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().await.pop_front();
        match next {
            Some(ScriptedResponse::Facts(facts)) => Ok(facts),
            Some(ScriptedResponse::Fail(message)) => Err(RecollectError::Extraction {
                message,
                source: None,
            }),
            Some(ScriptedResponse::Slow(delay, facts)) => {
                tokio::time::sleep(delay).await;
                Ok(facts)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order_then_empty() {
        let provider = ScriptedExtractionProvider::with_script(vec![
            ScriptedResponse::Facts(vec![candidate("fact", "k", "v", 0.9)]),
            ScriptedResponse::Fail("boom".into()),
        ]);

        assert_eq!(provider.extract("a", 1).await.unwrap().len(), 1);
        let err = provider.extract("b", 2).await.unwrap_err();
        assert!(err.is_transient());
        assert!(provider.extract("c", 3).await.unwrap().is_empty());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn clones_share_script_and_counter() {
        let provider = ScriptedExtractionProvider::new();
        let handle = provider.clone();
        handle.push_failures(2).await;

        assert!(provider.extract("a", 1).await.is_err());
        assert!(provider.extract("a", 1).await.is_err());
        assert!(provider.extract("a", 1).await.is_ok());
        assert_eq!(handle.calls(), 3);
    }
}

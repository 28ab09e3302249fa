// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction provider trait.

use async_trait::async_trait;

use crate::error::RecollectError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CandidateFact;

/// An external source of candidate facts for one turn of text, typically a
/// remote language model.
///
/// An `Err` is a provider failure and counts against the circuit breaker.
/// A response that arrives but cannot be parsed is `Ok` with no candidates.
#[async_trait]
pub trait ExtractionProvider: PluginAdapter {
    async fn extract(&self, text: &str, turn: u64) -> Result<Vec<CandidateFact>, RecollectError>;
}

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types shared across the ingestion and retrieval paths.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::RecollectError;

/// Maximum number of characters of provenance text kept on an entry.
pub const SOURCE_TEXT_MAX_CHARS: usize = 240;

/// Closed set of memory kinds.
///
/// Extractor output naming any other kind is rejected at the ingestion
/// boundary and never reaches scoring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Preference,
    Fact,
    Entity,
    Constraint,
    Commitment,
    Instruction,
}

impl MemoryKind {
    /// All kinds, in declaration order.
    pub const ALL: [MemoryKind; 6] = [
        MemoryKind::Preference,
        MemoryKind::Fact,
        MemoryKind::Entity,
        MemoryKind::Constraint,
        MemoryKind::Commitment,
        MemoryKind::Instruction,
    ];

    /// Lowercase wire name, as used in canonical text and SQLite rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Preference => "preference",
            MemoryKind::Fact => "fact",
            MemoryKind::Entity => "entity",
            MemoryKind::Constraint => "constraint",
            MemoryKind::Commitment => "commitment",
            MemoryKind::Instruction => "instruction",
        }
    }

    /// Fixed priority used by the reranker's kind signal.
    ///
    /// Explicit constraints edge out softer preferences when otherwise tied.
    pub fn priority(&self) -> f64 {
        match self {
            MemoryKind::Constraint => 0.95,
            MemoryKind::Preference => 0.90,
            MemoryKind::Fact => 0.85,
            MemoryKind::Commitment => 0.80,
            MemoryKind::Entity | MemoryKind::Instruction => 0.50,
        }
    }
}

/// A single durable fact, preference, or constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique, immutable identifier assigned at creation.
    pub id: String,
    /// Closed kind of the entry.
    pub kind: MemoryKind,
    /// Logical identity within the kind (e.g. `call_time`).
    pub key: String,
    /// Free-text payload.
    pub value: String,
    /// Turn index that produced this entry.
    pub source_turn: u64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Truncated provenance snippet.
    #[serde(default)]
    pub source_text: String,
    /// Turn at which a query last returned this entry.
    #[serde(default)]
    pub last_used_turn: Option<u64>,
    /// Number of queries that returned this entry.
    #[serde(default)]
    pub use_count: u64,
    /// Annotation bag. Never read by ranking.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl MemoryEntry {
    /// Create a fresh entry with a new UUID and no usage history.
    pub fn new(
        kind: MemoryKind,
        key: impl Into<String>,
        value: impl Into<String>,
        source_turn: u64,
        confidence: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            key: key.into(),
            value: value.into(),
            source_turn,
            confidence,
            source_text: String::new(),
            last_used_turn: None,
            use_count: 0,
            meta: BTreeMap::new(),
        }
    }

    /// Attach provenance text, truncated to [`SOURCE_TEXT_MAX_CHARS`].
    pub fn with_source_text(mut self, text: &str) -> Self {
        self.source_text = truncate_chars(text, SOURCE_TEXT_MAX_CHARS);
        self
    }

    /// Attach a meta annotation.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Same content and metadata under a new id, with no usage history.
    pub fn fresh_copy(&self) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            last_used_turn: None,
            use_count: 0,
            ..self.clone()
        }
    }

    /// The `(kind, key)` pair that identifies "the same fact across updates".
    pub fn logical_identity(&self) -> (MemoryKind, &str) {
        (self.kind, self.key.as_str())
    }

    /// Canonical text representation: `"{kind}|{key}={value}"`.
    pub fn canonical_text(&self) -> String {
        format!("{}|{}={}", self.kind.as_str(), self.key, self.value)
    }

    /// Check the invariants every stored entry must satisfy.
    pub fn validate(&self) -> Result<(), RecollectError> {
        if self.id.trim().is_empty() {
            return Err(RecollectError::InvalidEntry("id must not be empty".to_string()));
        }
        if self.key.trim().is_empty() {
            return Err(RecollectError::InvalidEntry(format!(
                "entry {} has an empty key",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(RecollectError::InvalidEntry(format!(
                "entry {} has confidence {} outside [0, 1]",
                self.id, self.confidence
            )));
        }
        Ok(())
    }
}

/// A raw candidate as reported by an extraction provider.
///
/// Nothing here is trusted yet: the kind is an unchecked string and the
/// confidence may be out of range. [`CandidateFact::into_entry`] is the
/// ingestion boundary that turns a candidate into a [`MemoryEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFact {
    #[serde(alias = "type")]
    pub kind: String,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub confidence: f64,
}

impl CandidateFact {
    /// Validate the candidate and build an entry for `turn`.
    ///
    /// Rejects unknown kinds, blank keys or values, and confidences that are
    /// not finite or fall outside [0, 1].
    pub fn into_entry(self, turn: u64, source_text: &str) -> Result<MemoryEntry, RecollectError> {
        let kind: MemoryKind = self
            .kind
            .trim()
            .parse()
            .map_err(|_| RecollectError::InvalidEntry(format!("unknown kind '{}'", self.kind)))?;
        let key = self.key.trim();
        let value = self.value.trim();
        if key.is_empty() || value.is_empty() {
            return Err(RecollectError::InvalidEntry(
                "candidate has an empty key or value".to_string(),
            ));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(RecollectError::InvalidEntry(format!(
                "candidate {key} has confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(MemoryEntry::new(kind, key, value, turn, self.confidence).with_source_text(source_text))
    }
}

/// Query-scoped result produced by the retrieval path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// The surviving entry, with usage counters already updated.
    pub entry: MemoryEntry,
    /// Final combined relevance score. Not a probability.
    pub score: f64,
    /// Which scoring path produced the score.
    pub ranker: &'static str,
}

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays at a system boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Embedding,
    Storage,
    Extraction,
}

/// Lowercase alphanumeric terms of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

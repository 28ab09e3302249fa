// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Recollect memory engine.

use thiserror::Error;

/// The primary error type used across all Recollect adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RecollectError {
    /// Configuration errors (missing required parameters, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Entry store or cache backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Extraction provider errors (HTTP failure, rate limiting, unparseable output).
    #[error("extraction error: {message}")]
    Extraction {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding provider errors (model failure, dimension mismatch).
    #[error("embedding error: {message}")]
    Embedding {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An entry failed validation at the ingestion boundary.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The background ingest worker is no longer accepting work.
    #[error("ingest queue is closed")]
    IngestClosed,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecollectError {
    /// Wrap any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        RecollectError::Storage {
            source: Box::new(err),
        }
    }

    /// Whether this error is a transient external failure the extraction
    /// path absorbs rather than surfacing.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RecollectError::Extraction { .. } | RecollectError::Timeout { .. }
        )
    }
}

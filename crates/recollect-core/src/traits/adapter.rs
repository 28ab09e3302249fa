// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all boundary adapters implement.

use async_trait::async_trait;

use crate::error::RecollectError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all Recollect adapters.
///
/// Every adapter (embedding, storage, extraction) provides identity and a
/// health check.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the boundary this adapter serves.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, RecollectError>;
}

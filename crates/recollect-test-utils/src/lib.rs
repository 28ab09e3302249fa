// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Recollect integration tests.
//!
//! Provides mock adapters and a test harness for fast, deterministic tests
//! without external services.
//!
//! # Components
//!
//! - [`InMemoryEntryStore`] - Entry store with write-failure injection
//! - [`ScriptedExtractionProvider`] - Extraction provider replaying scripted outcomes
//! - [`TestHarness`] - Fully wired engine over mock adapters

pub mod harness;
pub mod mock_extractor;
pub mod mock_store;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_extractor::{ScriptedExtractionProvider, ScriptedResponse, candidate};
pub use mock_store::InMemoryEntryStore;

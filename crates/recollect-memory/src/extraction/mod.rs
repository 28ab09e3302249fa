// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning raw turn text into validated memory entries.

pub mod cache;
pub mod fallback;
pub mod http;
pub mod orchestrator;
pub mod parse;

pub use cache::{ExtractionCache, cache_key};
pub use fallback::fallback_extract;
pub use http::HttpExtractionProvider;
pub use orchestrator::{ExtractionOrchestrator, ExtractionOutcome, ExtractionPath};
pub use parse::parse_extraction_response;

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these metrics.
//! With no recorder installed every call is a no-op.

use metrics::{describe_counter, describe_histogram};

/// Describe all Recollect metrics to the current recorder.
///
/// The binary installs no exporter, so descriptions only reach a recorder
/// the embedding application has set. Without one they are discarded.
pub fn register_metrics() {
    describe_counter!(
        "recollect_extractions_total",
        "Turns processed by the extraction orchestrator, by path taken"
    );
    describe_counter!(
        "recollect_breaker_trips_total",
        "Times the extraction circuit breaker opened"
    );
    describe_counter!(
        "recollect_entries_committed_total",
        "Memory entries durably written by the ingest worker"
    );
    describe_histogram!(
        "recollect_retrieval_latency_seconds",
        "Wall time of retrieve() in seconds"
    );
    describe_histogram!(
        "recollect_extraction_latency_seconds",
        "Wall time of extraction for one turn in seconds"
    );
}

/// Record which path produced a turn's entries.
pub fn record_extraction(path: &'static str) {
    metrics::counter!("recollect_extractions_total", "path" => path).increment(1);
}

pub fn record_breaker_trip() {
    metrics::counter!("recollect_breaker_trips_total").increment(1);
}

pub fn record_committed(count: usize) {
    metrics::counter!("recollect_entries_committed_total").increment(count as u64);
}

pub fn record_retrieval_latency(seconds: f64) {
    metrics::histogram!("recollect_retrieval_latency_seconds").record(seconds);
}

pub fn record_extraction_latency(seconds: f64) {
    metrics::histogram!("recollect_extraction_latency_seconds").record(seconds);
}

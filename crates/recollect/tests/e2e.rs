// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the ingest and retrieval pipeline.
//!
//! Each test creates an isolated TestHarness with mock adapters. Tests are
//! independent and order-insensitive.

use std::time::{Duration, Instant};

use recollect_config::model::RetrievalConfig;
use recollect_core::{MemoryEntry, MemoryKind, RecollectError};
use recollect_memory::extraction::ExtractionPath;
use recollect_resilience::CircuitState;
use recollect_test_utils::{ScriptedResponse, TestHarness, candidate};

fn call_time(value: &str, turn: u64, confidence: f64) -> MemoryEntry {
    MemoryEntry::new(MemoryKind::Preference, "call_time", value, turn, confidence)
}

async fn ingest(harness: &TestHarness, lines: &[&str]) {
    for line in lines {
        let outcome = harness.engine.process_turn(line).await.unwrap();
        outcome.commit.wait().await.unwrap();
    }
}

// ---- Recency and conflicts ----

#[tokio::test]
async fn latest_call_time_wins_over_stale_values() {
    let harness = TestHarness::builder().build().await.unwrap();

    let handle = harness
        .engine
        .commit_entries(vec![
            call_time("after 9 AM", 10, 0.86),
            call_time("after 2 PM", 500, 0.86),
            call_time("between 4 PM and 6 PM", 950, 0.89),
        ])
        .await
        .unwrap();
    handle.wait().await.unwrap();
    harness.engine.advance_turn_to(1000);

    let outcome = harness.engine.retrieve("When can I call?").await.unwrap();
    assert_eq!(outcome.turn, 1000);
    assert_eq!(outcome.results.len(), 1, "one survivor per (kind, key)");
    assert_eq!(outcome.results[0].entry.source_turn, 950);
    assert_eq!(outcome.results[0].entry.value, "between 4 PM and 6 PM");
    assert!(
        outcome
            .injected_context
            .starts_with("- [preference] call_time=between 4 PM and 6 PM (turn 950, c=0.89)")
    );
}

#[tokio::test]
async fn entries_past_the_horizon_are_never_returned() {
    let retrieval = RetrievalConfig {
        max_memory_age_turns: 100,
        ..RetrievalConfig::recommended()
    };
    let harness = TestHarness::builder()
        .with_retrieval(retrieval)
        .build()
        .await
        .unwrap();

    harness
        .engine
        .commit_entries(vec![call_time("after 9 am", 1, 0.86)])
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    harness.engine.advance_turn_to(101);
    assert_eq!(harness.engine.retrieve("call").await.unwrap().results.len(), 1);

    harness.engine.advance_turn_to(102);
    let outcome = harness.engine.retrieve("call").await.unwrap();
    assert!(outcome.results.is_empty());
    assert!(outcome.injected_context.is_empty());
}

// ---- Usage tracking ----

#[tokio::test]
async fn retrieval_bumps_and_persists_usage() {
    let harness = TestHarness::builder().build().await.unwrap();
    ingest(&harness, &["My favorite color is teal"]).await;

    let first = harness.engine.retrieve("favorite color").await.unwrap();
    let second = harness.engine.retrieve("favorite color").await.unwrap();

    let id = &first.results[0].entry.id;
    assert_eq!(first.results[0].entry.use_count, 1);
    assert_eq!(second.results[0].entry.id, *id);
    assert_eq!(second.results[0].entry.use_count, 2);
    assert_eq!(second.results[0].entry.last_used_turn, Some(1));

    let stored = harness
        .memory_store
        .as_ref()
        .unwrap()
        .get(id)
        .await
        .unwrap();
    assert_eq!(stored.use_count, 2);
    assert_eq!(harness.engine.entry(id).await.unwrap().use_count, 2);
}

// ---- Determinism ----

#[tokio::test]
async fn identical_histories_rank_identically() {
    let transcript = [
        "Call me after 9 AM",
        "The project deadline is friday",
        "My favorite color is teal",
        "Please do not call on Sundays",
    ];

    let mut rankings = Vec::new();
    for _ in 0..2 {
        let harness = TestHarness::builder().build().await.unwrap();
        ingest(&harness, &transcript).await;
        let outcome = harness.engine.retrieve("when should I call").await.unwrap();
        rankings.push(
            outcome
                .results
                .into_iter()
                .map(|r| (r.entry.key, r.entry.value, r.entry.source_turn, r.score))
                .collect::<Vec<_>>(),
        );
    }
    assert!(!rankings[0].is_empty());
    assert_eq!(rankings[0], rankings[1]);
}

// ---- Extraction degradation ----

#[tokio::test]
async fn provider_candidates_are_tagged_with_their_extractor() {
    let harness = TestHarness::builder()
        .with_provider_script(vec![ScriptedResponse::Facts(vec![
            candidate("preference", "call_time", "after 9 am", 0.9),
            candidate("fact", "weak", "maybe", 0.4),
        ])])
        .build()
        .await
        .unwrap();

    let outcome = harness.engine.process_turn("Ring me after nine").await.unwrap();
    assert_eq!(outcome.path, ExtractionPath::Provider);
    assert_eq!(outcome.extracted.len(), 1);
    assert_eq!(
        outcome.extracted[0].meta.get("extractor").map(String::as_str),
        Some("scripted")
    );
    outcome.commit.wait().await.unwrap();
    assert_eq!(harness.engine.entry_count().await, 1);
}

#[tokio::test]
async fn breaker_opens_after_three_failures_and_fallback_takes_over() {
    let harness = TestHarness::builder()
        .with_provider_script(vec![
            ScriptedResponse::Fail("503".into()),
            ScriptedResponse::Fail("503".into()),
            ScriptedResponse::Fail("503".into()),
        ])
        .build()
        .await
        .unwrap();
    let provider = harness.provider.clone().unwrap();

    for text in ["hello", "how are you", "nice weather"] {
        let outcome = harness.engine.process_turn(text).await.unwrap();
        assert_eq!(outcome.path, ExtractionPath::Fallback);
    }
    assert_eq!(provider.calls(), 3);
    assert_eq!(
        harness.engine.orchestrator().breaker().state(),
        CircuitState::Open
    );

    let outcome = harness.engine.process_turn("Call me after 9 AM").await.unwrap();
    assert_eq!(provider.calls(), 3, "open breaker must not reach the provider");
    assert_eq!(outcome.path, ExtractionPath::Fallback);
    assert!(outcome.extracted.iter().any(|e| e.key == "call_time"));
    outcome.commit.wait().await.unwrap();
}

#[tokio::test]
async fn slow_provider_does_not_stall_retrieval() {
    let harness = TestHarness::builder()
        .with_seeded_entries(vec![MemoryEntry::new(
            MemoryKind::Fact,
            "deadline",
            "friday",
            1,
            0.95,
        )])
        .with_provider_script(vec![ScriptedResponse::Slow(
            Duration::from_millis(600),
            vec![candidate("preference", "call_time", "after 9 am", 0.9)],
        )])
        .build()
        .await
        .unwrap();
    assert!(harness.config.extraction.timeout_ms > 600);

    let started = Instant::now();
    let (turn, recalled) = tokio::join!(
        harness.engine.process_turn("Ring me after nine"),
        async {
            let recalled = tokio::time::timeout(
                Duration::from_millis(300),
                harness.engine.retrieve("project deadline"),
            )
            .await;
            (recalled, started.elapsed())
        }
    );

    let (recalled, elapsed) = recalled;
    let recalled = recalled
        .expect("retrieval waited on extraction")
        .unwrap();
    assert!(elapsed < Duration::from_millis(600));
    assert_eq!(recalled.results.len(), 1);
    assert_eq!(recalled.results[0].entry.value, "friday");

    let turn = turn.unwrap();
    assert_eq!(turn.path, ExtractionPath::Provider);
    assert!(turn.extraction_latency >= Duration::from_millis(600));
    turn.commit.wait().await.unwrap();
    assert_eq!(harness.engine.entry_count().await, 2);
}

#[tokio::test]
async fn extraction_cache_can_be_disabled() {
    let script = || {
        vec![ScriptedResponse::Facts(vec![candidate(
            "preference",
            "call_time",
            "after 9 am",
            0.9,
        )])]
    };

    let cached = TestHarness::builder()
        .with_provider_script(script())
        .build()
        .await
        .unwrap();
    let orchestrator = cached.engine.orchestrator();
    let first = orchestrator.extract("Ring me after nine", 5).await;
    let second = orchestrator.extract("Ring me after nine", 5).await;
    assert_eq!(first.path, ExtractionPath::Provider);
    assert_eq!(second.path, ExtractionPath::Cache);
    assert_eq!(cached.provider.as_ref().unwrap().calls(), 1);

    let uncached = TestHarness::builder()
        .with_provider_script(script())
        .without_cache()
        .build()
        .await
        .unwrap();
    assert!(!uncached.config.extraction.cache_enabled);
    let orchestrator = uncached.engine.orchestrator();
    let first = orchestrator.extract("Ring me after nine", 5).await;
    let second = orchestrator.extract("Ring me after nine", 5).await;
    assert_eq!(first.path, ExtractionPath::Provider);
    assert_ne!(second.path, ExtractionPath::Cache);
    assert_eq!(uncached.provider.as_ref().unwrap().calls(), 2);
}

// ---- Persistence ----

#[tokio::test]
async fn store_failures_surface_to_callers() {
    let harness = TestHarness::builder().build().await.unwrap();
    ingest(&harness, &["My favorite color is teal"]).await;

    harness.fail_writes(true);

    let err = harness.engine.retrieve("favorite color").await.unwrap_err();
    assert!(matches!(err, RecollectError::Storage { .. }));

    let outcome = harness
        .engine
        .process_turn("The project deadline is friday")
        .await
        .unwrap();
    assert!(matches!(
        outcome.commit.wait().await,
        Err(RecollectError::Storage { .. })
    ));
    assert!(matches!(
        harness.engine.flush().await,
        Err(RecollectError::Storage { .. })
    ));
    harness.engine.flush().await.unwrap();

    harness.fail_writes(false);
    let outcome = harness.engine.retrieve("project deadline").await.unwrap();
    assert!(outcome.results.iter().all(|r| r.entry.key != "deadline"));
}

#[tokio::test]
async fn memories_and_clock_survive_restart() {
    let harness = TestHarness::builder().with_sqlite().build().await.unwrap();
    ingest(
        &harness,
        &["hello", "The project deadline is friday", "thanks"],
    )
    .await;
    assert_eq!(harness.engine.current_turn(), 3);

    let harness = harness.restart().await.unwrap();
    assert_eq!(harness.engine.current_turn(), 2, "clock resumes at the newest entry");

    let outcome = harness.engine.retrieve("project deadline").await.unwrap();
    assert_eq!(outcome.results[0].entry.key, "deadline");
    assert_eq!(outcome.results[0].entry.value, "friday");
    harness.engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_drains_queued_commits() {
    let harness = TestHarness::builder().build().await.unwrap();
    let outcome = harness
        .engine
        .process_turn("Call me after 9 AM")
        .await
        .unwrap();
    let extracted = outcome.extracted.len();
    drop(outcome);

    harness.engine.shutdown().await.unwrap();
    assert_eq!(
        harness.memory_store.as_ref().unwrap().entries().await.len(),
        extracted
    );
    assert!(matches!(
        harness.engine.process_turn("hello").await,
        Err(RecollectError::IngestClosed)
    ));
}

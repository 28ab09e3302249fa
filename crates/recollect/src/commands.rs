// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recollect ingest`, `recollect query` and `recollect config`.

use std::path::Path;

use colored::Colorize;
use recollect_config::RecollectConfig;
use recollect_core::{RankedResult, RecollectError};
use recollect_memory::{MemoryEngine, RetrievalOutcome, TurnOutcome};

const MASKED: &str = "********";

/// Feed every non-empty line of `file` through the engine as one turn.
pub async fn run_ingest(engine: &MemoryEngine, file: &Path) -> Result<(), RecollectError> {
    let transcript = std::fs::read_to_string(file).map_err(|e| {
        RecollectError::Config(format!("cannot read transcript {}: {e}", file.display()))
    })?;

    let mut turns = 0usize;
    let mut extracted = 0usize;
    for line in transcript.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let outcome = engine.process_turn(line).await?;
        turns += 1;
        extracted += outcome.extracted.len();
        print_turn(&outcome);
    }
    engine.flush().await?;

    println!(
        "{} {turns} turns, {extracted} memories, {} stored",
        "ingested".green().bold(),
        engine.entry_count().await
    );
    Ok(())
}

/// Answer one query and print the ranked results and injected context.
pub async fn run_query(engine: &MemoryEngine, text: &str) -> Result<(), RecollectError> {
    let outcome = engine.retrieve(text).await?;
    print_retrieval(&outcome);
    Ok(())
}

/// Print the effective configuration as TOML with API keys masked.
pub fn print_config(config: &RecollectConfig) -> Result<(), RecollectError> {
    let rendered = toml::to_string_pretty(&masked(config))
        .map_err(|e| RecollectError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

fn masked(config: &RecollectConfig) -> RecollectConfig {
    let mut config = config.clone();
    if config.embedding.api_key.is_some() {
        config.embedding.api_key = Some(MASKED.to_string());
    }
    if config.extraction.api_key.is_some() {
        config.extraction.api_key = Some(MASKED.to_string());
    }
    config
}

pub fn print_turn(outcome: &TurnOutcome) {
    println!(
        "{} {} ({} via {}, {:.1} ms)",
        "turn".dimmed(),
        outcome.turn,
        outcome.extracted.len(),
        outcome.path,
        outcome.extraction_latency.as_secs_f64() * 1000.0
    );
    for entry in &outcome.extracted {
        println!(
            "  {} {}={} (c={:.2})",
            format!("[{}]", entry.kind.as_str()).cyan(),
            entry.key,
            entry.value,
            entry.confidence
        );
    }
}

pub fn print_retrieval(outcome: &RetrievalOutcome) {
    if outcome.results.is_empty() {
        println!("{}", "no memories matched".yellow());
        return;
    }
    for (rank, result) in outcome.results.iter().enumerate() {
        println!("{}", result_line(rank + 1, result));
    }
    println!(
        "{} turn {}, {:.1} ms",
        "retrieved at".dimmed(),
        outcome.turn,
        outcome.retrieval_latency.as_secs_f64() * 1000.0
    );
    if !outcome.injected_context.is_empty() {
        println!("\n{}\n{}", "injected context:".bold(), outcome.injected_context);
    }
}

fn result_line(rank: usize, result: &RankedResult) -> String {
    let entry = &result.entry;
    format!(
        "{rank:>2}. {} {} {}={} (turn {}, used {}x, {})",
        format!("{:.4}", result.score).green(),
        format!("[{}]", entry.kind.as_str()).cyan(),
        entry.key,
        entry.value,
        entry.source_turn,
        entry.use_count,
        result.ranker
    )
}

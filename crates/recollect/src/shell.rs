// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recollect shell` command implementation.
//!
//! A readline REPL over a live engine: lines starting with `?` are
//! queries, every other non-empty line is ingested as the next turn.

use colored::Colorize;
use recollect_core::RecollectError;
use recollect_memory::MemoryEngine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::commands::{print_retrieval, print_turn};

/// What the REPL should do with one input line.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput<'a> {
    Query(&'a str),
    Turn(&'a str),
    Quit,
    Skip,
}

fn classify(line: &str) -> ShellInput<'_> {
    let line = line.trim();
    match line {
        "" => ShellInput::Skip,
        "exit" | "quit" | ":q" => ShellInput::Quit,
        _ => match line.strip_prefix('?') {
            Some(query) if !query.trim().is_empty() => ShellInput::Query(query.trim()),
            Some(_) => ShellInput::Skip,
            None => ShellInput::Turn(line),
        },
    }
}

/// Runs the `recollect shell` interactive REPL.
pub async fn run_shell(engine: &MemoryEngine) -> Result<(), RecollectError> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| RecollectError::Internal(format!("failed to start line editor: {e}")))?;

    println!(
        "{} {} memories, turn {}. {} to query, {} to leave.",
        "recollect".bold(),
        engine.entry_count().await,
        engine.current_turn(),
        "?question".cyan(),
        "exit".cyan()
    );

    loop {
        let prompt = format!("{}> ", engine.current_turn() + 1);
        match editor.readline(&prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                match classify(&line) {
                    ShellInput::Skip => {}
                    ShellInput::Quit => break,
                    ShellInput::Query(query) => match engine.retrieve(query).await {
                        Ok(outcome) => print_retrieval(&outcome),
                        Err(e) => eprintln!("{} {e}", "error:".red()),
                    },
                    ShellInput::Turn(text) => {
                        let outcome = engine.process_turn(text).await?;
                        print_turn(&outcome);
                    }
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                warn!(error = %e, "readline failed");
                break;
            }
        }
    }

    engine.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_prefix_is_a_query() {
        assert_eq!(classify("?When can I call?"), ShellInput::Query("When can I call?"));
        assert_eq!(classify("  ? deadline "), ShellInput::Query("deadline"));
    }

    #[test]
    fn other_lines_are_turns() {
        assert_eq!(classify("Call me after 9 AM"), ShellInput::Turn("Call me after 9 AM"));
    }

    #[test]
    fn blank_and_exit_lines() {
        assert_eq!(classify("   "), ShellInput::Skip);
        assert_eq!(classify("?"), ShellInput::Skip);
        assert_eq!(classify("exit"), ShellInput::Quit);
        assert_eq!(classify(":q"), ShellInput::Quit);
    }
}

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering of ranked results for prompt injection.

use recollect_core::{MemoryEntry, RankedResult};

/// One injection line: `- [kind] key=value (turn N, c=0.86)`.
pub fn format_line(entry: &MemoryEntry) -> String {
    format!(
        "- [{}] {}={} (turn {}, c={:.2})",
        entry.kind, entry.key, entry.value, entry.source_turn, entry.confidence
    )
}

/// Render results one per line, keeping whole lines while the total word
/// count stays within `max_words`. Rendering stops at the first line that
/// would exceed the budget.
pub fn format_injection(results: &[RankedResult], max_words: usize) -> String {
    let mut lines = Vec::with_capacity(results.len());
    let mut words = 0usize;
    for result in results {
        let line = format_line(&result.entry);
        let line_words = line.split_whitespace().count();
        if words + line_words > max_words {
            break;
        }
        words += line_words;
        lines.push(line);
    }
    lines.join("\n")
}

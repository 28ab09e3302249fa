// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic pattern extractor used when the provider is unavailable.
//!
//! Rules run in a fixed order against the lowercased, trimmed turn text.
//! Each rule fires at most once (its first match), and several rules may
//! fire for one turn.

use std::sync::LazyLock;

use recollect_core::{MemoryEntry, MemoryKind};
use regex::Regex;

/// Meta value recorded under `extractor` for entries produced here.
pub const FALLBACK_EXTRACTOR: &str = "fallback";

struct Rule {
    pattern: Regex,
    kind: MemoryKind,
    key: &'static str,
    confidence: f64,
}

fn rule(pattern: &str, kind: MemoryKind, key: &'static str, confidence: f64) -> Option<Rule> {
    let pattern = Regex::new(&format!("(?i){pattern}"))
        .inspect_err(|e| tracing::error!(error = %e, key, "invalid fallback pattern"))
        .ok()?;
    Some(Rule {
        pattern,
        kind,
        key,
        confidence,
    })
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use MemoryKind::{Constraint, Fact, Preference};
    vec![
        rule(
            r"\b(?:preferred language|language)\s*(?:is|:)\s*(?:[a-z]+)\s+([a-z]+)",
            Preference,
            "language",
            0.92,
        ),
        rule(r"\b(?:language)\s*(?:is|:)\s*([a-z]+)", Preference, "language", 0.92),
        rule(
            r"\b(?:calls?|call)\s*(?:me|us|him|her)?\s*(?:after|before|at)\s*([0-9]{1,2}\s*(?:am|pm))",
            Preference,
            "call_time",
            0.86,
        ),
        rule(r"secret code is (.*)", Fact, "secret_code", 0.95),
        rule(r"meeting is at (.*)", Fact, "meeting_time", 0.95),
        rule(r"project deadline is (.*)", Fact, "deadline", 0.95),
        rule(r"favorite color is (.*)", Preference, "favorite_color", 0.95),
        rule(r"like\s+([a-z]+)", Preference, "favorite_color", 0.96),
        rule(r"([a-z]+)\s+is\s+best", Preference, "favorite_color", 0.97),
        rule(
            r"\b(?:calls?|call).*(?:between)\s*([0-9]{1,2}\s*(?:am|pm)\s*(?:and|to)\s*[0-9]{1,2}\s*(?:am|pm))",
            Preference,
            "call_time",
            0.89,
        ),
        rule(
            r"call.*(?:after|before|at)\s*([0-9]{1,2}\s*(?:am|pm))",
            Preference,
            "call_time",
            0.80,
        ),
        rule(
            r"\b(?:no(?:thing)?|never|do not)\s*(?:call)?\s*on\s*sundays?",
            Constraint,
            "no_sundays",
            0.88,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// Strip sentence punctuation a greedy capture picked up.
fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';'))
        .trim()
        .to_string()
}

/// Run every rule against `text` and build entries for `turn`.
pub fn fallback_extract(text: &str, turn: u64) -> Vec<MemoryEntry> {
    let normalized = text.trim().to_lowercase();
    let mut entries = Vec::new();

    for rule in RULES.iter() {
        let Some(caps) = rule.pattern.captures(&normalized) else {
            continue;
        };
        let value = match caps.get(1) {
            Some(m) => clean_value(m.as_str()),
            None if rule.pattern.captures_len() == 1 => "true".to_string(),
            None => continue,
        };
        if value.is_empty() {
            continue;
        }
        entries.push(
            MemoryEntry::new(rule.kind, rule.key, value, turn, rule.confidence)
                .with_source_text(text)
                .with_meta("extractor", FALLBACK_EXTRACTOR),
        );
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(entries: &'a [MemoryEntry], key: &str, conf: f64) -> Option<&'a MemoryEntry> {
        entries
            .iter()
            .find(|e| e.key == key && (e.confidence - conf).abs() < 1e-9)
    }

    #[test]
    fn all_rules_compile() {
        assert_eq!(RULES.len(), 12);
    }

    #[test]
    fn call_after_time() {
        let entries = fallback_extract("Call me after 9 AM.", 10);
        let e = find(&entries, "call_time", 0.86).expect("direct call rule");
        assert_eq!(e.value, "9 am");
        assert_eq!(e.kind, MemoryKind::Preference);
        assert_eq!(e.source_turn, 10);
        assert_eq!(e.source_text, "Call me after 9 AM.");
        assert_eq!(e.meta.get("extractor").map(String::as_str), Some("fallback"));
        // The looser rule fires as well.
        assert!(find(&entries, "call_time", 0.80).is_some());
    }

    #[test]
    fn call_between_range() {
        let entries = fallback_extract("Please call between 4 PM and 6 PM", 950);
        let e = find(&entries, "call_time", 0.89).expect("between rule");
        assert_eq!(e.value, "4 pm and 6 pm");
    }

    #[test]
    fn greedy_capture_drops_trailing_period() {
        let entries = fallback_extract("The secret code is Blue42.", 3);
        let e = find(&entries, "secret_code", 0.95).unwrap();
        assert_eq!(e.value, "blue42");
    }

    #[test]
    fn constraint_without_group_is_true() {
        let entries = fallback_extract("Never call on Sundays", 4);
        let e = find(&entries, "no_sundays", 0.88).unwrap();
        assert_eq!(e.kind, MemoryKind::Constraint);
        assert_eq!(e.value, "true");
    }

    #[test]
    fn language_rules() {
        let entries = fallback_extract("My language is Rust", 1);
        let languages: Vec<_> = entries.iter().filter(|e| e.key == "language").collect();
        assert_eq!(languages.len(), 1);
        assert_eq!(languages[0].value, "rust");
        assert_eq!(languages[0].confidence, 0.92);
    }

    #[test]
    fn single_word_language_is_not_split() {
        let entries = fallback_extract("My preferred language is Kannada", 2);
        let languages: Vec<_> = entries.iter().filter(|e| e.key == "language").collect();
        assert_eq!(languages.len(), 1);
        assert_eq!(languages[0].value, "kannada");
        assert!(entries.iter().all(|e| e.value.chars().count() > 1));
    }

    #[test]
    fn qualified_language_takes_the_second_word() {
        let entries = fallback_extract("My preferred language is definitely Tamil", 3);
        assert!(
            entries
                .iter()
                .any(|e| e.key == "language" && e.value == "tamil")
        );
    }

    #[test]
    fn no_match_yields_nothing() {
        assert!(fallback_extract("hello there", 1).is_empty());
        assert!(fallback_extract("", 1).is_empty());
    }

    #[test]
    fn ids_are_fresh_per_call() {
        let a = fallback_extract("meeting is at noon", 1);
        let b = fallback_extract("meeting is at noon", 1);
        assert_eq!(a[0].value, "noon");
        assert_ne!(a[0].id, b[0].id);
    }
}

// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lenient parsing of extraction provider output.

use recollect_core::CandidateFact;
use serde_json::Value;
use tracing::{debug, warn};

/// Remove markdown code-fence lines, keeping their contents.
fn strip_code_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Slice from the first `[` or `{` to the last matching closer.
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let closer = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

fn parse_value(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let unfenced = strip_code_fences(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced.trim()) {
        return Some(value);
    }
    embedded_json(&unfenced).and_then(|slice| serde_json::from_str::<Value>(slice).ok())
}

/// Parse an extraction response into raw candidates.
///
/// Accepts a bare JSON array or object, a fenced code block, or JSON
/// embedded in prose. An unparseable response yields an empty list.
/// Items that do not have the candidate shape are dropped individually.
pub fn parse_extraction_response(response: &str) -> Vec<CandidateFact> {
    let items = match parse_value(response) {
        Some(Value::Array(items)) => items,
        Some(value @ Value::Object(_)) => vec![value],
        Some(other) => {
            warn!(kind = json_kind(&other), "extraction response is not an array or object");
            return Vec::new();
        }
        None => {
            warn!("failed to parse extraction response");
            debug!("raw response: {response}");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<CandidateFact>(item) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!(error = %e, "dropping malformed extraction item");
                None
            }
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

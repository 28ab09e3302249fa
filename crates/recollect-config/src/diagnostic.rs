// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostics for `recollect.toml`.
//!
//! Figment errors are mapped onto the table layout of the config file:
//! a missing `[retrieval]` table, keys missing from or unknown to a
//! particular table, keys placed in the wrong `[retrieval.*]` sub-table,
//! and unknown top-level tables. Unknown names get a Jaro-Winkler
//! suggestion drawn from the table the key was found in.

#![allow(unused_assignments)] // emitted by the miette Diagnostic derive

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Every table in `recollect.toml` and the keys it accepts. The empty path
/// is the top level.
pub const SECTIONS: &[(&str, &[&str])] = &[
    (
        "",
        &["agent", "storage", "retrieval", "embedding", "extraction", "ingest"],
    ),
    ("agent", &["log_level"]),
    ("storage", &["database_path", "wal_mode"]),
    (
        "retrieval",
        &[
            "top_k",
            "rerank",
            "decay_lambda",
            "max_memory_age_turns",
            "max_injected_words",
            "hybrid",
            "conflict",
            "weights",
        ],
    ),
    (
        "retrieval.hybrid",
        &["semantic_weight", "lexical_weight", "oversample"],
    ),
    (
        "retrieval.conflict",
        &["confidence_threshold", "recency_boost"],
    ),
    ("retrieval.weights", &["semantic", "fuzzy", "overlap", "kind"]),
    (
        "embedding",
        &["provider", "dimensions", "api_base", "model", "api_key", "timeout_ms"],
    ),
    (
        "extraction",
        &[
            "provider",
            "api_base",
            "model",
            "api_key",
            "timeout_ms",
            "min_confidence",
            "failure_threshold",
            "cooldown_secs",
            "cache_enabled",
        ],
    ),
    ("ingest", &["queue_capacity"]),
];

/// Keys accepted by the table at `section`.
pub fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// A problem with the configuration, renderable through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// No `[retrieval]` table was given. Ranking parameters have no defaults.
    #[error("the `[retrieval]` table is required")]
    #[diagnostic(
        code(recollect::config::missing_retrieval),
        help(
            "ranking parameters have no defaults; the tuned values are \
             top_k = 6, rerank = true, decay_lambda = 0.008, \
             max_memory_age_turns = 1400, max_injected_words = 240"
        )
    )]
    MissingRetrieval,

    /// A required key is absent from an existing table.
    #[error("`[{section}]` is missing `{key}`")]
    #[diagnostic(
        code(recollect::config::missing_key),
        help("add `{key} = <value>` under `[{section}]`")
    )]
    MissingKey { section: String, key: String },

    /// A top-level table this config does not define.
    #[error("unknown table `[{name}]`")]
    #[diagnostic(
        code(recollect::config::unknown_section),
        help("{}", unknown_section_help(suggestion.as_deref()))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<String>,
        #[label("not a recollect table")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the enclosing table does not accept.
    #[error("unknown key `{key}` in `[{section}]`")]
    #[diagnostic(
        code(recollect::config::unknown_key),
        help(
            "{}",
            unknown_key_help(key, suggestion.as_deref(), belongs_in.as_deref(), valid_keys)
        )
    )]
    UnknownKey {
        /// Dotted table path, e.g. `retrieval.weights`.
        section: String,
        key: String,
        /// Closest key in the same table.
        suggestion: Option<String>,
        /// Another table that accepts this exact key.
        belongs_in: Option<String>,
        valid_keys: String,
        #[label("not accepted here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type.
    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(recollect::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that parsed but is out of range.
    #[error("validation error: {message}")]
    #[diagnostic(code(recollect::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(recollect::config::other))]
    Other(String),
}

fn unknown_section_help(suggestion: Option<&str>) -> String {
    let known = section_keys("").unwrap_or_default().join(", ");
    match suggestion {
        Some(s) => format!("did you mean `[{s}]`? Known tables: {known}"),
        None => format!("known tables: {known}"),
    }
}

fn unknown_key_help(
    key: &str,
    suggestion: Option<&str>,
    belongs_in: Option<&str>,
    valid_keys: &str,
) -> String {
    match (belongs_in, suggestion) {
        (Some(table), _) => format!("`{key}` belongs in `[{table}]`"),
        (None, Some(s)) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        (None, None) => format!("valid keys: {valid_keys}"),
    }
}

/// Convert a `figment::Error` into one diagnostic per underlying error.
///
/// `toml_sources` holds `(path, content)` pairs used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let section = error.path.join(".");
            match &error.kind {
                Kind::MissingField(field) if section.is_empty() && field == "retrieval" => {
                    ConfigError::MissingRetrieval
                }
                Kind::MissingField(field) if section.is_empty() => {
                    ConfigError::Other(format!("missing top-level key `{field}`"))
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    section,
                    key: field.to_string(),
                },
                Kind::UnknownField(field, expected) => {
                    let (span, src) = source_span(&error, toml_sources, &section, field);
                    unknown_field(section, field, expected, span, src)
                }
                Kind::InvalidType(actual, expected) => {
                    let (table, field) = match section.rsplit_once('.') {
                        Some((table, field)) => (table.to_string(), field.to_string()),
                        None => (String::new(), section.clone()),
                    };
                    let (span, src) = source_span(&error, toml_sources, &table, &field);
                    ConfigError::InvalidType {
                        key: section,
                        found: actual.to_string(),
                        expected: expected.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn unknown_field(
    section: String,
    field: &str,
    expected: &[&str],
    span: Option<SourceSpan>,
    src: Option<NamedSource<String>>,
) -> ConfigError {
    // Serde's list is authoritative; the table map covers an empty one.
    let valid: Vec<&str> = if expected.is_empty() {
        section_keys(&section).unwrap_or_default().to_vec()
    } else {
        expected.to_vec()
    };

    if section.is_empty() {
        return ConfigError::UnknownSection {
            name: field.to_string(),
            suggestion: suggest_key(field, &valid),
            span,
            src,
        };
    }

    ConfigError::UnknownKey {
        belongs_in: owning_section(field, &section),
        suggestion: suggest_key(field, &valid),
        valid_keys: valid.join(", "),
        key: field.to_string(),
        section,
        span,
        src,
    }
}

/// The table, other than `current`, that accepts `key` verbatim.
pub fn owning_section(key: &str, current: &str) -> Option<String> {
    SECTIONS
        .iter()
        .filter(|(name, _)| !name.is_empty() && *name != current)
        .find(|(_, keys)| keys.contains(&key))
        .map(|(name, _)| name.to_string())
}

/// Span of `key` within `section` in whichever source the error came from.
///
/// Falls back to the only source when figment recorded no file.
fn source_span(
    error: &figment::error::Error,
    toml_sources: &[(String, String)],
    section: &str,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match file {
        Some(file) => toml_sources.iter().find(|(p, _)| *p == file),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = find_key_offset(content, section, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key` inside the table `section` of a TOML document.
///
/// Tracks `[table]` headers line by line, so a key is only matched inside
/// its own table and not in a parent or sibling. At the top level a
/// `[key]` header also matches.
pub fn find_key_offset(content: &str, section: &str, key: &str) -> Option<usize> {
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();

        if let Some(header) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.split(']').next())
        {
            let header = header.trim();
            if section.is_empty() && header == key {
                return line.find(key).map(|at| offset + at);
            }
            current = header.to_string();
        } else if current == section
            && let Some(after) = trimmed.strip_prefix(key)
            && after.trim_start().starts_with('=')
        {
            return Some(offset + indent);
        }

        offset += line.len();
    }

    None
}

/// Closest entry in `valid_keys` to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use figment::{Figment, Provider};
    use figment::providers::Serialized;
    use figment::value::{Dict, Value};

    use super::*;
    use crate::model::{RecollectConfig, RetrievalConfig};

    fn collect_keys(dict: &Dict, prefix: &str, out: &mut Vec<(String, String)>) {
        for (key, value) in dict {
            out.push((prefix.to_string(), key.clone()));
            if let Value::Dict(_, nested) = value {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_keys(nested, &path, out);
            }
        }
    }

    #[test]
    fn table_map_covers_every_serialized_key() {
        let config = RecollectConfig::with_retrieval(RetrievalConfig::recommended());
        let data = Figment::from(Serialized::defaults(config)).data().unwrap();
        let root = data.values().next().unwrap();

        let mut keys = Vec::new();
        collect_keys(root, "", &mut keys);
        assert!(keys.len() > 30);
        for (section, key) in keys {
            let listed = section_keys(&section).unwrap_or_else(|| panic!("no table `{section}`"));
            assert!(listed.contains(&key.as_str()), "`{key}` missing from `[{section}]`");
        }
    }

    #[test]
    fn suggestions_stay_within_the_table() {
        let weights = section_keys("retrieval.weights").unwrap();
        assert_eq!(suggest_key("semantik", weights), Some("semantic".into()));

        let hybrid = section_keys("retrieval.hybrid").unwrap();
        assert_eq!(suggest_key("oversampel", hybrid), Some("oversample".into()));
        assert_eq!(suggest_key("semantik", hybrid), None);
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        assert_eq!(suggest_key("zzzzzz", &["log_level"]), None);
    }

    #[test]
    fn misplaced_key_names_its_table() {
        assert_eq!(
            owning_section("oversample", "retrieval"),
            Some("retrieval.hybrid".into())
        );
        assert_eq!(
            owning_section("recency_boost", "retrieval.weights"),
            Some("retrieval.conflict".into())
        );
        assert_eq!(owning_section("top_kk", "retrieval"), None);
    }

    #[test]
    fn key_offset_respects_table_boundaries() {
        let content = "[retrieval]\ntop_k = 6\n\n[retrieval.hybrid]\n  oversampel = 3\n\n[retrieval.weights]\nsemantic = 0.5\n";
        let o = find_key_offset(content, "retrieval.hybrid", "oversampel").unwrap();
        assert_eq!(&content[o..o + 10], "oversampel");

        assert!(find_key_offset(content, "retrieval", "semantic").is_none());
        let o = find_key_offset(content, "retrieval.weights", "semantic").unwrap();
        assert_eq!(&content[o..o + 8], "semantic");
    }

    #[test]
    fn top_level_offset_finds_the_table_header() {
        let content = "[retrieval]\ntop_k = 6\n\n[logging]\nlevel = 1\n";
        let o = find_key_offset(content, "", "logging").unwrap();
        assert_eq!(&content[o..o + 7], "logging");
    }

    #[test]
    fn misplaced_key_help_points_at_the_right_table() {
        let help = unknown_key_help("oversample", None, Some("retrieval.hybrid"), "top_k");
        assert_eq!(help, "`oversample` belongs in `[retrieval.hybrid]`");
        let help = unknown_key_help("top_kk", Some("top_k"), None, "top_k, rerank");
        assert_eq!(help, "did you mean `top_k`? Valid keys: top_k, rerank");
    }
}

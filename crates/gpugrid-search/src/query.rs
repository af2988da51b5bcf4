//! Query grammars shared by the search engines.

use std::sync::OnceLock;

use regex::Regex;

/// Split a compound query on `/`. Parts are trimmed and lowercased; empty
/// parts are dropped.
pub fn split_compound_query(term: &str) -> Vec<String> {
    term.split('/')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Tokenize a tenant query on any run of whitespace, `/` or `,`.
/// Tokens are lowercased; empty tokens are dropped.
pub fn tokenize_query(term: &str) -> Vec<String> {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATORS.get_or_init(|| Regex::new(r"[\s/,]+").expect("separator pattern is valid"));
    re.split(&term.to_lowercase())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// True if `needle` (already lowercased) occurs in any of `fields`,
/// compared case-insensitively.
pub(crate) fn any_field_contains(fields: &[&str], needle: &str) -> bool {
    fields.iter().any(|f| f.to_lowercase().contains(needle))
}

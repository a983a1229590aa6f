//! Turning free-form user input into an FTS5 match expression.
//!
//! FTS5 gives meaning to wildcards, phrase quotes, column filters,
//! grouping and the upper-case boolean operators. User queries are plain
//! words, so all of that is stripped before the index sees it.

const OPERATORS: [&str; 4] = ["AND", "OR", "NOT", "NEAR"];

/// Strip query-grammar syntax from `raw`, leaving space-separated barewords.
///
/// Anything that is not a letter, digit or underscore becomes a space,
/// boolean operator tokens are dropped, and whitespace is collapsed. The
/// result may be empty.
#[must_use]
pub fn sanitize_query(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !OPERATORS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The expression handed to FTS5 for `raw`.
///
/// Falls back to `raw` as one quoted string literal when sanitizing
/// leaves nothing, so punctuation-only input is searched verbatim rather
/// than rejected.
#[must_use]
pub fn match_expression(raw: &str) -> String {
    let sanitized = sanitize_query(raw);
    if sanitized.is_empty() {
        format!("\"{}\"", raw.trim().replace('"', "\"\""))
    } else {
        sanitized
    }
}

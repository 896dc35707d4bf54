//! Text normalization for logic-based constraint equivalence

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_AFTER_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s+").unwrap());
static SPACE_BEFORE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\)").unwrap());
static CHECK_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^check\s*\(").unwrap());

/// Normalize a CHECK clause so equivalent clauses compare equal
///
/// Collapses whitespace, drops spaces hugging parentheses, lowercases and
/// strips every layer of parentheses wrapping the whole expression. A
/// leading `CHECK` keyword (as `pg_get_constraintdef` renders it) is removed
/// first.
pub fn normalize_check_clause(clause: &str) -> String {
    let collapsed = WHITESPACE.replace_all(clause.trim(), " ");
    let collapsed = SPACE_AFTER_OPEN.replace_all(&collapsed, "(");
    let collapsed = SPACE_BEFORE_CLOSE.replace_all(&collapsed, ")");
    let mut normalized = collapsed.to_lowercase();

    if CHECK_KEYWORD.is_match(&normalized) {
        normalized = normalized["check".len()..].trim_start().to_string();
    }

    let mut current = normalized.as_str();
    while is_wrapped(current) {
        current = current[1..current.len() - 1].trim();
    }
    current.to_string()
}

/// True when the first `(` closes exactly at the last character
fn is_wrapped(text: &str) -> bool {
    if !(text.starts_with('(') && text.ends_with(')')) {
        return false;
    }

    let mut depth = 0usize;
    let mut in_literal = false;
    let last = text.len() - 1;
    for (pos, ch) in text.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            '(' if !in_literal => depth += 1,
            ')' if !in_literal => {
                depth = depth.saturating_sub(1);
                if depth == 0 && pos != last {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

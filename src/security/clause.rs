//! WHERE clause location and extraction.
//!
//! Both the WHERE keyword and the clause boundary are found on the span
//! stream, so text inside comments, string literals and bracketed identifiers
//! can never act as a keyword. Parenthesis depth, counted over plain text
//! only, decides where the clause ends: an ORDER BY inside a nested subquery
//! does not cut the clause short.

use super::lexer::{is_word_byte, KeywordKind, Span, SpanKind};

/// The WHERE clause of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WhereClause {
    /// Clause text with comments replaced by a space and literals kept.
    pub cleaned: String,
}

impl WhereClause {
    /// Whether the cleaned clause contains `=` or the word `IN`.
    pub fn has_exact_match(&self) -> bool {
        self.cleaned.contains('=') || contains_word(&self.cleaned, "IN")
    }
}

/// Find the first WHERE keyword and extract its clause.
///
/// The clause ends at the first trailing-clause keyword (`ORDER BY`,
/// `GROUP BY`, `HAVING`, `LIMIT`, `OFFSET`) or semicolon that is not nested
/// deeper than the WHERE itself.
pub(crate) fn locate_where_clause(source: &str, spans: &[Span]) -> Option<WhereClause> {
    let where_index = spans
        .iter()
        .position(|span| span.keyword() == Some(KeywordKind::Where))?;

    let body_start = where_index + 1;
    let mut body_end = spans.len();
    let mut depth: i64 = 0;

    for (offset, span) in spans[body_start..].iter().enumerate() {
        let at_top = depth <= 0;
        match span.kind {
            SpanKind::Plain => depth += paren_delta(span.text(source)),
            SpanKind::Semicolon if at_top => {
                body_end = body_start + offset;
                break;
            }
            SpanKind::Keyword(kind) if at_top && kind.is_trailing_clause() => {
                body_end = body_start + offset;
                break;
            }
            _ => {}
        }
    }

    let mut cleaned = String::new();
    for span in &spans[body_start..body_end] {
        if span.is_comment() {
            cleaned.push(' ');
        } else {
            cleaned.push_str(span.text(source));
        }
    }

    Some(WhereClause {
        cleaned: cleaned.trim().to_string(),
    })
}

fn paren_delta(text: &str) -> i64 {
    text.bytes().fold(0, |delta, b| match b {
        b'(' => delta + 1,
        b')' => delta - 1,
        _ => delta,
    })
}

/// Case-insensitive whole-word search.
fn contains_word(text: &str, word: &str) -> bool {
    let bytes = text.as_bytes();
    let len = word.len();
    if bytes.len() < len {
        return false;
    }
    (0..=bytes.len() - len).any(|i| {
        bytes[i..i + len].eq_ignore_ascii_case(word.as_bytes())
            && (i == 0 || !is_word_byte(bytes[i - 1]))
            && bytes.get(i + len).is_none_or(|&b| !is_word_byte(b))
    })
}

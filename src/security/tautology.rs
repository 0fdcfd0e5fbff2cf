//! Always-true WHERE condition detection.
//!
//! Detects textbook tautologies in an extracted WHERE clause. The regex crate
//! guarantees linear-time matching, so these patterns are safe to run on
//! untrusted text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Always-true patterns with the description reported to users.
static ALWAYS_TRUE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    fn compile(pattern: &str) -> Regex {
        Regex::new(pattern).unwrap_or_else(|e| {
            panic!("Internal error: invalid regex pattern '{}': {}", pattern, e)
        })
    }

    vec![
        // Unanchored, so `11=11` and `2>10` match as well.
        (compile(r"(?i)1\s*=\s*1"), "1 = 1"),
        (compile(r"(?i)2\s*>\s*1"), "2 > 1"),
        // Flags any literal compared with a literal, equal or not.
        (compile(r"(?i)'[^']*'\s*=\s*N?'[^']*'"), "'literal' = 'literal'"),
    ]
});

/// Return a description of the first always-true pattern found in a clause.
pub(crate) fn detect_always_true(clause: &str) -> Option<&'static str> {
    ALWAYS_TRUE_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(clause))
        .map(|(_, description)| *description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tautologies() {
        assert_eq!(detect_always_true("1=1"), Some("1 = 1"));
        assert_eq!(detect_always_true("id = 3 OR 1 = 1"), Some("1 = 1"));
        assert_eq!(detect_always_true("(1\n=\t1)"), Some("1 = 1"));
        assert_eq!(detect_always_true("2>1"), Some("2 > 1"));
        assert_eq!(detect_always_true("a = 1 or 2 > 1"), Some("2 > 1"));
    }

    #[test]
    fn test_numeric_patterns_match_inside_longer_numbers() {
        assert_eq!(detect_always_true("11=11"), Some("1 = 1"));
        assert_eq!(detect_always_true("101 = 101"), Some("1 = 1"));
        assert_eq!(detect_always_true("x = 1 OR 2>10"), Some("2 > 1"));
        assert_eq!(detect_always_true("col1=1"), Some("1 = 1"));
    }

    #[test]
    fn test_numeric_patterns_need_adjacent_digits() {
        assert_eq!(detect_always_true("id = 11"), None);
        assert_eq!(detect_always_true("price = 2.5"), None);
        assert_eq!(detect_always_true("x = 12 > 30"), None);
    }

    #[test]
    fn test_literal_equals_literal_is_content_agnostic() {
        assert!(detect_always_true("'a'='a'").is_some());
        assert!(detect_always_true("'a'='b'").is_some());
        assert!(detect_always_true("name = 'x' OR 'p' = N'q'").is_some());
        assert!(detect_always_true("n'' = n''").is_some());
    }

    #[test]
    fn test_ordinary_conditions() {
        assert_eq!(detect_always_true("id = 5"), None);
        assert_eq!(detect_always_true("name = 'x' AND code = 'y'"), None);
        assert_eq!(detect_always_true("status IN ('a', 'b')"), None);
    }
}

//! Statement-shape analysis over the scanner's keyword stream.
//!
//! Determines the leading verb, tallies DML verbs and dangerous keywords, and
//! enforces the single-statement, no-DDL and verb-exclusivity rules.

use super::lexer::{KeywordKind, Span, SpanKind};
use super::validation::{OperationKind, ReasonCode, Rejection};

/// Dangerous keyword family, in the order reported to users.
const DANGEROUS_FAMILY: &str = "DROP, TRUNCATE, ALTER, CREATE, RENAME";

/// Keyword tallies for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StatementShape {
    /// Keyword of the first significant span, if that span is a keyword.
    pub leading: Option<KeywordKind>,
    pub selects: usize,
    pub updates: usize,
    pub inserts: usize,
    pub deletes: usize,
    pub dangerous: usize,
    pub first_dangerous: Option<KeywordKind>,
}

impl StatementShape {
    /// Tally keywords, rejecting batches as soon as content follows a semicolon.
    pub fn analyze(source: &str, spans: &[Span]) -> Result<Self, Rejection> {
        let mut shape = StatementShape::default();
        let mut seen_semicolon = false;
        let mut seen_significant = false;

        for span in spans.iter().filter(|s| s.is_significant(source)) {
            if span.kind == SpanKind::Semicolon {
                seen_semicolon = true;
                seen_significant = true;
                continue;
            }

            if seen_semicolon {
                return Err(Rejection::new(
                    ReasonCode::MultipleStatements,
                    "multiple statements separated by semicolon are not allowed",
                ));
            }

            let keyword = span.keyword();
            if !seen_significant {
                shape.leading = keyword;
                seen_significant = true;
            }

            match keyword {
                Some(KeywordKind::Select) => shape.selects += 1,
                Some(KeywordKind::Update) => shape.updates += 1,
                Some(KeywordKind::Insert) => shape.inserts += 1,
                Some(KeywordKind::Delete) => shape.deletes += 1,
                Some(kind) if kind.is_dangerous() => {
                    shape.dangerous += 1;
                    if shape.first_dangerous.is_none() {
                        shape.first_dangerous = Some(kind);
                    }
                }
                _ => {}
            }
        }

        Ok(shape)
    }

    /// Number of occurrences of a DML verb.
    pub fn count(&self, verb: KeywordKind) -> usize {
        match verb {
            KeywordKind::Select => self.selects,
            KeywordKind::Update => self.updates,
            KeywordKind::Insert => self.inserts,
            KeywordKind::Delete => self.deletes,
            _ => 0,
        }
    }

    /// Apply the dangerous-keyword, leading-verb and exclusivity rules.
    pub fn check(&self, operation: OperationKind) -> Result<(), Rejection> {
        let leading_is_dangerous = self.leading.is_some_and(|k| k.is_dangerous());
        if leading_is_dangerous || (operation != OperationKind::Insert && self.dangerous > 0) {
            let found = self.first_dangerous.map(|k| k.as_str()).unwrap_or("DDL");
            return Err(Rejection::new(
                ReasonCode::DangerousKeyword,
                format!("statement contains dangerous keyword {found} ({DANGEROUS_FAMILY} are not allowed)"),
            ));
        }

        let verb = operation.keyword();
        if self.leading != Some(verb) {
            return Err(Rejection::new(
                ReasonCode::WrongLeadingVerb,
                format!("{operation} statement must begin with {operation}"),
            ));
        }

        match operation {
            OperationKind::Select => {
                if self.updates + self.inserts + self.deletes > 0 {
                    return Err(Rejection::new(
                        ReasonCode::MixedDmlVerbs,
                        "SELECT statement must not contain UPDATE, INSERT or DELETE",
                    ));
                }
            }
            OperationKind::Update | OperationKind::Insert | OperationKind::Delete => {
                if self.count(verb) > 1 {
                    return Err(Rejection::new(
                        ReasonCode::RepeatedVerb,
                        format!("{operation} keyword appears more than once"),
                    ));
                }
                let mixed = [KeywordKind::Update, KeywordKind::Insert, KeywordKind::Delete]
                    .into_iter()
                    .filter(|k| *k != verb)
                    .find(|k| self.count(*k) > 0);
                if let Some(other) = mixed {
                    return Err(Rejection::new(
                        ReasonCode::MixedDmlVerbs,
                        format!("{operation} statement must not contain {other}"),
                    ));
                }
            }
        }

        Ok(())
    }
}

//! Statement validation for the four console operations.
//!
//! Every rejection is a returned [`ValidationOutcome`]; validation never
//! panics and never returns an error for representable input.

use super::clause::locate_where_clause;
use super::lexer::{scan, KeywordKind, Span, SpanKind};
use super::shape::StatementShape;
use super::tautology::detect_always_true;
use crate::constants::{BYTE_ORDER_MARK, MAX_SELECT_ROWS};
use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Operation a caller declares for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Select,
    Update,
    Insert,
    Delete,
}

impl OperationKind {
    /// The verb keyword the statement must begin with.
    pub fn keyword(&self) -> KeywordKind {
        match self {
            OperationKind::Select => KeywordKind::Select,
            OperationKind::Update => KeywordKind::Update,
            OperationKind::Insert => KeywordKind::Insert,
            OperationKind::Delete => KeywordKind::Delete,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.keyword().as_str()
    }

    /// Check if this operation modifies data.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, OperationKind::Select)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "select" => Ok(OperationKind::Select),
            "update" => Ok(OperationKind::Update),
            "insert" => Ok(OperationKind::Insert),
            "delete" => Ok(OperationKind::Delete),
            other => Err(ConsoleError::invalid_input(format!(
                "unknown operation '{}', expected select, update, insert or delete",
                other
            ))),
        }
    }
}

/// Why a statement was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    EmptyStatement,
    WrongLeadingVerb,
    MultipleStatements,
    DangerousKeyword,
    MixedDmlVerbs,
    RepeatedVerb,
    MissingTopN,
    InvalidTopNValue,
    TopNTooLarge,
    MissingWhereClause,
    AlwaysTrueCondition,
    ImpreciseWhereClause,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::EmptyStatement => "empty_statement",
            ReasonCode::WrongLeadingVerb => "wrong_leading_verb",
            ReasonCode::MultipleStatements => "multiple_statements",
            ReasonCode::DangerousKeyword => "dangerous_keyword",
            ReasonCode::MixedDmlVerbs => "mixed_dml_verbs",
            ReasonCode::RepeatedVerb => "repeated_verb",
            ReasonCode::MissingTopN => "missing_top_n",
            ReasonCode::InvalidTopNValue => "invalid_top_n_value",
            ReasonCode::TopNTooLarge => "top_n_too_large",
            ReasonCode::MissingWhereClause => "missing_where_clause",
            ReasonCode::AlwaysTrueCondition => "always_true_condition",
            ReasonCode::ImpreciseWhereClause => "imprecise_where_clause",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the statement may be executed
    pub valid: bool,
    /// Rejection reason, present exactly when `valid` is false
    pub reason: Option<ReasonCode>,
    /// Human-readable description
    pub message: String,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self {
            valid: true,
            reason: None,
            message: "validation passed".to_string(),
        }
    }

    pub fn rejected(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// A single rule failure, carried through `?` inside the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rejection {
    pub reason: ReasonCode,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl From<Rejection> for ValidationOutcome {
    fn from(r: Rejection) -> Self {
        ValidationOutcome::rejected(r.reason, r.message)
    }
}

/// Statement text together with the operation the caller declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawStatement<'a> {
    pub text: &'a str,
    pub declared_operation: OperationKind,
}

impl<'a> RawStatement<'a> {
    pub fn new(text: &'a str, declared_operation: OperationKind) -> Self {
        Self {
            text,
            declared_operation,
        }
    }
}

/// Immutable policy limits shared by all validations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Largest `TOP N` allowed on any SELECT
    pub max_select_rows: u64,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            max_select_rows: MAX_SELECT_ROWS,
        }
    }
}

/// Stateless SQL statement validator.
///
/// Cloning is cheap; clones share one policy.
#[derive(Debug, Clone, Default)]
pub struct StatementValidator {
    policy: Arc<ValidationPolicy>,
}

impl StatementValidator {
    /// Create a validator with its own policy.
    pub fn new(policy: ValidationPolicy) -> Self {
        Self::with_shared_policy(Arc::new(policy))
    }

    /// Create a validator that shares an existing policy.
    pub fn with_shared_policy(policy: Arc<ValidationPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validate statement text against a declared operation.
    pub fn validate(&self, text: &str, operation: OperationKind) -> ValidationOutcome {
        self.validate_statement(&RawStatement::new(text, operation))
    }

    /// Validate a raw statement.
    pub fn validate_statement(&self, statement: &RawStatement<'_>) -> ValidationOutcome {
        match self.check(statement.text, statement.declared_operation) {
            Ok(()) => ValidationOutcome::passed(),
            Err(rejection) => {
                debug!(
                    operation = %statement.declared_operation,
                    reason = %rejection.reason,
                    "Statement rejected: {}",
                    rejection.message
                );
                rejection.into()
            }
        }
    }

    fn check(&self, text: &str, operation: OperationKind) -> Result<(), Rejection> {
        let text = text.trim_start_matches(BYTE_ORDER_MARK);
        let spans = scan(text);

        if !spans.iter().any(|s| s.is_significant(text)) {
            return Err(Rejection::new(
                ReasonCode::EmptyStatement,
                "SQL statement must not be empty",
            ));
        }

        let shape = StatementShape::analyze(text, &spans)?;
        shape.check(operation)?;

        match operation {
            OperationKind::Select => self.check_select(text, &spans),
            OperationKind::Update | OperationKind::Delete => check_where(text, &spans, operation),
            OperationKind::Insert => Ok(()),
        }
    }

    /// Every SELECT, nested ones included, must carry `TOP N` within bounds.
    fn check_select(&self, source: &str, spans: &[Span]) -> Result<(), Rejection> {
        let significant: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_significant(source))
            .map(|(index, _)| index)
            .collect();

        for (position, &index) in significant.iter().enumerate() {
            if spans[index].keyword() != Some(KeywordKind::Select) {
                continue;
            }

            let top = significant[position + 1..]
                .iter()
                .copied()
                .find(|&i| {
                    !matches!(
                        spans[i].keyword(),
                        Some(KeywordKind::Distinct | KeywordKind::All)
                    )
                })
                .filter(|&i| spans[i].keyword() == Some(KeywordKind::Top))
                .ok_or_else(|| {
                    Rejection::new(
                        ReasonCode::MissingTopN,
                        "all SELECTs, including subqueries, must use TOP N (for example SELECT TOP 100 *)",
                    )
                })?;

            let rows = parse_top_value(&plain_text_after(source, &spans[top + 1..]))?;
            if rows <= 0 {
                return Err(Rejection::new(
                    ReasonCode::InvalidTopNValue,
                    "N in TOP N must be a positive integer",
                ));
            }
            if (rows as u64) > self.policy.max_select_rows {
                return Err(Rejection::new(
                    ReasonCode::TopNTooLarge,
                    format!(
                        "TOP {} exceeds max rows: a query may return at most {} rows",
                        rows, self.policy.max_select_rows
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// UPDATE and DELETE need a precise, non-trivial WHERE clause.
fn check_where(source: &str, spans: &[Span], operation: OperationKind) -> Result<(), Rejection> {
    let clause = locate_where_clause(source, spans).ok_or_else(|| {
        Rejection::new(
            ReasonCode::MissingWhereClause,
            format!("{} operation must include a WHERE condition", operation),
        )
    })?;

    if let Some(pattern) = detect_always_true(&clause.cleaned) {
        return Err(Rejection::new(
            ReasonCode::AlwaysTrueCondition,
            format!("WHERE condition looks like an always-true tautology ({pattern})"),
        ));
    }

    if !clause.has_exact_match() {
        return Err(Rejection::new(
            ReasonCode::ImpreciseWhereClause,
            "high-risk operation requires an exact = or IN match in its WHERE condition",
        ));
    }

    Ok(())
}

/// Plain text up to the next literal, identifier or keyword, comments read as a space.
fn plain_text_after(source: &str, spans: &[Span]) -> String {
    let mut text = String::new();
    for span in spans {
        match span.kind {
            SpanKind::Plain => text.push_str(span.text(source)),
            SpanKind::LineComment | SpanKind::BlockComment => text.push(' '),
            _ => break,
        }
    }
    text
}

/// Parse the row count following a `TOP` keyword, bare or parenthesized.
fn parse_top_value(text: &str) -> Result<i64, Rejection> {
    let invalid = |raw: &str| {
        Rejection::new(
            ReasonCode::InvalidTopNValue,
            format!("cannot parse the TOP N value '{}'", raw),
        )
    };

    let rest = text.trim_start();
    let (raw, after) = match rest.strip_prefix('(') {
        Some(inner) => {
            let close = inner.find(')').ok_or_else(|| invalid(rest))?;
            (inner[..close].trim(), &inner[close + 1..])
        }
        None => {
            let end = rest
                .find(|c: char| c.is_whitespace() || matches!(c, '*' | ',' | ';' | '(' | ')'))
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        }
    };

    let rows = raw.parse::<i64>().map_err(|_| invalid(raw))?;

    // TOP n PERCENT is a fraction of the table, not a row bound.
    let next_word = after
        .trim_start()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or("");
    if next_word.eq_ignore_ascii_case("PERCENT") {
        return Err(Rejection::new(
            ReasonCode::InvalidTopNValue,
            "TOP N PERCENT is not allowed, use an absolute row count",
        ));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> StatementValidator {
        StatementValidator::default()
    }

    fn reason(sql: &str, operation: OperationKind) -> Option<ReasonCode> {
        validator().validate(sql, operation).reason
    }

    #[test]
    fn test_operation_parsing() {
        assert_eq!("select".parse::<OperationKind>().unwrap(), OperationKind::Select);
        assert_eq!(" DELETE ".parse::<OperationKind>().unwrap(), OperationKind::Delete);
        assert!("merge".parse::<OperationKind>().is_err());
        assert!(OperationKind::Update.is_mutation());
        assert!(!OperationKind::Select.is_mutation());
    }

    #[test]
    fn test_empty_statement() {
        for sql in ["", "   \n\t", "\u{feff}", "\u{feff}  ", "-- nothing here", "/* */"] {
            assert_eq!(
                reason(sql, OperationKind::Select),
                Some(ReasonCode::EmptyStatement),
                "{sql:?}"
            );
        }
    }

    #[test]
    fn test_byte_order_mark_stripped() {
        assert_eq!(reason("\u{feff}SELECT TOP 5 * FROM t", OperationKind::Select), None);
    }

    #[test]
    fn test_outcome_shape() {
        let ok = validator().validate("SELECT TOP 5 * FROM t", OperationKind::Select);
        assert!(ok.is_valid());
        assert!(ok.reason.is_none());

        let rejected = validator().validate("SELECT * FROM t", OperationKind::Select);
        assert!(!rejected.valid);
        assert_eq!(rejected.reason, Some(ReasonCode::MissingTopN));
        assert!(rejected.message.contains("TOP N"));
    }

    #[test]
    fn test_select_top_forms() {
        assert_eq!(reason("SELECT TOP 10 * FROM t", OperationKind::Select), None);
        assert_eq!(reason("SELECT TOP (10) * FROM t", OperationKind::Select), None);
        assert_eq!(reason("SELECT TOP(10)* FROM t", OperationKind::Select), None);
        assert_eq!(reason("select distinct top 10 a FROM t", OperationKind::Select), None);
        assert_eq!(reason("SELECT ALL TOP 1000 a FROM t", OperationKind::Select), None);
        assert_eq!(
            reason("SELECT /* hint */ TOP 10 a FROM t", OperationKind::Select),
            None
        );
    }

    #[test]
    fn test_top_value_next_to_comments() {
        for sql in [
            "SELECT TOP 10/*x*/ * FROM t",
            "SELECT TOP /*x*/ 10 * FROM t",
            "SELECT TOP -- rows\n10 * FROM t",
            "SELECT TOP (/*x*/10) * FROM t",
        ] {
            assert_eq!(reason(sql, OperationKind::Select), None, "{sql:?}");
        }
        assert_eq!(
            reason("SELECT TOP 10 /*x*/ PERCENT * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP /*x*/ 2000 * FROM t", OperationKind::Select),
            Some(ReasonCode::TopNTooLarge)
        );
    }

    #[test]
    fn test_select_top_bounds() {
        assert_eq!(
            reason("SELECT TOP 1001 * FROM t", OperationKind::Select),
            Some(ReasonCode::TopNTooLarge)
        );
        assert_eq!(
            reason("SELECT TOP 0 * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP -5 * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP abc * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP (@n) * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP 99999999999999999999999 * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP 100 PERCENT * FROM t", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
        assert_eq!(
            reason("SELECT TOP", OperationKind::Select),
            Some(ReasonCode::InvalidTopNValue)
        );
    }

    #[test]
    fn test_custom_row_limit() {
        let v = StatementValidator::new(ValidationPolicy { max_select_rows: 50 });
        assert!(v.validate("SELECT TOP 50 * FROM t", OperationKind::Select).valid);
        assert_eq!(
            v.validate("SELECT TOP 51 * FROM t", OperationKind::Select).reason,
            Some(ReasonCode::TopNTooLarge)
        );
    }

    #[test]
    fn test_every_select_needs_top() {
        assert_eq!(
            reason(
                "SELECT TOP 10 * FROM t WHERE id IN (SELECT id FROM u)",
                OperationKind::Select
            ),
            Some(ReasonCode::MissingTopN)
        );
        assert_eq!(
            reason(
                "SELECT TOP 10 * FROM t WHERE id IN (SELECT TOP 2000 id FROM u)",
                OperationKind::Select
            ),
            Some(ReasonCode::TopNTooLarge)
        );
        assert_eq!(
            reason(
                "SELECT TOP 10 * FROM t WHERE id IN (SELECT TOP 20 id FROM u)",
                OperationKind::Select
            ),
            None
        );
    }

    #[test]
    fn test_top_hidden_in_noise_does_not_count() {
        assert_eq!(
            reason("SELECT /* TOP 10 */ * FROM t", OperationKind::Select),
            Some(ReasonCode::MissingTopN)
        );
        assert_eq!(
            reason("SELECT [TOP] FROM t", OperationKind::Select),
            Some(ReasonCode::MissingTopN)
        );
    }

    #[test]
    fn test_update_and_delete() {
        assert_eq!(reason("UPDATE t SET x=1 WHERE id=5", OperationKind::Update), None);
        assert_eq!(
            reason("DELETE FROM t WHERE id IN (1, 2, 3)", OperationKind::Delete),
            None
        );
        assert_eq!(
            reason("UPDATE t SET x=1", OperationKind::Update),
            Some(ReasonCode::MissingWhereClause)
        );
        assert_eq!(
            reason("UPDATE t SET x=1 WHERE 1=1", OperationKind::Update),
            Some(ReasonCode::AlwaysTrueCondition)
        );
        assert_eq!(
            reason("DELETE FROM t WHERE id > 100", OperationKind::Delete),
            Some(ReasonCode::ImpreciseWhereClause)
        );
        assert_eq!(
            reason("DELETE FROM t WHERE", OperationKind::Delete),
            Some(ReasonCode::ImpreciseWhereClause)
        );
    }

    #[test]
    fn test_tautology_behind_literal_order_by() {
        assert_eq!(
            reason(
                "DELETE FROM t WHERE title='ORDER BY trick' OR 1=1",
                OperationKind::Delete
            ),
            Some(ReasonCode::AlwaysTrueCondition)
        );
    }

    #[test]
    fn test_insert_has_no_clause_checks() {
        assert_eq!(
            reason("INSERT INTO t (a, b) VALUES (1, 'x')", OperationKind::Insert),
            None
        );
    }

    #[test]
    fn test_validator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StatementValidator>();

        let policy = Arc::new(ValidationPolicy::default());
        let a = StatementValidator::with_shared_policy(policy.clone());
        let b = a.clone();
        assert_eq!(a.policy(), b.policy());
        assert_eq!(Arc::strong_count(&policy), 3);
    }
}

//! Statement safety validation for the SQL console.
//!
//! Text is scanned once into typed spans; every rule works on that span
//! stream so comments, string literals and bracketed identifiers never
//! masquerade as keywords.

mod clause;
mod lexer;
mod shape;
mod tautology;
mod validation;

pub use lexer::{scan, KeywordKind, Span, SpanKind};
pub use validation::{
    OperationKind, RawStatement, ReasonCode, StatementValidator, ValidationOutcome,
    ValidationPolicy,
};

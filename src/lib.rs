//! # SQL Console Guard
//!
//! A safety gate for ad-hoc SQL typed into an operations console.
//!
//! This crate provides:
//! - **Validation**: per-operation rules (TOP N bounds, precise WHERE clauses,
//!   no batches, no DDL) over a lexical scan that ignores comments, string
//!   literals and bracketed identifiers
//! - **Execution**: named SQL Server data sources, one connection per
//!   statement, and a hard execution deadline
//!
//! ## Architecture
//!
//! - [`security`] is pure and synchronous; it never touches a database
//! - [`console::SqlConsole`] admits a statement through the validator,
//!   resolves its data source and hands it to a [`database::StatementRunner`]

pub mod config;
pub mod console;
pub mod constants;
pub mod database;
pub mod error;
pub mod registry;
pub mod security;

pub use config::Config;
pub use console::{ExecuteSqlRequest, ExecutionResponse, SqlConsole};
pub use error::ConsoleError;
pub use registry::DataSourceRegistry;
pub use security::{OperationKind, ReasonCode, StatementValidator, ValidationOutcome};

//! Database connectivity and statement execution.

mod connection;
mod query;
mod runner;
pub mod types;

pub use connection::{create_config, create_connection, RawConnection};
pub use query::{truncate_for_log, QueryResult, ResultRow};
pub use runner::{StatementRunner, TiberiusRunner};
pub use types::SqlValue;

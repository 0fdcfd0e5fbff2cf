//! Error types for the SQL console.
//!
//! Validation rejections are values ([`crate::security::ValidationOutcome`]);
//! this module covers everything that can go wrong around them: configuration,
//! data-source resolution and statement execution.

use crate::security::ReasonCode;
use thiserror::Error;

/// Errors raised by the console and its execution stage.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Statement failed validation and was not executed
    #[error("Statement rejected ({reason}): {message}")]
    Rejected { reason: ReasonCode, message: String },

    /// No data source with this name is configured
    #[error("Data source not found: {0}")]
    DataSourceNotFound(String),

    /// Data source is configured but switched off
    #[error("Data source is disabled: {0}")]
    DataSourceDisabled(String),

    /// Connection error
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Statement execution error
    #[error("Query execution error: {message}")]
    QueryExecution {
        message: String,
        sql_error_code: Option<i32>,
    },

    /// Execution deadline expired
    #[error("Query timeout: execution exceeded {timeout_ms} ms and was cancelled")]
    Timeout { timeout_ms: u64 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a rejection error from a validator verdict.
    pub fn rejected(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            message: message.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error with a source.
    pub fn connection_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn query_error(msg: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: None,
        }
    }

    /// Create a query execution error carrying the server's error number.
    pub fn query_error_with_code(msg: impl Into<String>, code: i32) -> Self {
        Self::QueryExecution {
            message: msg.into(),
            sql_error_code: Some(code),
        }
    }

    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The rejection reason, if this error is a validation rejection.
    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Rejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Check if this error is transient and may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::QueryExecution {
                sql_error_code: Some(code),
                ..
            } => is_transient_sql_error(*code),
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check the SQL_CONSOLE_* environment variables"),
            Self::Rejected { .. } => Some("Rewrite the statement to satisfy the console safety rules"),
            Self::DataSourceNotFound(_) => Some("Pick one of the configured data sources"),
            Self::DataSourceDisabled(_) => {
                Some("Enable the data source in configuration or pick another one")
            }
            Self::Connection { .. } => {
                Some("Check server hostname, port, credentials and network connectivity")
            }
            Self::Timeout { .. } => Some("Narrow the statement so it finishes within the deadline"),
            _ => None,
        }
    }
}

/// Map SQL Server error numbers to console errors.
pub fn from_sql_error(code: i32, message: &str) -> ConsoleError {
    match code {
        18456 => ConsoleError::connection(format!("Login failed: {}", message)),
        4060 => ConsoleError::connection(format!("Cannot open database: {}", message)),
        -1 => ConsoleError::connection("Connection broken"),
        53 => ConsoleError::connection("Server not found or not accessible"),
        -2 => ConsoleError::timeout(0),

        102 => ConsoleError::query_error_with_code(format!("Syntax error: {}", message), code),
        207 => ConsoleError::query_error_with_code(format!("Invalid column: {}", message), code),
        208 => ConsoleError::query_error_with_code(format!("Invalid object: {}", message), code),
        229 | 230 => {
            ConsoleError::query_error_with_code(format!("Permission denied: {}", message), code)
        }
        547 => {
            ConsoleError::query_error_with_code(format!("Constraint violation: {}", message), code)
        }
        2601 | 2627 => ConsoleError::query_error_with_code(format!("Duplicate key: {}", message), code),
        8152 => ConsoleError::query_error_with_code(format!("Data truncation: {}", message), code),
        1205 => ConsoleError::query_error_with_code(
            "Transaction was deadlocked and has been rolled back",
            code,
        ),

        _ => ConsoleError::query_error_with_code(message, code),
    }
}

fn is_transient_sql_error(code: i32) -> bool {
    matches!(
        code,
        -2      // Timeout
        | -1    // Connection broken
        | 1205  // Deadlock
        | 10053 // Connection forcibly closed
        | 10054 // Connection reset
        | 10060 // Connection timed out
    )
}

impl From<tiberius::error::Error> for ConsoleError {
    fn from(e: tiberius::error::Error) -> Self {
        use tiberius::error::Error;

        match e {
            Error::Server(token) => from_sql_error(token.code() as i32, token.message()),
            Error::Io { kind, message } => {
                ConsoleError::connection(format!("IO error ({:?}): {}", kind, message))
            }
            Error::Tls(msg) => ConsoleError::connection(format!("TLS error: {}", msg)),
            Error::Routing { host, port } => {
                ConsoleError::connection(format!("Server requested routing to {}:{}", host, port))
            }
            Error::Protocol(msg) => ConsoleError::connection(format!("Protocol error: {}", msg)),
            Error::Conversion(msg) => {
                ConsoleError::query_error(format!("Type conversion error: {}", msg))
            }
            other => ConsoleError::internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match e.kind() {
            ErrorKind::TimedOut => ConsoleError::timeout(0),
            ErrorKind::ConnectionRefused => {
                ConsoleError::connection_with_source("Connection refused", e)
            }
            _ => ConsoleError::connection_with_source("IO error", e),
        }
    }
}

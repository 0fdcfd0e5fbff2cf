//! Centralized constants for the SQL console guard.
//!
//! This module contains the policy limits and default values used throughout
//! the codebase, making them easy to find, understand, and modify.

use std::time::Duration;

// =============================================================================
// Validation Policy Constants
// =============================================================================

/// Largest `TOP N` a SELECT statement may request.
pub const MAX_SELECT_ROWS: u64 = 1000;

/// Default maximum statement length in bytes.
pub const DEFAULT_MAX_STATEMENT_LENGTH: usize = 1_000_000;

/// Byte-order mark that browsers occasionally prepend to pasted text.
pub const BYTE_ORDER_MARK: char = '\u{feff}';

// =============================================================================
// Execution Constants
// =============================================================================

/// Default wall-clock deadline for a single statement in milliseconds.
pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 5000;

/// Default execution deadline as Duration.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_millis(DEFAULT_EXECUTION_TIMEOUT_MS);

/// Default SQL Server port.
pub const DEFAULT_PORT: u16 = 1433;

/// Application name reported to SQL Server.
pub const APPLICATION_NAME: &str = "sql-console-guard";

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "SQL_CONSOLE_";

/// Prefix for per-data-source variables, followed by the normalized name.
pub const ENV_DATASOURCE_PREFIX: &str = "SQL_CONSOLE_DS_";

// =============================================================================
// Logging Constants
// =============================================================================

/// Default truncation length for statement logging.
pub const LOG_QUERY_TRUNCATE_LENGTH: usize = 200;

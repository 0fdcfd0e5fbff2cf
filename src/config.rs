//! Configuration management for the SQL console.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.

use crate::constants::{
    APPLICATION_NAME, DEFAULT_EXECUTION_TIMEOUT, DEFAULT_MAX_STATEMENT_LENGTH, DEFAULT_PORT,
    ENV_DATASOURCE_PREFIX, ENV_PREFIX, MAX_SELECT_ROWS,
};
use crate::error::ConsoleError;
use crate::security::ValidationPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Console configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Limits applied to every statement
    pub console: ConsoleConfig,

    /// Named target databases, in declaration order
    pub data_sources: Vec<DataSourceConfig>,
}

/// Statement limits and execution deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Largest `TOP N` a SELECT may request
    pub max_select_rows: u64,

    /// Maximum statement length (bytes)
    pub max_statement_length: usize,

    /// Wall-clock deadline for one statement
    pub execution_timeout: Duration,
}

/// One named target database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Name callers use to pick this source
    pub name: String,

    /// SQL Server hostname or IP address
    pub host: String,

    /// SQL Server port (default: 1433)
    pub port: u16,

    /// Initial database, server default when absent
    pub database: Option<String>,

    /// SQL Server login
    pub credentials: SqlCredentials,

    /// Disabled sources stay configured but refuse statements
    pub enabled: bool,

    /// Enable TLS encryption
    pub encrypt: bool,

    /// Trust server certificate (for self-signed certs)
    pub trust_server_certificate: bool,

    /// Application name sent to SQL Server
    pub application_name: String,
}

/// SQL Server authentication (username/password).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlCredentials {
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SQL_CONSOLE_MAX_SELECT_ROWS`: Largest TOP N (default: 1000)
    /// - `SQL_CONSOLE_MAX_STATEMENT_LENGTH`: Maximum statement bytes (default: 1000000)
    /// - `SQL_CONSOLE_EXECUTION_TIMEOUT_MS`: Execution deadline (default: 5000)
    /// - `SQL_CONSOLE_DATASOURCES`: Comma-separated data-source names
    ///
    /// For each data source, with the name upper-cased and `-` replaced by `_`:
    ///
    /// - `SQL_CONSOLE_DS_<NAME>_HOST`: Hostname (required)
    /// - `SQL_CONSOLE_DS_<NAME>_USER` / `_PASSWORD`: Login (required)
    /// - `SQL_CONSOLE_DS_<NAME>_PORT`: Port (default: 1433)
    /// - `SQL_CONSOLE_DS_<NAME>_DATABASE`: Initial database
    /// - `SQL_CONSOLE_DS_<NAME>_ENABLED`: Accept statements (default: true)
    /// - `SQL_CONSOLE_DS_<NAME>_ENCRYPT`: Enable TLS (default: true)
    /// - `SQL_CONSOLE_DS_<NAME>_TRUST_CERT`: Trust server certificate (default: false)
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let console = ConsoleConfig::from_lookup(&lookup)?;
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        let names: Vec<String> = var("DATASOURCES")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        for (i, name) in names.iter().enumerate() {
            if names[..i].iter().any(|n| n.eq_ignore_ascii_case(name)) {
                return Err(ConsoleError::config(format!(
                    "data source '{}' is declared more than once",
                    name
                )));
            }
        }

        let data_sources = names
            .iter()
            .map(|name| DataSourceConfig::from_lookup(name, &lookup))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            console,
            data_sources,
        })
    }

    /// Validation policy derived from the console limits.
    pub fn validation_policy(&self) -> ValidationPolicy {
        self.console.validation_policy()
    }
}

impl ConsoleConfig {
    /// Load only the statement limits, ignoring data-source variables.
    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));

        let max_select_rows = var("MAX_SELECT_ROWS")
            .and_then(|p| p.parse().ok())
            .unwrap_or(MAX_SELECT_ROWS);
        if max_select_rows == 0 {
            return Err(ConsoleError::config(
                "SQL_CONSOLE_MAX_SELECT_ROWS must be greater than zero",
            ));
        }

        let max_statement_length = var("MAX_STATEMENT_LENGTH")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_MAX_STATEMENT_LENGTH);

        let execution_timeout = var("EXECUTION_TIMEOUT_MS")
            .and_then(|p| p.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_EXECUTION_TIMEOUT);
        if execution_timeout.is_zero() {
            return Err(ConsoleError::config(
                "SQL_CONSOLE_EXECUTION_TIMEOUT_MS must be greater than zero",
            ));
        }

        Ok(ConsoleConfig {
            max_select_rows,
            max_statement_length,
            execution_timeout,
        })
    }

    /// Validation policy derived from these limits.
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            max_select_rows: self.max_select_rows,
        }
    }
}

impl DataSourceConfig {
    /// Environment-variable stem for a data-source name.
    pub fn env_key(name: &str) -> String {
        let normalized: String = name
            .trim()
            .chars()
            .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        format!("{}{}_", ENV_DATASOURCE_PREFIX, normalized)
    }

    fn from_lookup<F>(name: &str, lookup: &F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let stem = Self::env_key(name);
        let var = |suffix: &str| lookup(&format!("{}{}", stem, suffix));

        let host = var("HOST").ok_or_else(|| {
            ConsoleError::config(format!("{}HOST is required for data source '{}'", stem, name))
        })?;

        let credentials = match (var("USER"), var("PASSWORD")) {
            (Some(username), Some(password)) => SqlCredentials { username, password },
            (Some(_), None) => {
                return Err(ConsoleError::config(format!(
                    "{}PASSWORD is required when {}USER is set",
                    stem, stem
                )))
            }
            (None, Some(_)) => {
                return Err(ConsoleError::config(format!(
                    "{}USER is required when {}PASSWORD is set",
                    stem, stem
                )))
            }
            (None, None) => {
                return Err(ConsoleError::config(format!(
                    "Authentication required for data source '{}': set {}USER and {}PASSWORD",
                    name, stem, stem
                )))
            }
        };

        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(DataSourceConfig {
            name: name.to_string(),
            host,
            port,
            database: var("DATABASE").filter(|d| !d.is_empty()),
            credentials,
            enabled: var("ENABLED").map(|v| parse_flag(&v)).unwrap_or(true),
            encrypt: var("ENCRYPT").map(|v| parse_flag(&v)).unwrap_or(true),
            trust_server_certificate: var("TRUST_CERT").map(|v| parse_flag(&v)).unwrap_or(false),
            application_name: APPLICATION_NAME.to_string(),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_select_rows: MAX_SELECT_ROWS,
            max_statement_length: DEFAULT_MAX_STATEMENT_LENGTH,
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }
}

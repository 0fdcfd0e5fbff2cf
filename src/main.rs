//! SQL console guard entry point.
//!
//! Reads one statement from stdin. Without `--data-source` the statement is
//! only validated; with it the statement is executed through the console.
//! JSON results go to stdout, logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use sql_console_guard::config::ConsoleConfig;
use sql_console_guard::database::TiberiusRunner;
use sql_console_guard::{
    Config, ExecuteSqlRequest, OperationKind, SqlConsole, StatementValidator,
};
use std::io::Read;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sql-console-guard", version, about = "Validate and run console SQL statements")]
struct Cli {
    /// Declared operation: select, update, insert or delete
    operation: OperationKind,

    /// Execute against this configured data source instead of only validating
    #[arg(long, short = 'd', env = "SQL_CONSOLE_DATA_SOURCE")]
    data_source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();

    let cli = Cli::parse();

    let mut sql = String::new();
    std::io::stdin()
        .read_to_string(&mut sql)
        .context("failed to read statement from stdin")?;

    let Some(data_source) = cli.data_source else {
        // Validation needs the limits only; data-source variables stay unread.
        let limits = ConsoleConfig::from_env()?;
        let outcome = StatementValidator::new(limits.validation_policy())
            .validate(&sql, cli.operation);
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(if outcome.valid {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    };

    let config = Config::from_env()?;
    info!(
        data_sources = config.data_sources.len(),
        "Configuration loaded"
    );

    let console = SqlConsole::new(&config, TiberiusRunner::new());
    let request = ExecuteSqlRequest {
        data_source,
        sql,
        operation: cli.operation,
    };

    match console.run(&request).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let body = serde_json::json!({
                "error": e.to_string(),
                "reason": e.reason(),
                "suggestion": e.suggestion(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Initialize tracing subscriber with stderr output.
///
/// Stdout carries the JSON result only.
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,sql_console_guard=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

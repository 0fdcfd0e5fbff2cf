//! Statement execution against a data source.

use super::connection::create_connection;
use super::query::{collect_rows, truncate_for_log, QueryResult};
use crate::config::DataSourceConfig;
use crate::constants::LOG_QUERY_TRUNCATE_LENGTH;
use crate::error::ConsoleError;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info};

/// Executes already-validated statement text.
///
/// Implementations must be cancel-safe: dropping a returned future abandons
/// the statement.
pub trait StatementRunner: Send + Sync {
    /// Run a SELECT and collect its rows.
    fn query(
        &self,
        source: &DataSourceConfig,
        sql: &str,
    ) -> impl Future<Output = Result<QueryResult, ConsoleError>> + Send;

    /// Run an UPDATE, INSERT or DELETE and return the affected-row count.
    fn execute(
        &self,
        source: &DataSourceConfig,
        sql: &str,
    ) -> impl Future<Output = Result<u64, ConsoleError>> + Send;
}

/// Runner that opens a fresh tiberius connection per statement.
///
/// Dropping an in-flight call closes the socket, which makes the server
/// abandon the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiberiusRunner;

impl TiberiusRunner {
    pub fn new() -> Self {
        Self
    }
}

impl StatementRunner for TiberiusRunner {
    async fn query(&self, source: &DataSourceConfig, sql: &str) -> Result<QueryResult, ConsoleError> {
        let start = Instant::now();
        info!(
            data_source = %source.name,
            "Executing query: {}",
            truncate_for_log(sql, LOG_QUERY_TRUNCATE_LENGTH)
        );

        let outcome = async {
            let mut client = create_connection(source).await?;
            let stream = client.simple_query(sql).await?;
            collect_rows(stream, start).await
        }
        .await;

        match outcome {
            Ok(result) => {
                info!(
                    data_source = %source.name,
                    rows = result.row_count(),
                    elapsed_ms = result.execution_time_ms,
                    "Query completed"
                );
                Ok(result)
            }
            Err(e) => {
                error!(
                    data_source = %source.name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Query failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, source: &DataSourceConfig, sql: &str) -> Result<u64, ConsoleError> {
        let start = Instant::now();
        info!(
            data_source = %source.name,
            "Executing statement: {}",
            truncate_for_log(sql, LOG_QUERY_TRUNCATE_LENGTH)
        );

        let outcome = async {
            let mut client = create_connection(source).await?;
            let result = client.execute(sql, &[]).await?;
            Ok::<u64, ConsoleError>(result.rows_affected().iter().sum())
        }
        .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(rows_affected) => {
                info!(
                    data_source = %source.name,
                    rows_affected,
                    elapsed_ms,
                    "Statement completed"
                );
                Ok(rows_affected)
            }
            Err(e) => {
                error!(data_source = %source.name, elapsed_ms, "Statement failed: {}", e);
                Err(e)
            }
        }
    }
}

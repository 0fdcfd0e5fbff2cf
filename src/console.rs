//! The SQL console: validate, resolve a data source, execute under a deadline.

use crate::config::{Config, DataSourceConfig};
use crate::constants::LOG_QUERY_TRUNCATE_LENGTH;
use crate::database::{truncate_for_log, QueryResult, StatementRunner};
use crate::error::ConsoleError;
use crate::registry::DataSourceRegistry;
use crate::security::{OperationKind, StatementValidator};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// One statement submitted to the console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSqlRequest {
    pub data_source: String,
    pub sql: String,
    pub operation: OperationKind,
}

/// Result of a statement that passed validation and ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionResponse {
    /// Rows of a SELECT
    Rows(QueryResult),
    /// Affected-row count of a mutation
    Affected {
        operation: OperationKind,
        rows_affected: u64,
        message: String,
    },
}

impl ExecutionResponse {
    pub fn affected(operation: OperationKind, rows_affected: u64) -> Self {
        Self::Affected {
            operation,
            rows_affected,
            message: format!("{} succeeded", operation.as_str().to_lowercase()),
        }
    }
}

/// Statement gate in front of a [`StatementRunner`].
pub struct SqlConsole<R> {
    validator: StatementValidator,
    registry: DataSourceRegistry,
    runner: R,
    timeout: Duration,
    max_statement_length: usize,
}

impl<R: StatementRunner> SqlConsole<R> {
    pub fn new(config: &Config, runner: R) -> Self {
        Self {
            validator: StatementValidator::new(config.validation_policy()),
            registry: DataSourceRegistry::from_config(config),
            runner,
            timeout: config.console.execution_timeout,
            max_statement_length: config.console.max_statement_length,
        }
    }

    pub fn validator(&self) -> &StatementValidator {
        &self.validator
    }

    pub fn registry(&self) -> &DataSourceRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a SELECT.
    pub async fn query(&self, data_source: &str, sql: &str) -> Result<QueryResult, ConsoleError> {
        let source = self.admit(data_source, sql, OperationKind::Select)?;
        self.with_deadline(OperationKind::Select, self.runner.query(source, sql))
            .await
    }

    /// Run an UPDATE; returns the affected-row count.
    pub async fn update(&self, data_source: &str, sql: &str) -> Result<u64, ConsoleError> {
        self.mutate(data_source, sql, OperationKind::Update).await
    }

    /// Run an INSERT; returns the affected-row count.
    pub async fn insert(&self, data_source: &str, sql: &str) -> Result<u64, ConsoleError> {
        self.mutate(data_source, sql, OperationKind::Insert).await
    }

    /// Run a DELETE; returns the affected-row count.
    pub async fn delete(&self, data_source: &str, sql: &str) -> Result<u64, ConsoleError> {
        self.mutate(data_source, sql, OperationKind::Delete).await
    }

    /// Dispatch a request on its declared operation.
    pub async fn run(&self, request: &ExecuteSqlRequest) -> Result<ExecutionResponse, ConsoleError> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, operation = %request.operation, data_source = %request.data_source, "Console request");

        match request.operation {
            OperationKind::Select => self
                .query(&request.data_source, &request.sql)
                .await
                .map(ExecutionResponse::Rows),
            operation => self
                .mutate(&request.data_source, &request.sql, operation)
                .await
                .map(|n| ExecutionResponse::affected(operation, n)),
        }
    }

    async fn mutate(
        &self,
        data_source: &str,
        sql: &str,
        operation: OperationKind,
    ) -> Result<u64, ConsoleError> {
        let source = self.admit(data_source, sql, operation)?;
        self.with_deadline(operation, self.runner.execute(source, sql))
            .await
    }

    /// Length check, validation and data-source resolution, in that order.
    fn admit(
        &self,
        data_source: &str,
        sql: &str,
        operation: OperationKind,
    ) -> Result<&DataSourceConfig, ConsoleError> {
        if sql.len() > self.max_statement_length {
            return Err(ConsoleError::invalid_input(format!(
                "statement is {} bytes, the limit is {}",
                sql.len(),
                self.max_statement_length
            )));
        }

        let outcome = self.validator.validate(sql, operation);
        if let Some(reason) = outcome.reason {
            warn!(
                %operation,
                %reason,
                "Rejected statement: {}",
                truncate_for_log(sql, LOG_QUERY_TRUNCATE_LENGTH)
            );
            return Err(ConsoleError::rejected(reason, outcome.message));
        }

        self.registry.resolve(data_source)
    }

    async fn with_deadline<T, F>(&self, operation: OperationKind, work: F) -> Result<T, ConsoleError>
    where
        F: Future<Output = Result<T, ConsoleError>>,
    {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(%operation, timeout_ms, "Execution deadline expired, statement cancelled");
                Err(ConsoleError::timeout(timeout_ms))
            }
        }
    }
}

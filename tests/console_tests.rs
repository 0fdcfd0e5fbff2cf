//! Console facade tests with an in-memory runner.

use sql_console_guard::config::{ConsoleConfig, DataSourceConfig, SqlCredentials};
use sql_console_guard::database::{QueryResult, ResultRow, SqlValue, StatementRunner};
use sql_console_guard::{
    Config, ConsoleError, ExecuteSqlRequest, ExecutionResponse, OperationKind, ReasonCode,
    SqlConsole,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every statement it receives and answers with canned results.
#[derive(Clone, Default)]
struct RecordingRunner {
    calls: Arc<Mutex<Vec<(String, String)>>>,
    delay: Option<Duration>,
    rows_affected: u64,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, source: &DataSourceConfig, sql: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((source.name.clone(), sql.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl StatementRunner for RecordingRunner {
    async fn query(&self, source: &DataSourceConfig, sql: &str) -> Result<QueryResult, ConsoleError> {
        self.record(source, sql).await;
        let mut row = ResultRow::new();
        row.insert("id", SqlValue::I32(7));
        Ok(QueryResult {
            columns: vec!["id".to_string()],
            rows: vec![row],
            execution_time_ms: 1,
        })
    }

    async fn execute(&self, source: &DataSourceConfig, sql: &str) -> Result<u64, ConsoleError> {
        self.record(source, sql).await;
        Ok(self.rows_affected)
    }
}

fn source(name: &str, enabled: bool) -> DataSourceConfig {
    DataSourceConfig {
        name: name.to_string(),
        host: "localhost".to_string(),
        port: 1433,
        database: None,
        credentials: SqlCredentials {
            username: "sa".to_string(),
            password: "pw".to_string(),
        },
        enabled,
        encrypt: false,
        trust_server_certificate: true,
        application_name: "test".to_string(),
    }
}

fn config(timeout: Duration) -> Config {
    Config {
        console: ConsoleConfig {
            execution_timeout: timeout,
            max_statement_length: 200,
            ..ConsoleConfig::default()
        },
        data_sources: vec![source("LOCALHOST", true), source("ITEFIS-DB-ONLINE", false)],
    }
}

fn console(runner: RecordingRunner) -> SqlConsole<RecordingRunner> {
    SqlConsole::new(&config(Duration::from_secs(5)), runner)
}

#[tokio::test]
async fn test_query_runs_valid_select() {
    let runner = RecordingRunner::default();
    let console = console(runner.clone());

    let result = console
        .query("localhost", "SELECT TOP 5 id FROM t")
        .await
        .unwrap();

    assert_eq!(result.rows[0].get("id"), Some(&SqlValue::I32(7)));
    assert_eq!(
        runner.calls(),
        vec![("LOCALHOST".to_string(), "SELECT TOP 5 id FROM t".to_string())]
    );
}

#[tokio::test]
async fn test_mutations_return_affected_rows() {
    let runner = RecordingRunner {
        rows_affected: 4,
        ..Default::default()
    };
    let console = console(runner.clone());

    assert_eq!(
        console
            .update("LOCALHOST", "UPDATE t SET a = 1 WHERE id = 1")
            .await
            .unwrap(),
        4
    );
    assert_eq!(
        console
            .insert("LOCALHOST", "INSERT INTO t (a) VALUES (1)")
            .await
            .unwrap(),
        4
    );
    assert_eq!(
        console
            .delete("LOCALHOST", "DELETE FROM t WHERE id IN (1, 2)")
            .await
            .unwrap(),
        4
    );
    assert_eq!(runner.calls().len(), 3);
}

#[tokio::test]
async fn test_rejected_statement_never_reaches_runner() {
    let runner = RecordingRunner::default();
    let console = console(runner.clone());

    let err = console
        .delete("LOCALHOST", "DELETE FROM t WHERE 1=1")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConsoleError::Rejected {
            reason: ReasonCode::AlwaysTrueCondition,
            ..
        }
    ));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_declared_operation_is_enforced() {
    let console = console(RecordingRunner::default());
    let err = console
        .update("LOCALHOST", "DELETE FROM t WHERE id = 1")
        .await
        .unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::WrongLeadingVerb));
}

#[tokio::test]
async fn test_statement_length_limit() {
    let runner = RecordingRunner::default();
    let console = console(runner.clone());
    let sql = format!("SELECT TOP 1 * FROM t WHERE name = '{}'", "x".repeat(300));

    let err = console.query("LOCALHOST", &sql).await.unwrap_err();

    assert!(matches!(err, ConsoleError::InvalidInput(_)));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_data_source_resolution() {
    let console = console(RecordingRunner::default());

    let err = console
        .query("nowhere", "SELECT TOP 1 * FROM t")
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::DataSourceNotFound(_)));

    let err = console
        .query("itefis-db-online", "SELECT TOP 1 * FROM t")
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::DataSourceDisabled(_)));
}

#[tokio::test]
async fn test_validation_precedes_resolution() {
    let console = console(RecordingRunner::default());
    let err = console.query("nowhere", "SELECT * FROM t").await.unwrap_err();
    assert_eq!(err.reason(), Some(ReasonCode::MissingTopN));
}

#[tokio::test]
async fn test_deadline_expiry() {
    let runner = RecordingRunner {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    };
    let console = SqlConsole::new(&config(Duration::from_millis(50)), runner.clone());

    let err = console
        .update("LOCALHOST", "UPDATE t SET a = 1 WHERE id = 1")
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Timeout { timeout_ms: 50 }));
    assert!(err.is_transient());
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_run_dispatches_on_operation() {
    let runner = RecordingRunner {
        rows_affected: 2,
        ..Default::default()
    };
    let console = console(runner);

    let response = console
        .run(&ExecuteSqlRequest {
            data_source: "LOCALHOST".to_string(),
            sql: "SELECT TOP 1 id FROM t".to_string(),
            operation: OperationKind::Select,
        })
        .await
        .unwrap();
    assert!(matches!(response, ExecutionResponse::Rows(ref r) if r.row_count() == 1));

    let response = console
        .run(&ExecuteSqlRequest {
            data_source: "LOCALHOST".to_string(),
            sql: "INSERT INTO t (a) VALUES (1), (2)".to_string(),
            operation: OperationKind::Insert,
        })
        .await
        .unwrap();
    assert_eq!(response, ExecutionResponse::affected(OperationKind::Insert, 2));
    match response {
        ExecutionResponse::Affected { message, .. } => assert_eq!(message, "insert succeeded"),
        other => panic!("unexpected response: {other:?}"),
    }
}

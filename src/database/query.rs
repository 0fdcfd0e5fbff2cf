//! Result collection for executed statements.

use crate::database::types::SqlValue;
use crate::error::ConsoleError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tiberius::{QueryItem, QueryStream};

/// A single row of query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Column values keyed by column label.
    #[serde(flatten)]
    pub columns: HashMap<String, SqlValue>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value by column label.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Insert a value, replacing any earlier value under the same label.
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Rows returned by a SELECT.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column labels in result order.
    pub columns: Vec<String>,

    /// Result rows, in the order the server returned them.
    pub rows: Vec<ResultRow>,

    /// Execution time in milliseconds.
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Drain a query stream into a [`QueryResult`].
///
/// Rows of every result set are appended in order. When a result set
/// repeats a column label, the right-most value wins.
pub(crate) async fn collect_rows(
    mut stream: QueryStream<'_>,
    start: Instant,
) -> Result<QueryResult, ConsoleError> {
    use futures_util::stream::TryStreamExt;

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<ResultRow> = Vec::new();

    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => {
                columns = meta.columns().iter().map(|c| c.name().to_string()).collect();
            }
            QueryItem::Row(row) => {
                let mut result_row = ResultRow::new();
                for (label, data) in columns.iter().zip(row) {
                    result_row.insert(label.as_str(), SqlValue::from_column_data(data)?);
                }
                rows.push(result_row);
            }
        }
    }

    Ok(QueryResult {
        columns,
        rows,
        execution_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Truncate a statement for logging, respecting char boundaries.
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

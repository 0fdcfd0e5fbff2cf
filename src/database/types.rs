//! SQL Server value mapping to JSON-friendly Rust types.

use crate::error::ConsoleError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tiberius::{ColumnData, FromSql};
use uuid::Uuid;

/// A single column value of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeUtc(DateTime<Utc>),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert a raw TDS value, taking ownership of its buffers.
    pub fn from_column_data(data: ColumnData<'static>) -> Result<Self, ConsoleError> {
        let value = match data {
            ColumnData::U8(v) => v.map(SqlValue::U8),
            ColumnData::I16(v) => v.map(SqlValue::I16),
            ColumnData::I32(v) => v.map(SqlValue::I32),
            ColumnData::I64(v) => v.map(SqlValue::I64),
            ColumnData::F32(v) => v.map(SqlValue::F32),
            ColumnData::F64(v) => v.map(SqlValue::F64),
            ColumnData::Bit(v) => v.map(SqlValue::Bool),
            ColumnData::String(v) => v.map(|s| SqlValue::String(s.into_owned())),
            ColumnData::Guid(v) => v.map(SqlValue::Uuid),
            ColumnData::Binary(v) => v.map(|b| SqlValue::Bytes(b.into_owned())),
            ColumnData::Xml(v) => v.map(|x| SqlValue::String(x.into_owned().into_string())),
            ref numeric @ ColumnData::Numeric(_) => {
                Decimal::from_sql(numeric)?.map(SqlValue::Decimal)
            }
            ref date @ ColumnData::Date(_) => NaiveDate::from_sql(date)?.map(SqlValue::Date),
            ref time @ ColumnData::Time(_) => NaiveTime::from_sql(time)?.map(SqlValue::Time),
            ref offset @ ColumnData::DateTimeOffset(_) => {
                DateTime::<Utc>::from_sql(offset)?.map(SqlValue::DateTimeUtc)
            }
            ref datetime @ (ColumnData::DateTime(_)
            | ColumnData::SmallDateTime(_)
            | ColumnData::DateTime2(_)) => {
                NaiveDateTime::from_sql(datetime)?.map(SqlValue::DateTime)
            }
        };

        Ok(value.unwrap_or(SqlValue::Null))
    }
}

//! PostgreSQL executor over a sqlx pool.
//!
//! Statements go through the simple-query protocol, so every value arrives
//! in text form; well-known types are decoded into native JSON values and
//! anything else keeps its text rendering.

use super::{returns_rows, ExecutionError, ExecutionOutcome, SqlExecutor};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Decode, Executor, Postgres, Row, Type, TypeInfo, ValueRef};
use tracing::debug;
use uuid::Uuid;

pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Column names of a statement that returned no rows
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result columns: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    async fn execute(&self, sql: &str) -> std::result::Result<ExecutionOutcome, ExecutionError> {
        if returns_rows(sql) {
            let rows = sqlx::raw_sql(sql).fetch_all(&self.pool).await?;
            let columns = match rows.first() {
                Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
                None => self.describe_columns(sql).await,
            };
            let data = rows.iter().map(row_to_json).collect();
            Ok(ExecutionOutcome::rows(columns, data))
        } else {
            let result = sqlx::raw_sql(sql).execute(&self.pool).await?;
            Ok(ExecutionOutcome::affected(result.rows_affected()))
        }
    }

    async fn ping(&self) -> std::result::Result<(), ExecutionError> {
        let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        if one == 1 {
            Ok(())
        } else {
            Err(ExecutionError::new(
                "Connection test returned an unexpected result",
                "OperationalError",
            ))
        }
    }
}

impl From<sqlx::Error> for ExecutionError {
    fn from(err: sqlx::Error) -> Self {
        let message = match &err {
            sqlx::Error::Database(db) => db.message().to_string(),
            other => other.to_string(),
        };
        ExecutionError::new(message, error_type(&err))
    }
}

/// Error category in the DB-API style callers already know
fn error_type(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(code) if code.starts_with("42") => "ProgrammingError",
            Some(code) if code.starts_with("23") => "IntegrityError",
            Some(code) if code.starts_with("22") => "DataError",
            Some(code) if code.starts_with("08") || code.starts_with("57") => "OperationalError",
            _ => "DatabaseError",
        },
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => "OperationalError",
        _ => "DatabaseError",
    }
}

fn row_to_json(row: &PgRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), value_at(row, column.ordinal())))
        .collect()
}

fn value_at(row: &PgRow, idx: usize) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    let type_name = row.column(idx).type_info().name().to_string();
    let decoded = match type_name.as_str() {
        "BOOL" => decode::<bool>(row, idx).map(Value::Bool),
        "INT2" => decode::<i16>(row, idx).map(Value::from),
        "INT4" => decode::<i32>(row, idx).map(Value::from),
        "INT8" => decode::<i64>(row, idx).map(Value::from),
        "FLOAT4" => decode::<f32>(row, idx).map(|v| Value::from(f64::from(v))),
        "FLOAT8" => decode::<f64>(row, idx).map(Value::from),
        "JSON" | "JSONB" => decode::<Value>(row, idx),
        "TIMESTAMPTZ" => decode::<DateTime<Utc>>(row, idx).map(|v| Value::from(v.to_rfc3339())),
        "TIMESTAMP" => decode::<NaiveDateTime>(row, idx).map(|v| Value::from(v.to_string())),
        "DATE" => decode::<NaiveDate>(row, idx).map(|v| Value::from(v.to_string())),
        "TIME" => decode::<NaiveTime>(row, idx).map(|v| Value::from(v.to_string())),
        "UUID" => decode::<Uuid>(row, idx).map(|v| Value::from(v.to_string())),
        _ => None,
    };

    // NaN floats become null through Value::from, keep their text instead
    match decoded {
        Some(Value::Null) | None => text_value(row, idx),
        Some(value) => value,
    }
}

fn decode<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<T, _>(idx).ok()
}

fn text_value(row: &PgRow, idx: usize) -> Value {
    row.try_get_unchecked::<String, _>(idx)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

//! Execution
//!
//! The database collaborator seam and the confirmation gate in front of it.

pub mod gate;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use gate::{ExecutionGate, GateOutcome};
pub use postgres::PgExecutor;

/// Statement prefixes whose results are fetched as rows
const ROW_RETURNING_PREFIXES: &[&str] = &["SELECT", "WITH", "SHOW"];

/// What a successfully executed statement produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionOutcome {
    Rows {
        columns: Vec<String>,
        data: Vec<Map<String, Value>>,
        row_count: usize,
    },
    Affected {
        affected_rows: u64,
        message: String,
    },
}

impl ExecutionOutcome {
    pub fn rows(columns: Vec<String>, data: Vec<Map<String, Value>>) -> Self {
        let row_count = data.len();
        ExecutionOutcome::Rows {
            columns,
            data,
            row_count,
        }
    }

    pub fn affected(affected_rows: u64) -> Self {
        ExecutionOutcome::Affected {
            affected_rows,
            message: format!(
                "Query executed successfully. {} rows affected.",
                affected_rows
            ),
        }
    }
}

/// Failure reported by the database, passed to the caller unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ExecutionError {
    pub fn new(error: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            error_type: Some(error_type.into()),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_type {
            Some(kind) => write!(f, "{}: {}", kind, self.error),
            None => f.write_str(&self.error),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Runs one SQL statement against a database
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> std::result::Result<ExecutionOutcome, ExecutionError>;

    /// Round-trip check that the database is reachable
    async fn ping(&self) -> std::result::Result<(), ExecutionError>;
}

/// True when the statement is fetched as a row set rather than a row count
pub fn returns_rows(sql: &str) -> bool {
    let upper = sql.trim_start().to_uppercase();
    ROW_RETURNING_PREFIXES
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

//! Execution Gate
//!
//! Refuses to run anything without explicit confirmation and hands the
//! safety verdict back next to whatever the database returned.

use super::{ExecutionError, ExecutionOutcome, SqlExecutor};
use crate::error::{AdminError, Result};
use crate::safety::{classify_safety, SafetyVerdict};
use tracing::{error, info};

/// Result of one gated execution
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub verdict: SafetyVerdict,
    pub result: std::result::Result<ExecutionOutcome, ExecutionError>,
}

impl GateOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct ExecutionGate<E> {
    executor: E,
}

impl<E: SqlExecutor> ExecutionGate<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run a confirmed statement.
    ///
    /// Database failures come back inside `GateOutcome::result`; only a
    /// missing confirmation or an empty statement is an `Err`.
    pub async fn execute(&self, sql: &str, confirmed: bool) -> Result<GateOutcome> {
        if !confirmed {
            return Err(AdminError::ConfirmationRequired);
        }
        if sql.trim().is_empty() {
            return Err(AdminError::InvalidRequest("SQL statement is empty".to_string()));
        }

        let verdict = classify_safety(sql);
        info!(
            "Executing {} SQL: {}",
            verdict.tier,
            sql.chars().take(100).collect::<String>()
        );

        let result = self.executor.execute(sql).await;
        match &result {
            Ok(ExecutionOutcome::Rows { row_count, .. }) => {
                info!("✅ Query returned {} rows", row_count)
            }
            Ok(ExecutionOutcome::Affected { affected_rows, .. }) => {
                info!("✅ Query affected {} rows", affected_rows)
            }
            Err(e) => error!("Execution failed: {}", e),
        }

        Ok(GateOutcome { verdict, result })
    }
}

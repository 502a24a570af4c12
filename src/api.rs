//! Request and response bodies shared by the server and the CLI.

use crate::execution::ExecutionOutcome;
use crate::execution_loop::LoopOutcome;
use crate::intent::IntentKind;
use crate::safety::SafetyTier;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const GENERATION_FAILED: &str = "Could not generate SQL query. Please rephrase your request.";
pub const RETRIES_EXHAUSTED: &str = "Max retry attempts reached. Please review the query manually.";

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub db_name: String,
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_level: Option<SafetyTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_type: Option<IntentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub db_name: String,
    pub sql: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_level: Option<SafetyTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// Statement actually run when a repair replaced the submitted one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u8>,
}

impl ExecuteResponse {
    /// Build the response for `submitted_sql` from a finished retry loop
    pub fn from_loop(submitted_sql: &str, run: LoopOutcome) -> Self {
        let verdict = run.outcome.verdict;
        let mut response = match run.outcome.result {
            Ok(ExecutionOutcome::Rows {
                columns,
                data,
                row_count,
            }) => Self {
                success: true,
                data: Some(data),
                columns: Some(columns),
                row_count: Some(row_count),
                ..Default::default()
            },
            Ok(ExecutionOutcome::Affected {
                affected_rows,
                message,
            }) => Self {
                success: true,
                affected_rows: Some(affected_rows),
                message: Some(message),
                ..Default::default()
            },
            Err(e) => Self {
                success: false,
                error: Some(e.error),
                error_type: e.error_type,
                message: run.exhausted.then(|| RETRIES_EXHAUSTED.to_string()),
                ..Default::default()
            },
        };

        response.safety_level = Some(verdict.tier);
        response.recommendation = Some(verdict.recommendation);
        if run.sql != submitted_sql {
            response.retry_sql = Some(run.sql);
        }
        if run.attempts > 1 {
            response.attempts = Some(run.attempts);
        }
        response
    }

    pub fn failure(error: impl Into<String>, error_type: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_type,
            ..Default::default()
        }
    }
}

use async_trait::async_trait;
use nlsql_admin::api::{ExecuteResponse, RETRIES_EXHAUSTED};
use nlsql_admin::execution::{ExecutionError, ExecutionGate, ExecutionOutcome, SqlExecutor};
use nlsql_admin::execution_loop::{ExecutionLoop, SqlRepair};
use nlsql_admin::{AdminError, SafetyTier};
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

type ExecResult = Result<ExecutionOutcome, ExecutionError>;

/// Replays queued results and records every statement it receives
struct ScriptedExecutor {
    script: Mutex<VecDeque<ExecResult>>,
    fallback: ExecResult,
    seen: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(script: Vec<ExecResult>, fallback: ExecResult) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn always(result: ExecResult) -> Self {
        Self::new(Vec::new(), result)
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str) -> ExecResult {
        self.seen.lock().unwrap().push(sql.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn ping(&self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

/// Always proposes the same replacement statement
struct FixedRepair {
    sql: &'static str,
    calls: AtomicUsize,
}

impl FixedRepair {
    fn new(sql: &'static str) -> Self {
        Self {
            sql,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SqlRepair for FixedRepair {
    async fn repair(&self, _sql: &str, _error: &ExecutionError) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(self.sql.to_string())
    }
}

fn undefined_table() -> ExecResult {
    Err(ExecutionError::new(
        "relation \"custmers\" does not exist",
        "ProgrammingError",
    ))
}

fn one_row() -> ExecResult {
    let mut row = Map::new();
    row.insert("count".to_string(), Value::from(42));
    Ok(ExecutionOutcome::rows(vec!["count".to_string()], vec![row]))
}

#[tokio::test]
async fn test_unconfirmed_never_reaches_executor() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(one_row()));
    let exec_loop = ExecutionLoop::new(3, true);

    let err = exec_loop
        .execute_with_retry(&gate, "SELECT count(*) FROM customers", false, None)
        .await
        .unwrap_err();

    assert!(matches!(err, AdminError::ConfirmationRequired));
    assert!(gate.executor().seen().is_empty());
}

#[tokio::test]
async fn test_success_passes_verdict_through() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(one_row()));
    let run = ExecutionLoop::new(3, true)
        .execute_with_retry(&gate, "SELECT count(*) FROM customers", true, None)
        .await
        .unwrap();

    assert_eq!(run.attempts, 1);
    assert_eq!(run.outcome.verdict.tier, SafetyTier::Safe);

    let response = ExecuteResponse::from_loop("SELECT count(*) FROM customers", run);
    assert!(response.success);
    assert_eq!(response.row_count, Some(1));
    assert_eq!(response.columns, Some(vec!["count".to_string()]));
    assert_eq!(response.safety_level, Some(SafetyTier::Safe));
    assert!(response.retry_sql.is_none());
}

#[tokio::test]
async fn test_error_passes_through_without_repair() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(undefined_table()));
    let run = ExecutionLoop::new(3, true)
        .execute_with_retry(&gate, "SELECT * FROM custmers", true, None)
        .await
        .unwrap();

    assert_eq!(run.attempts, 1);
    let response = ExecuteResponse::from_loop("SELECT * FROM custmers", run);
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("relation \"custmers\" does not exist"));
    assert_eq!(response.error_type.as_deref(), Some("ProgrammingError"));
}

#[tokio::test]
async fn test_repair_retries_and_reports_final_sql() {
    let executor = ScriptedExecutor::new(vec![undefined_table()], one_row());
    let gate = ExecutionGate::new(executor);
    let repair = FixedRepair::new("SELECT * FROM customers");

    let run = ExecutionLoop::new(3, true)
        .execute_with_retry(&gate, "SELECT * FROM custmers", true, Some(&repair as &dyn SqlRepair))
        .await
        .unwrap();

    assert_eq!(run.attempts, 2);
    assert_eq!(
        gate.executor().seen(),
        vec!["SELECT * FROM custmers", "SELECT * FROM customers"]
    );

    let response = ExecuteResponse::from_loop("SELECT * FROM custmers", run);
    assert!(response.success);
    assert_eq!(response.retry_sql.as_deref(), Some("SELECT * FROM customers"));
    assert_eq!(response.attempts, Some(2));
}

#[tokio::test]
async fn test_stops_at_max_attempts() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(undefined_table()));
    let repair = FixedRepair::new("SELECT * FROM custmer");

    let run = ExecutionLoop::new(3, false)
        .execute_with_retry(&gate, "SELECT * FROM custmers", true, Some(&repair as &dyn SqlRepair))
        .await
        .unwrap();

    assert_eq!(run.attempts, 3);
    assert_eq!(gate.executor().seen().len(), 3);
    assert_eq!(repair.calls.load(Ordering::SeqCst), 2);
    assert!(!run.outcome.is_success());
    assert!(run.exhausted);

    let response = ExecuteResponse::from_loop("SELECT * FROM custmers", run);
    assert!(!response.success);
    assert_eq!(response.message.as_deref(), Some(RETRIES_EXHAUSTED));
    assert_eq!(response.attempts, Some(3));
}

#[tokio::test]
async fn test_early_stop_is_not_exhaustion() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(undefined_table()));
    let run = ExecutionLoop::new(3, true)
        .execute_with_retry(&gate, "SELECT * FROM custmers", true, None)
        .await
        .unwrap();

    assert!(!run.exhausted);
    let response = ExecuteResponse::from_loop("SELECT * FROM custmers", run);
    assert!(response.message.is_none());
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let empty = ExecutionOutcome::rows(
        vec!["pid".to_string(), "usename".to_string(), "query".to_string()],
        Vec::new(),
    );
    let gate = ExecutionGate::new(ScriptedExecutor::always(Ok(empty)));
    let sql = "SELECT pid, usename, query FROM pg_stat_activity WHERE state = 'active';";
    let run = ExecutionLoop::new(1, true)
        .execute_with_retry(&gate, sql, true, None)
        .await
        .unwrap();

    let response = ExecuteResponse::from_loop(sql, run);
    assert!(response.success);
    assert_eq!(response.row_count, Some(0));
    assert_eq!(response.data, Some(Vec::new()));
    assert_eq!(
        response.columns,
        Some(vec!["pid".to_string(), "usename".to_string(), "query".to_string()])
    );

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["columns"][0], "pid");
    assert_eq!(json["row_count"], 0);
}

#[tokio::test]
async fn test_aborts_on_repeated_error_class() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(undefined_table()));
    let repair = FixedRepair::new("SELECT * FROM custmer");

    let run = ExecutionLoop::new(5, true)
        .execute_with_retry(&gate, "SELECT * FROM custmers", true, Some(&repair as &dyn SqlRepair))
        .await
        .unwrap();

    assert_eq!(run.attempts, 2);
    assert_eq!(gate.executor().seen().len(), 2);
}

#[tokio::test]
async fn test_connection_failure_is_not_retried() {
    let failure = Err(ExecutionError::new(
        "pool timed out while waiting for an open connection",
        "OperationalError",
    ));
    let gate = ExecutionGate::new(ScriptedExecutor::always(failure));
    let repair = FixedRepair::new("SELECT 1");

    let run = ExecutionLoop::new(3, true)
        .execute_with_retry(&gate, "SELECT 1", true, Some(&repair as &dyn SqlRepair))
        .await
        .unwrap();

    assert_eq!(run.attempts, 1);
    assert_eq!(repair.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_repair_cannot_escalate_safety() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(undefined_table()));
    let repair = FixedRepair::new("DELETE FROM customers");

    let err = ExecutionLoop::new(3, true)
        .execute_with_retry(&gate, "SELECT * FROM custmers", true, Some(&repair as &dyn SqlRepair))
        .await
        .unwrap_err();

    match err {
        AdminError::SafetyEscalation { from, to } => {
            assert_eq!(from, "safe");
            assert_eq!(to, "modify");
        }
        other => panic!("expected escalation, got {:?}", other),
    }
    assert_eq!(gate.executor().seen(), vec!["SELECT * FROM custmers"]);
}

#[tokio::test]
async fn test_write_reports_affected_rows() {
    let gate = ExecutionGate::new(ScriptedExecutor::always(Ok(ExecutionOutcome::affected(4))));
    let run = ExecutionLoop::new(1, true)
        .execute_with_retry(&gate, "UPDATE film SET rental_rate = 0.99", true, None)
        .await
        .unwrap();

    let response = ExecuteResponse::from_loop("UPDATE film SET rental_rate = 0.99", run);
    assert_eq!(response.affected_rows, Some(4));
    assert_eq!(
        response.message.as_deref(),
        Some("Query executed successfully. 4 rows affected.")
    );
    assert_eq!(response.safety_level, Some(SafetyTier::Modify));
    assert!(response.data.is_none());
}

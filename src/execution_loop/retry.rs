//! Execution Loop
//!
//! Bounded retry loop around the execution gate with optional SQL repair.

use crate::error::{AdminError, Result};
use crate::execution::{ExecutionError, ExecutionGate, GateOutcome, SqlExecutor};
use crate::execution_loop::error_classifier::{ErrorClassifier, SqlErrorClass};
use crate::safety::classify_safety;
use async_trait::async_trait;
use tracing::{info, warn};

/// Proposes a corrected statement after a failed execution
#[async_trait]
pub trait SqlRepair: Send + Sync {
    async fn repair(&self, sql: &str, error: &ExecutionError) -> Option<String>;
}

/// Execution result
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub outcome: GateOutcome,
    /// Statement that produced `outcome`
    pub sql: String,
    pub attempts: u8,
    /// Failed on the last allowed attempt
    pub exhausted: bool,
}

/// Execution loop with bounded retries
pub struct ExecutionLoop {
    max_attempts: u8,
    abort_on_repeat_error: bool,
    error_classifier: ErrorClassifier,
}

impl ExecutionLoop {
    pub fn new(max_attempts: u8, abort_on_repeat_error: bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            abort_on_repeat_error,
            error_classifier: ErrorClassifier::new(),
        }
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Execute with retry logic.
    ///
    /// The confirmation given for `sql` covers repaired statements only up
    /// to its own safety tier.
    pub async fn execute_with_retry<E: SqlExecutor>(
        &self,
        gate: &ExecutionGate<E>,
        sql: &str,
        confirmed: bool,
        repair: Option<&dyn SqlRepair>,
    ) -> Result<LoopOutcome> {
        let confirmed_tier = classify_safety(sql).tier;
        let mut current = sql.to_string();
        let mut previous_error: Option<SqlErrorClass> = None;
        let mut attempt: u8 = 0;

        loop {
            attempt += 1;
            info!("Execution attempt {} of {}", attempt, self.max_attempts);

            let outcome = gate.execute(&current, confirmed).await?;
            let Some(error) = outcome.result.as_ref().err().cloned() else {
                info!("✅ Execution succeeded on attempt {}", attempt);
                return Ok(LoopOutcome {
                    outcome,
                    sql: current,
                    attempts: attempt,
                    exhausted: false,
                });
            };

            let exhausted = attempt >= self.max_attempts;
            let error_class = self.error_classifier.classify(&error);
            let finished = exhausted
                || !error_class.is_repairable()
                || self.should_abort(&error_class, &previous_error);

            let repaired = match (finished, repair) {
                (false, Some(repair)) => repair.repair(&current, &error).await,
                _ => None,
            };

            let Some(repaired) = repaired else {
                if exhausted {
                    warn!("Max retry attempts reached after {} attempts", attempt);
                }
                return Ok(LoopOutcome {
                    outcome,
                    sql: current,
                    attempts: attempt,
                    exhausted,
                });
            };

            let repaired_tier = classify_safety(&repaired).tier;
            if repaired_tier.severity() > confirmed_tier.severity() {
                warn!(
                    "Refusing repaired SQL: {} exceeds confirmed {}",
                    repaired_tier, confirmed_tier
                );
                return Err(AdminError::SafetyEscalation {
                    from: confirmed_tier.to_string(),
                    to: repaired_tier.to_string(),
                });
            }

            info!("Retrying after {}", error_class);
            previous_error = Some(error_class);
            current = repaired;
        }
    }

    /// Determine if we should abort based on error patterns
    fn should_abort(
        &self,
        current_error: &SqlErrorClass,
        previous_error: &Option<SqlErrorClass>,
    ) -> bool {
        if !self.abort_on_repeat_error {
            return false;
        }

        if let Some(ref prev) = previous_error {
            if prev == current_error {
                warn!("Same error repeated, aborting: {:?}", current_error);
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_abort_on_repeat() {
        let exec_loop = ExecutionLoop::new(3, true);
        let prev = Some(SqlErrorClass::UndefinedTable);
        assert!(exec_loop.should_abort(&SqlErrorClass::UndefinedTable, &prev));
        assert!(!exec_loop.should_abort(&SqlErrorClass::SyntaxError, &prev));
        assert!(!exec_loop.should_abort(&SqlErrorClass::UndefinedTable, &None));
    }

    #[test]
    fn test_repeat_allowed_when_disabled() {
        let exec_loop = ExecutionLoop::new(3, false);
        let prev = Some(SqlErrorClass::SyntaxError);
        assert!(!exec_loop.should_abort(&SqlErrorClass::SyntaxError, &prev));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(ExecutionLoop::new(0, true).max_attempts(), 1);
    }
}

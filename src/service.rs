//! Admin Service
//!
//! Owns the settings, one connection pool per database and the schema cache,
//! and exposes the operations the server and CLI call.

use crate::api::{ExecuteResponse, GenerateResponse};
use crate::config::{ConnectionInfo, Settings};
use crate::db::init_pool;
use crate::engine;
use crate::error::{AdminError, Result};
use crate::execution::{ExecutionGate, PgExecutor, SqlExecutor};
use crate::execution_loop::{ExecutionLoop, SqlRepair};
use crate::schema::{SchemaCache, SchemaExtractor, SchemaReport, SchemaSummary};
use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a connection test
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: String,
    pub connection: ConnectionInfo,
}

pub struct AdminService {
    settings: Settings,
    schemas: SchemaCache,
    pools: DashMap<String, PgPool>,
    repair: Option<Arc<dyn SqlRepair>>,
}

impl AdminService {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            schemas: SchemaCache::new(),
            pools: DashMap::new(),
            repair: None,
        }
    }

    /// Install a repair strategy used by `execute` between attempts
    pub fn with_repair(mut self, repair: Arc<dyn SqlRepair>) -> Self {
        self.repair = Some(repair);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Pool for `db_name`, created on first use
    pub async fn pool(&self, db_name: &str) -> Result<PgPool> {
        if let Some(pool) = self.pools.get(db_name) {
            return Ok(pool.value().clone());
        }

        let pool = init_pool(&self.settings, db_name).await?;
        let pool = self
            .pools
            .entry(db_name.to_string())
            .or_insert(pool)
            .value()
            .clone();
        Ok(pool)
    }

    /// Cached schema summary, extracted on a miss
    pub async fn schema(&self, db_name: &str) -> Result<Arc<SchemaSummary>> {
        if let Some(summary) = self.schemas.get(db_name) {
            return Ok(summary);
        }
        self.refresh_schema(db_name).await
    }

    /// Drop any cached summary and extract it again
    pub async fn refresh_schema(&self, db_name: &str) -> Result<Arc<SchemaSummary>> {
        self.schemas.invalidate(db_name);
        let pool = self.pool(db_name).await?;
        let summary = SchemaExtractor::new(pool, db_name).extract().await?;
        Ok(self.schemas.insert(db_name, summary))
    }

    /// Extract the detailed report and refresh the cached summary from it
    pub async fn describe_schema(&self, db_name: &str) -> Result<SchemaReport> {
        let pool = self.pool(db_name).await?;
        let report = SchemaExtractor::new(pool, db_name).extract_detailed().await?;
        self.schemas.insert(db_name, report.summary());
        Ok(report)
    }

    pub fn invalidate_schema(&self, db_name: &str) -> bool {
        self.schemas.invalidate(db_name)
    }

    /// Generate SQL for a request against `db_name`.
    ///
    /// A schema that cannot be loaded degrades to an empty summary.
    pub async fn generate(&self, db_name: &str, query: &str) -> GenerateResponse {
        let schema = match self.schema(db_name).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!("Schema unavailable for {}: {}", db_name, e);
                Arc::new(SchemaSummary::new(db_name, Vec::new()))
            }
        };
        engine::generate(query, &schema)
    }

    /// Execute confirmed SQL with bounded retries
    pub async fn execute(&self, db_name: &str, sql: &str, confirm: bool) -> Result<ExecuteResponse> {
        if !confirm {
            return Err(AdminError::ConfirmationRequired);
        }
        if sql.trim().is_empty() {
            return Err(AdminError::InvalidRequest("SQL statement is empty".to_string()));
        }

        let pool = match self.pool(db_name).await {
            Ok(pool) => pool,
            Err(e) => {
                return Ok(ExecuteResponse::failure(
                    e.to_string(),
                    Some("OperationalError".to_string()),
                ))
            }
        };

        let gate = ExecutionGate::new(PgExecutor::new(pool));
        let run = self
            .execution_loop()
            .execute_with_retry(&gate, sql, confirm, self.repair.as_deref())
            .await?;
        Ok(ExecuteResponse::from_loop(sql, run))
    }

    /// One first attempt plus `max_retry_attempts` retries
    fn execution_loop(&self) -> ExecutionLoop {
        ExecutionLoop::new(self.settings.max_retry_attempts.saturating_add(1), true)
    }

    pub async fn test_connection(&self, db_name: &str) -> ConnectionCheck {
        let connection = self.settings.connection_info(db_name);
        let result = match self.pool(db_name).await {
            Ok(pool) => PgExecutor::new(pool)
                .ping()
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(()) => ConnectionCheck {
                success: true,
                message: format!("Successfully connected to {}", db_name),
                connection,
            },
            Err(e) => {
                warn!("Connection test failed for {}: {}", db_name, e);
                ConnectionCheck {
                    success: false,
                    message: e,
                    connection,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_setting_counts_retries_after_first_attempt() {
        let settings = Settings {
            max_retry_attempts: 3,
            ..Settings::default()
        };
        let service = AdminService::new(settings);
        assert_eq!(service.execution_loop().max_attempts(), 4);
    }

    #[tokio::test]
    async fn test_unconfirmed_execute_needs_no_connection() {
        let service = AdminService::new(Settings::default());
        let err = service
            .execute("postgres", "SELECT 1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::ConfirmationRequired));
    }

    #[tokio::test]
    async fn test_empty_sql_is_a_client_error() {
        let service = AdminService::new(Settings::default());
        let err = service.execute("postgres", " \n ", true).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidRequest(_)));
        assert_eq!(err.status_code(), 400);
    }
}

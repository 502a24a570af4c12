//! SQL Synthesizer
//!
//! Turns a classified intent into SQL. Administrative intents map to fixed
//! PostgreSQL catalog templates; open-ended data queries get a best-effort
//! `SELECT` against the first schema table the request mentions.

use crate::intent::names::{extract_table_name, is_plain_identifier};
use crate::intent::{Intent, IntentKind};
use crate::schema::SchemaSummary;
use tracing::{debug, warn};

/// Example requests offered whenever no SQL can be produced
pub const SUGGESTIONS: [&str; 8] = [
    "Show all tables",
    "Show table sizes",
    "List all indexes",
    "Describe table actor",
    "Show database size",
    "Show active connections",
    "Show row counts",
    "Show foreign keys",
];

/// Row cap appended to generic SELECTs
pub const DEFAULT_ROW_LIMIT: usize = 100;

const LIST_TABLES_SQL: &str = "SELECT
    schemaname,
    tablename,
    tableowner
FROM pg_tables
WHERE schemaname = 'public'
ORDER BY tablename;";

const LIST_INDEXES_SQL: &str = "SELECT
    schemaname,
    tablename,
    indexname,
    indexdef
FROM pg_indexes
WHERE schemaname = 'public'
ORDER BY tablename, indexname;";

const FOREIGN_KEYS_SQL: &str = "SELECT
    tc.table_name AS from_table,
    kcu.column_name AS from_column,
    ccu.table_name AS to_table,
    ccu.column_name AS to_column,
    tc.constraint_name
FROM information_schema.table_constraints AS tc
JOIN information_schema.key_column_usage AS kcu
    ON tc.constraint_name = kcu.constraint_name
    AND tc.table_schema = kcu.table_schema
JOIN information_schema.constraint_column_usage AS ccu
    ON ccu.constraint_name = tc.constraint_name
    AND ccu.table_schema = tc.table_schema
WHERE tc.constraint_type = 'FOREIGN KEY'
AND tc.table_schema = 'public'
ORDER BY tc.table_name, tc.constraint_name;";

const TABLE_SIZES_SQL: &str = "SELECT
    schemaname,
    tablename,
    pg_size_pretty(pg_total_relation_size(schemaname||'.'||tablename)) AS total_size,
    pg_size_pretty(pg_relation_size(schemaname||'.'||tablename)) AS table_size,
    pg_size_pretty(pg_total_relation_size(schemaname||'.'||tablename) - pg_relation_size(schemaname||'.'||tablename)) AS indexes_size,
    pg_total_relation_size(schemaname||'.'||tablename) AS bytes
FROM pg_tables
WHERE schemaname = 'public'
ORDER BY pg_total_relation_size(schemaname||'.'||tablename) DESC;";

const DATABASE_SIZE_SQL: &str = "SELECT
    current_database() AS database_name,
    pg_size_pretty(pg_database_size(current_database())) AS size;";

const ROW_COUNTS_SQL: &str = "SELECT
    schemaname,
    relname AS table_name,
    n_live_tup AS row_count,
    n_dead_tup AS dead_rows
FROM pg_stat_user_tables
WHERE schemaname = 'public'
ORDER BY n_live_tup DESC;";

const CONNECTIONS_SQL: &str = "SELECT
    datname AS database,
    usename AS user,
    application_name,
    client_addr,
    state,
    COUNT(*) AS connection_count
FROM pg_stat_activity
WHERE datname = current_database()
GROUP BY datname, usename, application_name, client_addr, state
ORDER BY connection_count DESC;";

const ACTIVE_QUERIES_SQL: &str = "SELECT
    pid,
    usename AS user,
    datname AS database,
    state,
    query_start,
    LEFT(query, 100) AS query_preview
FROM pg_stat_activity
WHERE state = 'active'
AND query NOT LIKE '%pg_stat_activity%'
ORDER BY query_start;";

const STATISTICS_SQL: &str = "SELECT
    schemaname,
    relname AS table_name,
    seq_scan AS sequential_scans,
    seq_tup_read AS rows_read_seq,
    idx_scan AS index_scans,
    idx_tup_fetch AS rows_fetched_idx,
    n_tup_ins AS rows_ins,
    n_tup_upd AS rows_upd,
    n_tup_del AS rows_del
FROM pg_stat_user_tables
WHERE schemaname = 'public'
ORDER BY relname;";

/// Outcome of synthesis: SQL, or suggestions for the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Sql(String),
    Unavailable { suggestions: Vec<String> },
}

impl Synthesis {
    pub fn unavailable() -> Self {
        Synthesis::Unavailable {
            suggestions: SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            Synthesis::Sql(sql) => Some(sql),
            Synthesis::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Synthesis::Sql(_))
    }
}

/// Fixed template for intents that need no parameter
pub fn template_for(kind: IntentKind) -> Option<&'static str> {
    match kind {
        IntentKind::ListTables => Some(LIST_TABLES_SQL),
        IntentKind::ListIndexes => Some(LIST_INDEXES_SQL),
        IntentKind::ForeignKeys => Some(FOREIGN_KEYS_SQL),
        IntentKind::TableSizes => Some(TABLE_SIZES_SQL),
        IntentKind::DatabaseSize => Some(DATABASE_SIZE_SQL),
        IntentKind::RowCounts => Some(ROW_COUNTS_SQL),
        IntentKind::Connections => Some(CONNECTIONS_SQL),
        IntentKind::ActiveQueries => Some(ACTIVE_QUERIES_SQL),
        IntentKind::Statistics => Some(STATISTICS_SQL),
        IntentKind::DescribeTable
        | IntentKind::DataQuery
        | IntentKind::Modification
        | IntentKind::Unknown => None,
    }
}

/// Column metadata query for one table.
///
/// Plain identifiers are substituted verbatim. Anything else has its single
/// quotes doubled so it stays inside the string literal.
pub fn describe_table_sql(table: &str) -> String {
    let literal = if is_plain_identifier(table) {
        table.to_string()
    } else {
        warn!("Quoting non-identifier table name: {}", table);
        table.replace('\'', "''")
    };

    format!(
        "SELECT
    column_name,
    data_type,
    character_maximum_length,
    is_nullable,
    column_default
FROM information_schema.columns
WHERE table_schema = 'public'
AND table_name = '{}'
ORDER BY ordinal_position;",
        literal
    )
}

/// Table a data query refers to: first schema table named in the request
pub fn resolve_data_table<'a>(query: &str, schema: &'a SchemaSummary) -> Option<&'a str> {
    schema.find_table_mentioned_in(query)
}

/// Generic `SELECT *` over the first schema table the request mentions
pub fn select_for_data_query(query: &str, schema: &SchemaSummary) -> Option<String> {
    let text = query.to_lowercase();
    let table = resolve_data_table(&text, schema)?;

    let mut sql = format!("SELECT * FROM {}", table);

    if ["where", "with", "having"].iter().any(|kw| text.contains(kw)) {
        sql.push_str("\n-- Add WHERE clause as needed");
    }

    if !text.contains("limit") && !text.contains("all") {
        sql.push_str(&format!("\nLIMIT {}", DEFAULT_ROW_LIMIT));
    }

    sql.push(';');
    Some(sql)
}

/// Produce SQL for a classified request.
pub fn synthesize(query: &str, intent: &Intent, schema: &SchemaSummary) -> Synthesis {
    let sql = match intent.kind {
        IntentKind::DescribeTable => intent
            .table
            .clone()
            .or_else(|| extract_table_name(&query.to_lowercase()))
            .map(|table| describe_table_sql(&table)),
        IntentKind::DataQuery => select_for_data_query(query, schema),
        kind => template_for(kind).map(str::to_string),
    };

    match sql {
        Some(sql) => {
            debug!("Synthesized SQL for {}", intent.kind);
            Synthesis::Sql(sql)
        }
        None => {
            debug!("No SQL for {}", intent.kind);
            Synthesis::unavailable()
        }
    }
}

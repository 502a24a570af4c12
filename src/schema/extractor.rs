//! Schema extraction from PostgreSQL catalogs

use super::report::{group_index_rows, IndexDetail, IndexRow};
use super::{ColumnDetail, ColumnSummary, SchemaReport, SchemaSummary, TableDetail, TableSummary};
use crate::error::Result;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use tracing::info;

type ColumnRow = (String, String, String, Option<i32>, Option<i32>, Option<i32>);

/// Column row with nullability and default
type ColumnDetailRow = (
    String,
    String,
    String,
    Option<i32>,
    Option<i32>,
    Option<i32>,
    bool,
    Option<String>,
);

/// Reads the `public` schema of one database into a `SchemaSummary`
pub struct SchemaExtractor {
    pool: PgPool,
    db_name: String,
}

impl SchemaExtractor {
    pub fn new(pool: PgPool, db_name: impl Into<String>) -> Self {
        Self {
            pool,
            db_name: db_name.into(),
        }
    }

    /// Base tables of the public schema, sorted by name
    pub async fn table_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Build the full summary: tables, columns, PK and FK markers
    pub async fn extract(&self) -> Result<SchemaSummary> {
        let tables = self.table_names().await?;
        let columns = self.load_columns().await?;
        let primary_keys = self.load_primary_keys().await?;
        let foreign_keys = self.load_foreign_keys().await?;

        let mut columns_by_table: HashMap<String, Vec<ColumnSummary>> = HashMap::new();
        for (table, column, data_type, max_length, precision, scale) in columns {
            let mut summary =
                ColumnSummary::new(column.clone(), format_data_type(&data_type, max_length, precision, scale));
            summary.primary_key = primary_keys.contains(&(table.clone(), column.clone()));
            summary.references = foreign_keys.get(&(table.clone(), column)).cloned();
            columns_by_table.entry(table).or_default().push(summary);
        }

        let tables: Vec<TableSummary> = tables
            .into_iter()
            .map(|name| {
                let columns = columns_by_table.remove(&name).unwrap_or_default();
                TableSummary::new(name, columns)
            })
            .collect();

        info!("Extracted schema for {}: {} tables", self.db_name, tables.len());
        Ok(SchemaSummary::new(self.db_name.clone(), tables))
    }

    /// Verbose report: row estimates, nullability, defaults, unique
    /// constraints and indexes on top of the compact summary's data
    pub async fn extract_detailed(&self) -> Result<SchemaReport> {
        let tables = self.table_names().await?;
        let columns = self.load_column_details().await?;
        let primary_keys = self.load_primary_keys().await?;
        let foreign_keys = self.load_foreign_key_targets().await?;
        let unique_columns = self.load_unique_columns().await?;
        let mut row_estimates = self.load_row_estimates().await?;

        let mut columns_by_table: HashMap<String, Vec<ColumnDetail>> = HashMap::new();
        for (table, column, data_type, max_length, precision, scale, nullable, default) in columns {
            let key = (table.clone(), column.clone());
            let mut detail =
                ColumnDetail::new(column, format_data_type(&data_type, max_length, precision, scale));
            detail.nullable = nullable;
            detail.default = default;
            detail.primary_key = primary_keys.contains(&key);
            detail.unique = unique_columns.contains(&key);
            detail.references = foreign_keys.get(&key).cloned();
            columns_by_table.entry(table).or_default().push(detail);
        }

        let mut indexes_by_table: HashMap<String, Vec<IndexDetail>> = HashMap::new();
        for (table, index) in group_index_rows(self.load_indexes().await?) {
            indexes_by_table.entry(table).or_default().push(index);
        }

        let tables: Vec<TableDetail> = tables
            .into_iter()
            .map(|name| TableDetail {
                row_estimate: row_estimates.remove(&name).unwrap_or_default(),
                columns: columns_by_table.remove(&name).unwrap_or_default(),
                indexes: indexes_by_table.remove(&name).unwrap_or_default(),
                name,
            })
            .collect();

        info!("Extracted detailed schema for {}: {} tables", self.db_name, tables.len());
        Ok(SchemaReport::new(self.db_name.clone(), tables))
    }

    async fn load_columns(&self) -> Result<Vec<ColumnRow>> {
        let rows: Vec<ColumnRow> = sqlx::query_as(
            r#"
            SELECT
                table_name::text,
                column_name::text,
                data_type::text,
                character_maximum_length::int4,
                numeric_precision::int4,
                numeric_scale::int4
            FROM information_schema.columns
            WHERE table_schema = 'public'
            ORDER BY table_name, ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn load_column_details(&self) -> Result<Vec<ColumnDetailRow>> {
        let rows: Vec<ColumnDetailRow> = sqlx::query_as(
            r#"
            SELECT
                table_name::text,
                column_name::text,
                data_type::text,
                character_maximum_length::int4,
                numeric_precision::int4,
                numeric_scale::int4,
                is_nullable = 'YES',
                column_default::text
            FROM information_schema.columns
            WHERE table_schema = 'public'
            ORDER BY table_name, ordinal_position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Planner row estimates for public tables
    async fn load_row_estimates(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT c.relname::text, c.reltuples::int8
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = 'public'
            AND c.relkind = 'r'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn load_unique_columns(&self) -> Result<HashSet<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT tc.table_name::text, kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
            AND tc.constraint_type = 'UNIQUE'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// One row per indexed column, ordered by table, index and column position
    async fn load_indexes(&self) -> Result<Vec<IndexRow>> {
        let rows: Vec<IndexRow> = sqlx::query_as(
            r#"
            SELECT
                t.relname::text,
                i.relname::text,
                a.attname::text,
                ix.indisunique,
                ix.indisprimary,
                am.amname::text
            FROM pg_class t
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_index ix ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            JOIN pg_am am ON i.relam = am.oid
            WHERE n.nspname = 'public'
            AND t.relkind = 'r'
            ORDER BY t.relname, i.relname, a.attnum
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn load_primary_keys(&self) -> Result<HashSet<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT tc.table_name::text, kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
            AND tc.constraint_type = 'PRIMARY KEY'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// (table, column) -> referenced table
    async fn load_foreign_keys(&self) -> Result<HashMap<(String, String), String>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT tc.table_name::text, kcu.column_name::text, ccu.table_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            WHERE tc.table_schema = 'public'
            AND tc.constraint_type = 'FOREIGN KEY'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(table, column, target)| ((table, column), target))
            .collect())
    }

    /// (table, column) -> referenced (table, column)
    async fn load_foreign_key_targets(&self) -> Result<HashMap<(String, String), (String, String)>> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                tc.table_name::text,
                kcu.column_name::text,
                ccu.table_name::text,
                ccu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON ccu.constraint_name = tc.constraint_name
                AND ccu.table_schema = tc.table_schema
            WHERE tc.table_schema = 'public'
            AND tc.constraint_type = 'FOREIGN KEY'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(table, column, target, target_column)| ((table, column), (target, target_column)))
            .collect())
    }
}

/// Short type name with length or precision, e.g. `varchar(45)`, `numeric(5,2)`
pub fn format_data_type(
    data_type: &str,
    max_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> String {
    let short = match data_type {
        "character varying" => "varchar",
        "character" => "char",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "double precision" => "float8",
        "integer" => "int",
        other => other,
    };

    if let Some(length) = max_length {
        return format!("{}({})", short, length);
    }

    // integer types also report a precision; only numeric carries a declared one
    match (short, precision, scale) {
        ("numeric", Some(p), Some(s)) if s > 0 => format!("{}({},{})", short, p, s),
        ("numeric", Some(p), _) => format!("{}({})", short, p),
        _ => short.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_varchar() {
        assert_eq!(format_data_type("character varying", Some(45), None, None), "varchar(45)");
        assert_eq!(format_data_type("character", Some(1), None, None), "char(1)");
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_data_type("numeric", None, Some(5), Some(2)), "numeric(5,2)");
        assert_eq!(format_data_type("numeric", None, Some(10), Some(0)), "numeric(10)");
        assert_eq!(format_data_type("numeric", None, None, None), "numeric");
    }

    #[test]
    fn test_format_integers_ignore_precision() {
        assert_eq!(format_data_type("integer", None, Some(32), Some(0)), "int");
        assert_eq!(format_data_type("smallint", None, Some(16), Some(0)), "smallint");
    }

    #[test]
    fn test_format_timestamps() {
        assert_eq!(format_data_type("timestamp without time zone", None, None, None), "timestamp");
        assert_eq!(format_data_type("timestamp with time zone", None, None, None), "timestamptz");
    }
}

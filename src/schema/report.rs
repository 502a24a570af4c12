//! Detailed schema report
//!
//! Per-table view with row estimates, nullability, defaults, constraints and
//! secondary indexes. Rendered for people reading `/schema/extract` output;
//! generation only needs the compact `SchemaSummary` derived from it.

use super::{ColumnSummary, SchemaSummary, TableSummary};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    /// Referenced `(table, column)` when the column is a foreign key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<(String, String)>,
    /// Member of a UNIQUE constraint
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDetail {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
    /// Access method, e.g. `btree`
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDetail {
    pub name: String,
    /// Planner estimate; zero or negative when the table was never analyzed
    pub row_estimate: i64,
    pub columns: Vec<ColumnDetail>,
    pub indexes: Vec<IndexDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub database: String,
    pub tables: Vec<TableDetail>,
}

impl ColumnDetail {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            primary_key: false,
            references: None,
            unique: false,
        }
    }

    fn constraints(&self) -> Vec<String> {
        let mut constraints = Vec::new();
        if self.primary_key {
            constraints.push("PRIMARY KEY".to_string());
        }
        if let Some((table, column)) = &self.references {
            constraints.push(format!("FK → {}.{}", table, column));
        }
        if self.unique && !self.primary_key {
            constraints.push("UNIQUE".to_string());
        }
        constraints
    }
}

impl fmt::Display for ColumnDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nullable = if self.nullable { "NULL" } else { "NOT NULL" };
        write!(f, "{}: {} {}", self.name, self.data_type, nullable)?;
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", default)?;
        }
        let constraints = self.constraints();
        if !constraints.is_empty() {
            write!(f, " [{}]", constraints.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for IndexDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.unique { "UNIQUE" } else { "INDEX" };
        write!(
            f,
            "{}: {} ({}) [{}]",
            self.name,
            kind,
            self.columns.join(", "),
            self.method
        )
    }
}

impl TableDetail {
    /// Indexes other than the primary key's
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &IndexDetail> {
        self.indexes.iter().filter(|idx| !idx.primary)
    }
}

impl fmt::Display for TableDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TABLE: {}", self.name)?;
        if self.row_estimate > 0 {
            writeln!(f, "Rows: ~{}", group_thousands(self.row_estimate))?;
        }
        writeln!(f, "{}", "-".repeat(RULE_WIDTH))?;
        write!(f, "COLUMNS:")?;
        for column in &self.columns {
            write!(f, "\n  • {}", column)?;
        }

        let mut secondary = self.secondary_indexes().peekable();
        if secondary.peek().is_some() {
            write!(f, "\n\nINDEXES:")?;
            for index in secondary {
                write!(f, "\n  • {}", index)?;
            }
        }
        Ok(())
    }
}

impl SchemaReport {
    pub fn new(database: impl Into<String>, tables: Vec<TableDetail>) -> Self {
        Self {
            database: database.into(),
            tables,
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Compact summary used for generation
    pub fn summary(&self) -> SchemaSummary {
        SchemaSummary::from(self)
    }
}

impl fmt::Display for SchemaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tables.is_empty() {
            return write!(
                f,
                "Database '{}': No tables found in public schema.",
                self.database
            );
        }

        writeln!(f, "DATABASE: '{}'", self.database)?;
        writeln!(f, "TABLES: {}", self.tables.len())?;
        writeln!(f, "{}", "=".repeat(RULE_WIDTH))?;
        for table in &self.tables {
            write!(f, "\n{}\n", table)?;
        }
        Ok(())
    }
}

impl From<&SchemaReport> for SchemaSummary {
    fn from(report: &SchemaReport) -> Self {
        let tables = report
            .tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| ColumnSummary {
                        name: c.name.clone(),
                        data_type: c.data_type.clone(),
                        primary_key: c.primary_key,
                        references: c.references.as_ref().map(|(t, _)| t.clone()),
                    })
                    .collect();
                TableSummary::new(table.name.clone(), columns)
            })
            .collect();
        SchemaSummary::new(report.database.clone(), tables)
    }
}

/// Index catalog row: (table, index, column, unique, primary, method)
pub type IndexRow = (String, String, String, bool, bool, String);

/// Fold per-column index rows into one `IndexDetail` per (table, index),
/// keeping first-seen order
pub fn group_index_rows(rows: Vec<IndexRow>) -> Vec<(String, IndexDetail)> {
    rows.into_iter()
        .group_by(|(table, index, ..)| (table.clone(), index.clone()))
        .into_iter()
        .filter_map(|((table, name), group)| {
            let group: Vec<IndexRow> = group.collect();
            let (_, _, _, unique, primary, method) = group.first()?.clone();
            let columns = group.into_iter().map(|(_, _, column, ..)| column).collect();
            Some((
                table,
                IndexDetail {
                    name,
                    columns,
                    unique,
                    primary,
                    method,
                },
            ))
        })
        .collect()
}

/// `1234567` -> `1,234,567`
fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let grouped = digits
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .join(",");
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

//! Schema Summary
//!
//! Compact per-table listing of a database, used as the lookup source for
//! table names when synthesizing a generic SELECT.

pub mod cache;
pub mod extractor;
pub mod report;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use cache::SchemaCache;
pub use extractor::SchemaExtractor;
pub use report::{ColumnDetail, IndexDetail, SchemaReport, TableDetail};

/// One column in the compact listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    /// Referenced table when the column is a foreign key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSummary>,
}

/// Ordered table listing for one database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSummary {
    pub database: String,
    pub tables: Vec<TableSummary>,
}

impl ColumnSummary {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>) -> Self {
        self.references = Some(table.into());
        self
    }

    fn markers(&self) -> Vec<String> {
        let mut markers = Vec::new();
        if self.primary_key {
            markers.push("PK".to_string());
        }
        if let Some(table) = &self.references {
            markers.push(format!("FK→{}", table));
        }
        markers
    }

    /// Parse `name:type [PK,FK→other]`
    fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let (head, markers) = match entry.find(" [") {
            Some(idx) if entry.ends_with(']') => (&entry[..idx], &entry[idx + 2..entry.len() - 1]),
            _ => (entry, ""),
        };
        let (name, data_type) = head.split_once(':')?;
        let mut column = ColumnSummary::new(name.trim(), data_type.trim());
        for marker in markers.split(',').map(str::trim) {
            if marker == "PK" {
                column.primary_key = true;
            } else if let Some(target) = marker.strip_prefix("FK→") {
                column.references = Some(target.to_string());
            }
        }
        Some(column)
    }
}

impl fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)?;
        let markers = self.markers();
        if !markers.is_empty() {
            write!(f, " [{}]", markers.join(","))?;
        }
        Ok(())
    }
}

impl TableSummary {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSummary>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

impl SchemaSummary {
    pub fn new(database: impl Into<String>, tables: Vec<TableSummary>) -> Self {
        Self {
            database: database.into(),
            tables,
        }
    }

    /// A summary holding only table names, in the given order
    pub fn from_table_names<I, S>(database: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            database,
            names
                .into_iter()
                .map(|name| TableSummary::new(name, Vec::new()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in listing order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn table(&self, name: &str) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// First table (listing order) whose lower-cased name occurs in `text`
    pub fn find_table_mentioned_in(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.table_names()
            .find(|name| text.contains(&name.to_lowercase()))
    }

    /// Parse the compact listing.
    ///
    /// Accepts bullet lines (`  • name: col:type, ...`) and verbose headers
    /// (`TABLE: name`). Once a verbose header is seen, bullets are column or
    /// index lines and are skipped. Anything else is ignored.
    pub fn parse(text: &str) -> Self {
        let mut summary = SchemaSummary::default();
        let mut verbose = false;

        for line in text.lines() {
            let trimmed = line.trim();

            if let Some(rest) = trimmed
                .strip_prefix("Database '")
                .or_else(|| trimmed.strip_prefix("DATABASE: '"))
            {
                if let Some(end) = rest.find('\'') {
                    summary.database = rest[..end].to_string();
                }
                continue;
            }

            if let Some(rest) = trimmed
                .strip_prefix("TABLE:")
                .or_else(|| trimmed.strip_prefix("Table:"))
            {
                verbose = true;
                if let Some(name) = rest.split_whitespace().next() {
                    summary.tables.push(TableSummary::new(name, Vec::new()));
                }
                continue;
            }

            if verbose {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('•') {
                let rest = rest.trim();
                let (name, columns) = match rest.split_once(": ") {
                    Some((name, columns)) => (name, columns),
                    None => (rest.trim_end_matches(':'), ""),
                };
                if name.is_empty() || name.contains(char::is_whitespace) {
                    continue;
                }
                let columns = split_columns(columns)
                    .iter()
                    .filter_map(|entry| ColumnSummary::parse(entry))
                    .collect();
                summary.tables.push(TableSummary::new(name, columns));
            }
        }

        summary
    }
}

/// Split a column list on commas that are not inside `(...)` or `[...]`
fn split_columns(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (idx, ch) in list.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&list[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if start < list.len() {
        parts.push(&list[start..]);
    }

    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

impl fmt::Display for SchemaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tables.is_empty() {
            return write!(f, "Database '{}': No tables found.", self.database);
        }

        write!(f, "Database '{}' - {} tables:", self.database, self.tables.len())?;
        for table in &self.tables {
            write!(
                f,
                "\n  • {}: {}",
                table.name,
                table.columns.iter().map(ToString::to_string).join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dvdrental() -> SchemaSummary {
        SchemaSummary::new(
            "dvdrental",
            vec![
                TableSummary::new(
                    "actor",
                    vec![
                        ColumnSummary::new("actor_id", "int").primary_key(),
                        ColumnSummary::new("first_name", "varchar(45)"),
                    ],
                ),
                TableSummary::new(
                    "film_actor",
                    vec![
                        ColumnSummary::new("actor_id", "smallint")
                            .primary_key()
                            .references("actor"),
                        ColumnSummary::new("film_id", "smallint")
                            .primary_key()
                            .references("film"),
                    ],
                ),
                TableSummary::new(
                    "payment",
                    vec![ColumnSummary::new("amount", "numeric(5,2)")],
                ),
            ],
        )
    }

    #[test]
    fn test_render_compact_lines() {
        let rendered = dvdrental().to_string();
        assert!(rendered.starts_with("Database 'dvdrental' - 3 tables:"));
        assert!(rendered.contains("  • actor: actor_id:int [PK], first_name:varchar(45)"));
        assert!(rendered.contains("actor_id:smallint [PK,FK→actor]"));
    }

    #[test]
    fn test_parse_preserves_tables_and_order() {
        let original = dvdrental();
        let parsed = SchemaSummary::parse(&original.to_string());
        assert_eq!(parsed, original);
        let names: Vec<&str> = parsed.table_names().collect();
        assert_eq!(names, vec!["actor", "film_actor", "payment"]);
    }

    #[test]
    fn test_parse_verbose_headers() {
        let text = "DATABASE: 'shop'\nTABLES: 2\n\nTABLE: customers\nRows: ~10\nCOLUMNS:\n  \
                    • id: int NOT NULL [PRIMARY KEY]\n  • email: varchar(80) NULL [UNIQUE]\n\n\
                    TABLE: orders\nCOLUMNS:\n  • customer_id: int NULL [FK → customers.id]\n";
        let parsed = SchemaSummary::parse(text);
        assert_eq!(parsed.database, "shop");
        let names: Vec<&str> = parsed.table_names().collect();
        assert_eq!(names, vec!["customers", "orders"]);
    }

    #[test]
    fn test_find_table_first_in_listing_order() {
        let schema = dvdrental();
        assert_eq!(schema.find_table_mentioned_in("Show me FILM_ACTOR rows"), Some("actor"));
        assert_eq!(schema.find_table_mentioned_in("get payments"), Some("payment"));
        assert_eq!(schema.find_table_mentioned_in("find rentals"), None);
    }

    #[test]
    fn test_empty_summary_renders_placeholder() {
        let schema = SchemaSummary::new("empty", Vec::new());
        assert_eq!(schema.to_string(), "Database 'empty': No tables found.");
        assert!(SchemaSummary::parse(&schema.to_string()).is_empty());
    }
}

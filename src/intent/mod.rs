//! Intent Classifier
//!
//! Maps a free-text admin request to exactly one intent using an ordered
//! keyword rule table over the lower-cased input.

pub mod names;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub use names::extract_table_name;

/// Closed set of request intents. Tags serialize verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ListTables,
    DescribeTable,
    ListIndexes,
    ForeignKeys,
    TableSizes,
    DatabaseSize,
    RowCounts,
    Connections,
    ActiveQueries,
    Statistics,
    DataQuery,
    Modification,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 13] = [
        IntentKind::ListTables,
        IntentKind::DescribeTable,
        IntentKind::ListIndexes,
        IntentKind::ForeignKeys,
        IntentKind::TableSizes,
        IntentKind::DatabaseSize,
        IntentKind::RowCounts,
        IntentKind::Connections,
        IntentKind::ActiveQueries,
        IntentKind::Statistics,
        IntentKind::DataQuery,
        IntentKind::Modification,
        IntentKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::ListTables => "list_tables",
            IntentKind::DescribeTable => "describe_table",
            IntentKind::ListIndexes => "list_indexes",
            IntentKind::ForeignKeys => "foreign_keys",
            IntentKind::TableSizes => "table_sizes",
            IntentKind::DatabaseSize => "database_size",
            IntentKind::RowCounts => "row_counts",
            IntentKind::Connections => "connections",
            IntentKind::ActiveQueries => "active_queries",
            IntentKind::Statistics => "statistics",
            IntentKind::DataQuery => "data_query",
            IntentKind::Modification => "modification",
            IntentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified purpose of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl Intent {
    pub fn new(kind: IntentKind, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            explanation: explanation.into(),
            table: None,
        }
    }

    /// A describe_table intent for a known table
    pub fn describe(table: Option<String>) -> Self {
        let explanation = match &table {
            Some(t) => format!("Show structure of table: {}", t),
            None => "Show table structure".to_string(),
        };
        Self {
            kind: IntentKind::DescribeTable,
            explanation,
            table,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// How a rule tests the normalized text
#[derive(Debug, Clone, Copy)]
enum Matcher {
    Contains(&'static [&'static str]),
    StartsWith(&'static [&'static str]),
}

impl Matcher {
    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Contains(keywords) => keywords.iter().any(|kw| text.contains(kw)),
            Matcher::StartsWith(prefixes) => prefixes.iter().any(|p| text.starts_with(p)),
        }
    }
}

struct IntentRule {
    kind: IntentKind,
    matcher: Matcher,
    build: fn(&str) -> Intent,
}

/// Rule order is precedence: keyword sets overlap, first match wins.
static RULES: &[IntentRule] = &[
    IntentRule {
        kind: IntentKind::ListTables,
        matcher: Matcher::Contains(&["show tables", "list tables", "what tables", "all tables"]),
        build: |_| Intent::new(IntentKind::ListTables, "List all tables in the database"),
    },
    IntentRule {
        kind: IntentKind::DescribeTable,
        matcher: Matcher::Contains(&[
            "describe",
            "table structure",
            "columns in",
            "show columns",
            "schema of",
        ]),
        build: |text| Intent::describe(extract_table_name(text)),
    },
    IntentRule {
        kind: IntentKind::ListIndexes,
        matcher: Matcher::Contains(&["show indexes", "list indexes", "what indexes", "all indexes"]),
        build: |_| Intent::new(IntentKind::ListIndexes, "List all indexes in the database"),
    },
    IntentRule {
        kind: IntentKind::ForeignKeys,
        matcher: Matcher::Contains(&["foreign key", "relationships", "references", "constraints"]),
        build: |_| Intent::new(IntentKind::ForeignKeys, "Show foreign key relationships"),
    },
    IntentRule {
        kind: IntentKind::TableSizes,
        matcher: Matcher::Contains(&["table size", "table sizes", "disk usage", "space used"]),
        build: |_| Intent::new(IntentKind::TableSizes, "Show table sizes sorted by disk usage"),
    },
    IntentRule {
        kind: IntentKind::DatabaseSize,
        matcher: Matcher::Contains(&["database size", "db size", "total size"]),
        build: |_| Intent::new(IntentKind::DatabaseSize, "Show total database size"),
    },
    IntentRule {
        kind: IntentKind::RowCounts,
        matcher: Matcher::Contains(&["row count", "table rows", "count rows", "how many rows"]),
        build: |_| Intent::new(IntentKind::RowCounts, "Show row counts for all tables"),
    },
    IntentRule {
        kind: IntentKind::Connections,
        matcher: Matcher::Contains(&[
            "connections",
            "active sessions",
            "who is connected",
            "connected users",
        ]),
        build: |_| Intent::new(IntentKind::Connections, "Show active database connections"),
    },
    IntentRule {
        kind: IntentKind::ActiveQueries,
        matcher: Matcher::Contains(&["running queries", "active queries", "current queries"]),
        build: |_| Intent::new(IntentKind::ActiveQueries, "Show currently running queries"),
    },
    IntentRule {
        kind: IntentKind::Statistics,
        matcher: Matcher::Contains(&["statistics", "stats", "table stats"]),
        build: |_| Intent::new(IntentKind::Statistics, "Show database statistics"),
    },
    IntentRule {
        kind: IntentKind::DataQuery,
        matcher: Matcher::StartsWith(&["select", "show me", "get", "find", "list all"]),
        build: |_| Intent::new(IntentKind::DataQuery, "Retrieve data from database"),
    },
    IntentRule {
        kind: IntentKind::Modification,
        matcher: Matcher::StartsWith(&["update", "delete", "insert", "create", "alter", "drop"]),
        build: |_| Intent::new(IntentKind::Modification, "Modify database structure or data"),
    },
];

/// Classify a raw request. Total: unmatched input is `Unknown`.
pub fn classify(query: &str) -> Intent {
    let text = query.trim().to_lowercase();

    for rule in RULES {
        if rule.matcher.matches(&text) {
            debug!("Intent rule hit: {}", rule.kind);
            return (rule.build)(&text);
        }
    }

    Intent::new(IntentKind::Unknown, "General database query")
}

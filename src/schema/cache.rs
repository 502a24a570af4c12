//! Schema cache keyed by database name, invalidated explicitly on refresh.

use super::SchemaSummary;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: DashMap<String, Arc<SchemaSummary>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, db_name: &str) -> Option<Arc<SchemaSummary>> {
        self.entries.get(db_name).map(|entry| Arc::clone(entry.value()))
    }

    /// Store a summary, replacing any previous one for the database
    pub fn insert(&self, db_name: &str, summary: SchemaSummary) -> Arc<SchemaSummary> {
        let summary = Arc::new(summary);
        self.entries.insert(db_name.to_string(), Arc::clone(&summary));
        debug!("Cached schema for {} ({} tables)", db_name, summary.tables.len());
        summary
    }

    /// Drop the cached summary; returns whether one was present
    pub fn invalidate(&self, db_name: &str) -> bool {
        self.entries.remove(db_name).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_invalidate() {
        let cache = SchemaCache::new();
        assert!(cache.get("shop").is_none());

        cache.insert("shop", SchemaSummary::from_table_names("shop", ["customers"]));
        let cached = cache.get("shop").unwrap();
        assert_eq!(cached.table_names().collect::<Vec<_>>(), vec!["customers"]);

        assert!(cache.invalidate("shop"));
        assert!(!cache.invalidate("shop"));
        assert!(cache.get("shop").is_none());
    }

    #[test]
    fn test_entries_are_per_database() {
        let cache = SchemaCache::new();
        cache.insert("a", SchemaSummary::from_table_names("a", ["one"]));
        cache.insert("b", SchemaSummary::from_table_names("b", ["two"]));
        assert_eq!(cache.len(), 2);

        cache.invalidate("a");
        assert!(cache.get("b").is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}

//! Row cache shared by every journal and query.
//!
//! Rows are stored once, keyed by their globally unique row id, with a
//! per-table id set so a table can be scanned without touching the rows
//! of other tables.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use strata_core::{Row, RowId};

/// In-memory cache of all committed and in-flight rows.
#[derive(Debug, Default)]
pub struct RowCache {
    rows: BTreeMap<RowId, Rc<Row>>,
    tables: BTreeMap<String, BTreeSet<RowId>>,
}

impl RowCache {
    /// Creates a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table so it reports zero rows instead of being unknown.
    pub fn create_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    /// Gets a row by id.
    pub fn get(&self, row_id: RowId) -> Option<Rc<Row>> {
        self.rows.get(&row_id).cloned()
    }

    /// Gets multiple rows by id. Missing rows are `None`, positions match.
    pub fn get_many(&self, row_ids: &[RowId]) -> Vec<Option<Rc<Row>>> {
        row_ids.iter().map(|id| self.get(*id)).collect()
    }

    /// Inserts or replaces a row of `table`.
    pub fn set(&mut self, table: &str, row: Row) {
        let id = row.id();
        self.rows.insert(id, Rc::new(row));
        match self.tables.get_mut(table) {
            Some(ids) => {
                ids.insert(id);
            }
            None => {
                self.tables.insert(table.to_string(), BTreeSet::from([id]));
            }
        }
    }

    /// Inserts or replaces several rows of `table`.
    pub fn set_many(&mut self, table: &str, rows: impl IntoIterator<Item = Row>) {
        for row in rows {
            self.set(table, row);
        }
    }

    /// Removes a row of `table`, returning it if it was present.
    pub fn remove(&mut self, table: &str, row_id: RowId) -> Option<Rc<Row>> {
        if let Some(ids) = self.tables.get_mut(table) {
            ids.remove(&row_id);
        }
        self.rows.remove(&row_id)
    }

    /// Returns all rows of `table` in row id order.
    pub fn get_table_rows(&self, table: &str) -> Vec<Rc<Row>> {
        self.tables
            .get(table)
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).collect())
            .unwrap_or_default()
    }

    /// Returns the number of rows in `table`.
    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |ids| ids.len())
    }

    /// Returns the total row count across all tables.
    pub fn total_row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the row is cached.
    pub fn contains(&self, row_id: RowId) -> bool {
        self.rows.contains_key(&row_id)
    }

    /// Removes every row but keeps the table registrations.
    pub fn clear(&mut self) {
        self.rows.clear();
        for ids in self.tables.values_mut() {
            ids.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use strata_core::Value;

    fn row(id: RowId, v: i64) -> Row {
        Row::new(id, vec![Value::Int64(v)])
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = RowCache::new();
        cache.set("users", row(1, 10));
        cache.set("orders", row(2, 20));

        assert_eq!(cache.get(1).unwrap().values(), &[Value::Int64(10)]);
        assert!(cache.get(3).is_none());
        assert_eq!(cache.count("users"), 1);
        assert_eq!(cache.total_row_count(), 2);
    }

    #[test]
    fn test_get_many_keeps_positions() {
        let mut cache = RowCache::new();
        cache.set_many("t", vec![row(1, 1), row(2, 2)]);
        let got = cache.get_many(&[2, 9, 1]);
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].as_ref().unwrap().id(), 2);
        assert!(got[1].is_none());
        assert_eq!(got[2].as_ref().unwrap().id(), 1);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut cache = RowCache::new();
        cache.set("t", row(1, 1));
        cache.set("t", row(1, 5));
        assert_eq!(cache.count("t"), 1);
        assert_eq!(cache.get(1).unwrap().get(0), Some(&Value::Int64(5)));

        assert!(cache.remove("t", 1).is_some());
        assert!(cache.remove("t", 1).is_none());
        assert_eq!(cache.count("t"), 0);
    }

    #[test]
    fn test_table_rows_are_isolated() {
        let mut cache = RowCache::new();
        cache.create_table("empty");
        cache.set("a", row(3, 3));
        cache.set("a", row(1, 1));
        cache.set("b", row(2, 2));

        let ids: Vec<RowId> = cache.get_table_rows("a").iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(cache.get_table_rows("empty").is_empty());
        assert!(cache.get_table_rows("missing").is_empty());

        cache.clear();
        assert_eq!(cache.total_row_count(), 0);
    }
}

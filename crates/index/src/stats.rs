//! Index statistics.
//!
//! The cost estimator reads `total_rows`; auto-increment primary keys read
//! `max_key_encountered`.

use strata_core::Value;

/// Statistics for an index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IndexStats {
    total_rows: usize,
    max_key_encountered: i64,
}

impl IndexStats {
    /// Creates a new empty stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of row ids stored in the index.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Returns the largest integer key ever added. Never decreases, so
    /// auto-increment values are not reused after a delete.
    pub fn max_key_encountered(&self) -> i64 {
        self.max_key_encountered
    }

    /// Records `count` added rows under `key`.
    pub fn add(&mut self, key: &[Value], count: usize) {
        self.total_rows += count;
        if let [single] = key {
            let n = match single {
                Value::Int32(v) => Some(*v as i64),
                Value::Int64(v) => Some(*v),
                _ => None,
            };
            if let Some(n) = n {
                self.max_key_encountered = self.max_key_encountered.max(n);
            }
        }
    }

    /// Records `count` removed rows.
    pub fn remove(&mut self, count: usize) {
        self.total_rows = self.total_rows.saturating_sub(count);
    }

    /// Resets the row count to zero. The max key is kept.
    pub fn clear(&mut self) {
        self.total_rows = 0;
    }
}

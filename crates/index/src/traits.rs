//! The `Index` trait.

use crate::key_range::SingleKeyRange;
use crate::stats::IndexStats;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use strata_core::{RowId, Value};

/// Range over one key column.
pub type KeyRange = SingleKeyRange<Value>;

/// One component per index column.
pub type Key = Vec<Value>;

/// Maps keys to the ids of the rows filed under them, in key order.
///
/// Range lookups take one `KeyRange` per key column, leading column
/// first. Trailing columns without a range are unconstrained, so an
/// empty slice covers the whole index.
pub trait Index {
    /// `table.index`.
    fn name(&self) -> &str;

    /// Files `row_id` under `key`. Unique indices refuse a second row
    /// for the same key.
    fn add(&mut self, key: Key, row_id: RowId) -> Result<(), IndexError>;

    /// Files every `(key, row_id)` pair. Nothing is added if a unique
    /// index would end up with a duplicate key.
    fn add_batch(&mut self, batch: Vec<(Key, RowId)>) -> Result<(), IndexError> {
        for (key, row_id) in batch {
            self.add(key, row_id)?;
        }
        Ok(())
    }

    /// Makes `row_id` the only row under `key`.
    fn set(&mut self, key: Key, row_id: RowId);

    fn get(&self, key: &[Value]) -> Vec<RowId>;

    /// Drops `row_id` from `key`, or the whole key when `row_id` is
    /// `None`. Missing keys are ignored.
    fn remove(&mut self, key: &[Value], row_id: Option<RowId>);

    fn contains_key(&self, key: &[Value]) -> bool;

    /// Rows under the keys in `ranges`, walked forwards or backwards,
    /// with `skip` and `limit` applied to the walk.
    fn get_range(
        &self,
        ranges: &[KeyRange],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId>;

    /// Number of rows a scan of `ranges` would return.
    fn cost(&self, ranges: &[KeyRange]) -> usize;

    fn is_unique_key(&self) -> bool;

    fn stats(&self) -> &IndexStats;

    /// Distinct keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

#[derive(Clone, Debug, PartialEq)]
pub enum IndexError {
    DuplicateKey { index: String, key: Key },
}

fn render_key(key: &[Value]) -> String {
    let parts: Vec<String> = key.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let IndexError::DuplicateKey { index, key } = self;
        write!(f, "{} already holds key {}", index, render_key(key))
    }
}

/// Duplicate keys surface as unique constraint violations.
impl From<IndexError> for strata_core::Error {
    fn from(err: IndexError) -> Self {
        let IndexError::DuplicateKey { index, key } = err;
        strata_core::Error::unique_constraint(index, render_key(&key))
    }
}

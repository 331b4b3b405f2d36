//! Rows and row ids.

use crate::value::Value;
use alloc::vec::Vec;

pub type RowId = u64;

/// Id of a row that has not been stored yet. The journal assigns a real
/// id on insert.
pub const DUMMY_ROW_ID: RowId = u64::MAX;

/// Hands out increasing row ids. Each store owns one.
#[derive(Clone, Debug, Default)]
pub struct RowIdGenerator {
    next: RowId,
}

impl RowIdGenerator {
    pub fn starting_at(next: RowId) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> RowId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Keeps later ids above `seen`, e.g. after loading stored rows.
    pub fn bump_past(&mut self, seen: RowId) {
        if seen != DUMMY_ROW_ID {
            self.next = self.next.max(seen + 1);
        }
    }
}

/// Positional values of one table row, in column order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    id: RowId,
    values: Vec<Value>,
}

impl Row {
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self { id, values }
    }

    /// A row without an id yet.
    pub fn dummy(values: Vec<Value>) -> Self {
        Self::new(DUMMY_ROW_ID, values)
    }

    #[inline]
    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn set_id(&mut self, id: RowId) {
        self.id = id;
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.id == DUMMY_ROW_ID
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[inline]
    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    /// Overwrites one column, returning the old value. Out of range
    /// positions leave the row untouched.
    pub fn set(&mut self, column: usize, value: Value) -> Option<Value> {
        self.values
            .get_mut(column)
            .map(|slot| core::mem::replace(slot, value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

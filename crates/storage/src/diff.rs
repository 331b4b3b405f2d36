//! Per-table change sets accumulated by a journal.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use strata_core::{Row, RowId};

/// A `(before, after)` pair. `None` before means an insert, `None` after
/// a delete.
pub type Modification = (Option<Row>, Option<Row>);

/// The net effect on one row.
#[derive(Clone, Debug, PartialEq)]
pub enum RowChange {
    Added(Row),
    Modified { before: Row, after: Row },
    Deleted(Row),
}

impl RowChange {
    /// The change as a modification pair.
    pub fn to_modification(&self) -> Modification {
        match self {
            RowChange::Added(row) => (None, Some(row.clone())),
            RowChange::Modified { before, after } => (Some(before.clone()), Some(after.clone())),
            RowChange::Deleted(row) => (Some(row.clone()), None),
        }
    }
}

/// Net changes to one table, in the order rows were first touched.
///
/// Successive changes to the same row collapse into one: an insert
/// followed by updates stays an insert of the latest value, an insert
/// followed by a delete vanishes, updates keep the first before-image, and
/// a delete followed by an insert becomes an update.
#[derive(Clone, Debug, Default)]
pub struct TableDiff {
    table_name: String,
    order: Vec<RowId>,
    changes: HashMap<RowId, RowChange>,
}

impl TableDiff {
    /// Creates a new table diff.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            order: Vec::new(),
            changes: HashMap::new(),
        }
    }

    /// Returns the table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn put(&mut self, id: RowId, change: RowChange) {
        if self.changes.insert(id, change).is_none() {
            self.order.push(id);
        }
    }

    fn replace(&mut self, id: RowId, change: RowChange, existed: bool) {
        self.changes.insert(id, change);
        if !existed {
            self.order.push(id);
        }
    }

    fn drop_row(&mut self, id: RowId) {
        if self.changes.remove(&id).is_some() {
            self.order.retain(|r| *r != id);
        }
    }

    /// Records an addition.
    pub fn add(&mut self, row: Row) {
        let id = row.id();
        let previous = self.changes.remove(&id);
        let existed = previous.is_some();
        let change = match previous {
            Some(RowChange::Deleted(before)) | Some(RowChange::Modified { before, .. }) => {
                RowChange::Modified { before, after: row }
            }
            Some(RowChange::Added(_)) | None => RowChange::Added(row),
        };
        self.replace(id, change, existed);
    }

    /// Records a modification.
    pub fn modify(&mut self, before: Row, after: Row) {
        let id = before.id();
        let previous = self.changes.remove(&id);
        let existed = previous.is_some();
        let change = match previous {
            Some(RowChange::Added(_)) => RowChange::Added(after),
            Some(RowChange::Modified { before: original, .. }) => RowChange::Modified {
                before: original,
                after,
            },
            Some(RowChange::Deleted(_)) | None => RowChange::Modified { before, after },
        };
        self.replace(id, change, existed);
    }

    /// Records a deletion.
    pub fn delete(&mut self, row: Row) {
        let id = row.id();
        match self.changes.get(&id) {
            Some(RowChange::Added(_)) => self.drop_row(id),
            Some(RowChange::Modified { before, .. }) => {
                let original = before.clone();
                self.changes.insert(id, RowChange::Deleted(original));
            }
            Some(RowChange::Deleted(_)) => {}
            None => self.put(id, RowChange::Deleted(row)),
        }
    }

    /// Returns the net changes in first-touch order.
    pub fn changes(&self) -> impl DoubleEndedIterator<Item = &RowChange> + '_ {
        self.order.iter().filter_map(move |id| self.changes.get(id))
    }

    /// Returns the change recorded for `row_id`.
    pub fn get(&self, row_id: RowId) -> Option<&RowChange> {
        self.changes.get(&row_id)
    }

    /// Returns added rows.
    pub fn added(&self) -> impl Iterator<Item = &Row> + '_ {
        self.changes().filter_map(|c| match c {
            RowChange::Added(row) => Some(row),
            _ => None,
        })
    }

    /// Returns modified rows as `(before, after)`.
    pub fn modified(&self) -> impl Iterator<Item = (&Row, &Row)> + '_ {
        self.changes().filter_map(|c| match c {
            RowChange::Modified { before, after } => Some((before, after)),
            _ => None,
        })
    }

    /// Returns deleted rows.
    pub fn deleted(&self) -> impl Iterator<Item = &Row> + '_ {
        self.changes().filter_map(|c| match c {
            RowChange::Deleted(row) => Some(row),
            _ => None,
        })
    }

    /// Returns the number of changed rows.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The diff that undoes this one. Changes are listed last-touched first
    /// so replaying them never collides on a unique key that a later change
    /// took over.
    pub fn reverse(&self) -> Self {
        let mut reversed = Self::new(self.table_name.clone());
        for change in self.changes().rev() {
            let (id, undo) = match change {
                RowChange::Added(row) => (row.id(), RowChange::Deleted(row.clone())),
                RowChange::Modified { before, after } => (
                    before.id(),
                    RowChange::Modified {
                        before: after.clone(),
                        after: before.clone(),
                    },
                ),
                RowChange::Deleted(row) => (row.id(), RowChange::Added(row.clone())),
            };
            reversed.put(id, undo);
        }
        reversed
    }

    /// The net changes as modification pairs, in order.
    pub fn as_modifications(&self) -> Vec<Modification> {
        self.changes().map(RowChange::to_modification).collect()
    }
}

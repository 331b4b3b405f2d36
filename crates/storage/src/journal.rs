//! Transaction journal.
//!
//! A `Journal` is the only write path into a `Store`. Every mutation is
//! checked against the schema constraints, applied to the indices and the
//! cache right away, and recorded in a per-table `TableDiff` so it can be
//! undone by `rollback`.
//!
//! Any error raised by a mutation leaves the journal in a pending-rollback
//! state in which everything except `rollback` is refused.

use crate::constraint::{CascadeUpdate, ConstraintChecker};
use crate::diff::{Modification, TableDiff};
use crate::store::Store;
use crate::updater::InMemoryUpdater;
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};
use strata_core::schema::{ConstraintTiming, Schema, Table};
use strata_core::{DataType, Error, Result, Row, RowId, Value};
use tracing::{debug, trace};

/// Mutation log for one transaction over a fixed set of tables.
pub struct Journal<'a> {
    schema: &'a Schema,
    store: &'a mut Store,
    scope: HashSet<String>,
    /// In the order the tables were first touched.
    table_diffs: Vec<TableDiff>,
    diff_positions: HashMap<String, usize>,
    terminated: bool,
    pending_rollback: bool,
}

impl<'a> Journal<'a> {
    /// Opens a journal allowed to touch the tables named in `scope`.
    pub fn new(schema: &'a Schema, store: &'a mut Store, scope: &[&str]) -> Result<Self> {
        let mut tables = HashSet::with_capacity(scope.len());
        for name in scope {
            schema.table(name)?;
            tables.insert(name.to_string());
        }
        debug!(scope = ?scope, "journal opened");
        Ok(Self {
            schema,
            store,
            scope: tables,
            table_diffs: Vec::new(),
            diff_positions: HashMap::new(),
            terminated: false,
            pending_rollback: false,
        })
    }

    /// Read view of the store, including this journal's own changes.
    pub fn store(&self) -> &Store {
        self.store
    }

    /// The schema the journal validates against.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// The accumulated per-table diffs, in the order the tables were
    /// first touched.
    pub fn diffs(&self) -> &[TableDiff] {
        &self.table_diffs
    }

    pub fn diff(&self, table: &str) -> Option<&TableDiff> {
        self.diff_positions.get(table).map(|&pos| &self.table_diffs[pos])
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn is_pending_rollback(&self) -> bool {
        self.pending_rollback
    }

    /// Allocates a row id and wraps `values` in a row.
    pub fn create_row(&mut self, values: Vec<Value>) -> Row {
        self.store.create_row(values)
    }

    /// Inserts new rows. Rows with a dummy id get a fresh one, and a null
    /// or zero auto-increment primary key is assigned the next key.
    pub fn insert(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<RowId>> {
        self.assert_writable()?;
        self.guarded(|j| {
            j.assert_scope(table)?;
            let def = j.schema.table(table)?;
            let mut ids = Vec::with_capacity(rows.len());
            for row in rows {
                ids.push(j.insert_row(def, row)?);
            }
            debug!(table, rows = ids.len(), "insert");
            Ok(ids)
        })
    }

    /// Replaces existing rows, matched by row id.
    pub fn update(&mut self, table: &str, rows: Vec<Row>) -> Result<()> {
        self.assert_writable()?;
        self.guarded(|j| {
            j.assert_scope(table)?;
            let def = j.schema.table(table)?;
            let count = rows.len();
            for row in rows {
                j.update_row(def, row)?;
            }
            debug!(table, rows = count, "update");
            Ok(())
        })
    }

    /// Inserts each row, or updates the row that already holds its
    /// primary key.
    pub fn insert_or_replace(&mut self, table: &str, rows: Vec<Row>) -> Result<Vec<RowId>> {
        self.assert_writable()?;
        self.guarded(|j| {
            j.assert_scope(table)?;
            let def = j.schema.table(table)?;
            let mut ids = Vec::with_capacity(rows.len());
            for mut row in rows {
                match j.existing_by_primary_key(def, &row)? {
                    Some(id) => {
                        row.set_id(id);
                        j.update_row(def, row)?;
                        ids.push(id);
                    }
                    None => ids.push(j.insert_row(def, row)?),
                }
            }
            debug!(table, rows = ids.len(), "insert or replace");
            Ok(ids)
        })
    }

    /// Removes rows by id, cascading to referencing rows where the foreign
    /// key asks for it.
    pub fn remove(&mut self, table: &str, row_ids: &[RowId]) -> Result<()> {
        self.assert_writable()?;
        self.guarded(|j| {
            j.assert_scope(table)?;
            let def = j.schema.table(table)?;
            let mut rows = Vec::with_capacity(row_ids.len());
            for id in row_ids {
                let row = j
                    .store
                    .cache()
                    .get(*id)
                    .ok_or_else(|| Error::row_not_found(table, *id))?;
                rows.push(Row::clone(&row));
            }

            let plan = ConstraintChecker::cascade_deletes(j.schema, j.store, def, rows)?;
            let deleting: BTreeSet<RowId> = plan.rows.values().flatten().map(Row::id).collect();
            trace!(order = ?plan.order, rows = deleting.len(), "delete plan");
            for name in &plan.order {
                j.assert_scope(name)?;
            }
            for name in &plan.order {
                let owner = j.schema.table(name)?;
                let rows = plan.rows.get(name).map(Vec::as_slice).unwrap_or_default();
                ConstraintChecker::check_foreign_keys_for_delete(
                    j.schema,
                    j.store,
                    owner,
                    rows,
                    &deleting,
                    ConstraintTiming::Immediate,
                )?;
                for row in rows {
                    j.modify_row(owner, (Some(row.clone()), None))?;
                }
            }
            debug!(table, rows = deleting.len(), "remove");
            Ok(())
        })
    }

    /// Validates deferrable foreign keys against everything this journal
    /// has changed.
    pub fn check_deferred_constraints(&mut self) -> Result<()> {
        self.assert_writable()?;
        self.guarded(|j| ConstraintChecker::check_deferred(j.schema, j.store, &j.table_diffs))
    }

    /// Finishes the transaction. Deferred constraints are checked first;
    /// if they fail the journal stays open and must be rolled back.
    pub fn commit(&mut self) -> Result<()> {
        self.check_deferred_constraints()?;
        self.terminated = true;
        debug!(tables = self.table_diffs.len(), "journal committed");
        Ok(())
    }

    /// Undoes every change made through this journal.
    pub fn rollback(&mut self) -> Result<()> {
        if self.terminated {
            return Err(Error::invalid_state("Journal is already terminated"));
        }
        for diff in self.table_diffs.iter().rev() {
            let table = self.schema.table(diff.table_name())?;
            let undo = diff.reverse().as_modifications();
            InMemoryUpdater::apply(self.store, table, &undo).map_err(|e| {
                Error::internal(format!("rollback of {} failed: {}", diff.table_name(), e))
            })?;
        }
        self.terminated = true;
        self.pending_rollback = false;
        debug!(tables = self.table_diffs.len(), "journal rolled back");
        Ok(())
    }

    fn assert_writable(&self) -> Result<()> {
        if self.terminated {
            return Err(Error::invalid_state("Journal is already terminated"));
        }
        if self.pending_rollback {
            return Err(Error::invalid_state(
                "Journal has a pending rollback; only rollback is allowed",
            ));
        }
        Ok(())
    }

    fn assert_scope(&self, table: &str) -> Result<()> {
        if self.scope.contains(table) {
            Ok(())
        } else {
            Err(Error::scope_violation(table))
        }
    }

    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if let Err(err) = &result {
            debug!(error = %err, "journal needs rollback");
            self.pending_rollback = true;
        }
        result
    }

    fn insert_row(&mut self, table: &Table, mut row: Row) -> Result<RowId> {
        if row.is_dummy() {
            row.set_id(self.store.next_row_id());
        } else {
            self.store.observe_row_id(row.id());
        }
        if self.store.cache().contains(row.id()) {
            return Err(Error::invalid_state(format!(
                "Row {} already exists",
                row.id()
            )));
        }
        self.assign_auto_increment(table, &mut row)?;
        ConstraintChecker::check_not_null(table, &row)?;
        ConstraintChecker::check_foreign_keys_for_insert(
            self.schema,
            self.store,
            table,
            core::slice::from_ref(&row),
            ConstraintTiming::Immediate,
        )?;
        let id = row.id();
        self.modify_row(table, (None, Some(row)))?;
        Ok(id)
    }

    fn update_row(&mut self, table: &Table, row: Row) -> Result<()> {
        let before = self
            .store
            .cache()
            .get(row.id())
            .ok_or_else(|| Error::row_not_found(table.name(), row.id()))?;
        let before = Row::clone(&before);
        ConstraintChecker::check_not_null(table, &row)?;
        ConstraintChecker::check_foreign_keys_for_update(
            self.schema,
            self.store,
            table,
            &[(before.clone(), row.clone())],
            ConstraintTiming::Immediate,
        )?;

        let cascades = ConstraintChecker::cascade_updates(self.schema, self.store, table, &before, &row)?;
        for CascadeUpdate { table: child, .. } in &cascades {
            self.assert_scope(child)?;
        }
        self.modify_row(table, (Some(before), Some(row)))?;
        for CascadeUpdate { table: child, before, after } in cascades {
            let child = self.schema.table(&child)?;
            self.modify_row(child, (Some(before), Some(after)))?;
        }
        Ok(())
    }

    /// Applies one modification to indices and cache and records it.
    fn modify_row(&mut self, table: &Table, modification: Modification) -> Result<()> {
        InMemoryUpdater::check_unique(self.store, table, &modification)?;
        InMemoryUpdater::apply(self.store, table, core::slice::from_ref(&modification))?;

        let pos = match self.diff_positions.get(table.name()) {
            Some(&pos) => pos,
            None => {
                self.table_diffs.push(TableDiff::new(table.name()));
                let pos = self.table_diffs.len() - 1;
                self.diff_positions.insert(table.name().to_string(), pos);
                pos
            }
        };
        let diff = &mut self.table_diffs[pos];
        match modification {
            (None, Some(after)) => diff.add(after),
            (Some(before), Some(after)) => diff.modify(before, after),
            (Some(before), None) => diff.delete(before),
            (None, None) => {}
        }
        Ok(())
    }

    fn existing_by_primary_key(&self, table: &Table, row: &Row) -> Result<Option<RowId>> {
        let Some(pk) = table.primary_key() else {
            return Ok(None);
        };
        let index = self.store.indices().index(&pk.normalized_name())?;
        Ok(index.get(&table.index_key(pk, row)).first().copied())
    }

    fn assign_auto_increment(&self, table: &Table, row: &mut Row) -> Result<()> {
        let Some(pk) = table.primary_key().filter(|pk| pk.has_auto_increment()) else {
            return Ok(());
        };
        let column = table.column(&pk.columns()[0].name)?;
        let pos = column.index();
        let unset = match row.get(pos) {
            Some(Value::Null) | None => true,
            Some(Value::Int32(0)) | Some(Value::Int64(0)) => true,
            _ => false,
        };
        if !unset {
            return Ok(());
        }
        let index = self.store.indices().index(&pk.normalized_name())?;
        let next = index.stats().max_key_encountered() + 1;
        let value = match column.data_type() {
            DataType::Int32 => Value::Int32(next as i32),
            _ => Value::Int64(next),
        };
        trace!(table = table.name(), key = next, "auto increment");
        row.set(pos, value);
        Ok(())
    }
}

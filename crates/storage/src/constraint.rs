//! Constraint checking.
//!
//! Not-null checks look at a single row. Foreign key checks consult the
//! indices: the parent side through the index over the referenced column,
//! the child side through the index every foreign key creates on its
//! child column.

use crate::diff::TableDiff;
use crate::store::Store;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use strata_core::schema::{ConstraintTiming, ForeignKey, IndexDef, Schema, Table};
use strata_core::{Error, Result, Row, RowId, Value};

/// Rows removed by a cascading delete, grouped by table, with the order
/// the tables must be processed in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CascadeDeletes {
    pub rows: BTreeMap<String, Vec<Row>>,
    /// Referencing tables come before the tables they reference.
    pub order: Vec<String>,
}

/// A child row rewritten because the parent key it references changed.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeUpdate {
    pub table: String,
    pub before: Row,
    pub after: Row,
}

/// Constraint checker for validating database constraints.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks the not-null constraint for a row.
    pub fn check_not_null(table: &Table, row: &Row) -> Result<()> {
        for col_name in table.constraints().not_nullable() {
            let Some(pos) = table.get_column_index(col_name) else {
                continue;
            };
            if row.get(pos).map_or(true, Value::is_null) {
                return Err(Error::null_constraint(format!("{}.{}", table.name(), col_name)));
            }
        }
        Ok(())
    }

    /// Checks that every row references an existing parent, for the
    /// foreign keys of `table` checked at `timing`.
    pub fn check_foreign_keys_for_insert(
        schema: &Schema,
        store: &Store,
        table: &Table,
        rows: &[Row],
        timing: ConstraintTiming,
    ) -> Result<()> {
        for fk in table.constraints().foreign_keys() {
            if !fk.checks_child_at(timing) {
                continue;
            }
            let pos = column_position(table, &fk.child_column)?;
            for row in rows {
                Self::check_parent_exists(schema, store, fk, row.get(pos))?;
            }
        }
        Ok(())
    }

    /// Checks updated rows against the foreign keys of `table` (the new
    /// value must have a parent) and against the foreign keys referencing
    /// `table` (a referenced value must not change while children use it).
    pub fn check_foreign_keys_for_update(
        schema: &Schema,
        store: &Store,
        table: &Table,
        modifications: &[(Row, Row)],
        timing: ConstraintTiming,
    ) -> Result<()> {
        for fk in table.constraints().foreign_keys() {
            if !fk.checks_child_at(timing) {
                continue;
            }
            let pos = column_position(table, &fk.child_column)?;
            for (before, after) in modifications {
                if before.get(pos) != after.get(pos) {
                    Self::check_parent_exists(schema, store, fk, after.get(pos))?;
                }
            }
        }

        for fk in schema.foreign_keys_referencing(table.name()) {
            if !fk.restricts_parent_at(timing) {
                continue;
            }
            let pos = column_position(table, &fk.parent_column)?;
            for (before, after) in modifications {
                if before.get(pos) != after.get(pos) {
                    Self::check_no_children(store, fk, before.get(pos), &BTreeSet::new())?;
                }
            }
        }
        Ok(())
    }

    /// Checks that no row outside `deleting` references one of `rows`.
    pub fn check_foreign_keys_for_delete(
        schema: &Schema,
        store: &Store,
        table: &Table,
        rows: &[Row],
        deleting: &BTreeSet<RowId>,
        timing: ConstraintTiming,
    ) -> Result<()> {
        for fk in schema.foreign_keys_referencing(table.name()) {
            if !fk.restricts_parent_at(timing) {
                continue;
            }
            let pos = column_position(table, &fk.parent_column)?;
            for row in rows {
                Self::check_no_children(store, fk, row.get(pos), deleting)?;
            }
        }
        Ok(())
    }

    /// Re-validates every deferrable foreign key against the net effect of
    /// `diffs`, which has already been applied to `store`.
    pub fn check_deferred(
        schema: &Schema,
        store: &Store,
        diffs: &[TableDiff],
    ) -> Result<()> {
        let timing = ConstraintTiming::Deferrable;
        for diff in diffs {
            let name = diff.table_name();
            let table = schema.table(name)?;

            let written: Vec<Row> = diff
                .added()
                .chain(diff.modified().map(|(_, after)| after))
                .cloned()
                .collect();
            Self::check_foreign_keys_for_insert(schema, store, table, &written, timing)?;

            for fk in schema.foreign_keys_referencing(name) {
                if !fk.restricts_parent_at(timing) {
                    continue;
                }
                let pos = column_position(table, &fk.parent_column)?;
                let released = diff
                    .deleted()
                    .filter_map(|row| row.get(pos))
                    .chain(diff.modified().filter_map(|(before, after)| {
                        let old = before.get(pos);
                        if old != after.get(pos) {
                            old
                        } else {
                            None
                        }
                    }));
                for value in released {
                    // Another row may own the key by now.
                    if parent_contains(schema, store, fk, value)? {
                        continue;
                    }
                    Self::check_no_children(store, fk, Some(value), &BTreeSet::new())?;
                }
            }
        }
        Ok(())
    }

    /// The child rows to rewrite when `before` becomes `after` in `table`,
    /// for every cascading foreign key whose referenced column changed.
    pub fn cascade_updates(
        schema: &Schema,
        store: &Store,
        table: &Table,
        before: &Row,
        after: &Row,
    ) -> Result<Vec<CascadeUpdate>> {
        let mut out = Vec::new();
        for fk in schema.foreign_keys_referencing(table.name()) {
            if !fk.is_cascade() {
                continue;
            }
            let pos = column_position(table, &fk.parent_column)?;
            let (Some(old), Some(new)) = (before.get(pos), after.get(pos)) else {
                continue;
            };
            if old == new {
                continue;
            }
            let child = schema.table(&fk.child_table)?;
            let child_pos = column_position(child, &fk.child_column)?;
            for id in children_of(store, fk, old)? {
                let Some(current) = store.cache().get(id) else {
                    continue;
                };
                let mut updated = Row::clone(&current);
                updated.set(child_pos, new.clone());
                out.push(CascadeUpdate {
                    table: fk.child_table.clone(),
                    before: Row::clone(&current),
                    after: updated,
                });
            }
        }
        Ok(out)
    }

    /// Every row that deleting `rows` from `table` removes, following
    /// cascading foreign keys transitively.
    pub fn cascade_deletes(
        schema: &Schema,
        store: &Store,
        table: &Table,
        rows: Vec<Row>,
    ) -> Result<CascadeDeletes> {
        let mut seen: BTreeSet<RowId> = rows.iter().map(Row::id).collect();
        let mut grouped: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        let mut pending: Vec<(String, Row)> =
            rows.into_iter().map(|r| (table.name().to_string(), r)).collect();
        // Edges (child table, parent table) discovered through cascades.
        let mut edges: BTreeSet<(String, String)> = BTreeSet::new();

        while let Some((name, row)) = pending.pop() {
            let owner = schema.table(&name)?;
            for fk in schema.foreign_keys_referencing(&name) {
                if !fk.is_cascade() {
                    continue;
                }
                let pos = column_position(owner, &fk.parent_column)?;
                let Some(value) = row.get(pos) else {
                    continue;
                };
                for id in children_of(store, fk, value)? {
                    if !seen.insert(id) {
                        continue;
                    }
                    if let Some(child) = store.cache().get(id) {
                        edges.insert((fk.child_table.clone(), name.clone()));
                        pending.push((fk.child_table.clone(), Row::clone(&child)));
                    }
                }
            }
            grouped.entry(name).or_default().push(row);
        }

        for rows in grouped.values_mut() {
            rows.sort_by_key(Row::id);
        }
        let order = deletion_order(grouped.keys().cloned().collect(), &edges);
        Ok(CascadeDeletes {
            rows: grouped,
            order,
        })
    }

    fn check_parent_exists(
        schema: &Schema,
        store: &Store,
        fk: &ForeignKey,
        value: Option<&Value>,
    ) -> Result<()> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(());
        };
        if parent_contains(schema, store, fk, value)? {
            return Ok(());
        }
        Err(Error::foreign_key(
            &fk.name,
            format!(
                "Referenced key {} does not exist in {}.{}",
                value, fk.parent_table, fk.parent_column
            ),
        ))
    }

    fn check_no_children(
        store: &Store,
        fk: &ForeignKey,
        value: Option<&Value>,
        deleting: &BTreeSet<RowId>,
    ) -> Result<()> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(());
        };
        let referencing = children_of(store, fk, value)?
            .into_iter()
            .filter(|id| !deleting.contains(id))
            .count();
        if referencing == 0 {
            return Ok(());
        }
        Err(Error::foreign_key(
            &fk.name,
            format!(
                "Key {} is referenced by {} rows in {}",
                value, referencing, fk.child_table
            ),
        ))
    }
}

fn column_position(table: &Table, column: &str) -> Result<usize> {
    table
        .get_column_index(column)
        .ok_or_else(|| Error::column_not_found(table.name(), column))
}

/// The single-column index over the referenced parent column.
fn parent_index<'s>(schema: &'s Schema, fk: &ForeignKey) -> Result<&'s IndexDef> {
    schema
        .table(&fk.parent_table)?
        .indices()
        .iter()
        .find(|def| def.columns().len() == 1 && def.columns()[0].name == fk.parent_column)
        .ok_or_else(|| Error::index_not_found(format!("{}.{}", fk.parent_table, fk.parent_column)))
}

fn parent_contains(schema: &Schema, store: &Store, fk: &ForeignKey, value: &Value) -> Result<bool> {
    let def = parent_index(schema, fk)?;
    let index = store.indices().index(&def.normalized_name())?;
    Ok(index.contains_key(&[value.clone()]))
}

fn children_of(store: &Store, fk: &ForeignKey, value: &Value) -> Result<Vec<RowId>> {
    let index = store
        .indices()
        .index(&format!("{}.{}", fk.child_table, fk.name))?;
    Ok(index.get(&[value.clone()]))
}

/// Orders `tables` so each table comes before every table it references.
fn deletion_order(tables: Vec<String>, edges: &BTreeSet<(String, String)>) -> Vec<String> {
    let mut remaining = tables;
    let mut order = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        // A table is ready once nothing left still references it.
        let ready = remaining.iter().position(|t| {
            !edges
                .iter()
                .any(|(child, parent)| parent == t && child != t && remaining.contains(child))
        });
        let next = ready.unwrap_or(0);
        order.push(remaining.remove(next));
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::InMemoryUpdater;
    use strata_core::schema::{ConstraintAction, TableBuilder};
    use strata_core::DataType;

    fn schema(action: ConstraintAction, timing: ConstraintTiming) -> Schema {
        let region = TableBuilder::new("Region")
            .unwrap()
            .add_column("id", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        let country = TableBuilder::new("Country")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("regionId", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_foreign_key_with("fkRegion", "regionId", "Region", "id", action, timing)
            .unwrap()
            .build()
            .unwrap();
        let city = TableBuilder::new("City")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("countryId", DataType::Int64)
            .unwrap()
            .add_nullable(&["countryId"])
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_foreign_key_with("fkCountry", "countryId", "Country", "id", action, timing)
            .unwrap()
            .build()
            .unwrap();
        Schema::new()
            .add_table(region)
            .unwrap()
            .add_table(country)
            .unwrap()
            .add_table(city)
            .unwrap()
    }

    fn load(schema: &Schema) -> Store {
        let mut store = Store::new(schema);
        let rows = [
            ("Region", Row::new(1, vec![Value::from("eu")])),
            ("Country", Row::new(2, vec![Value::Int64(10), Value::from("eu")])),
            ("City", Row::new(3, vec![Value::Int64(100), Value::Int64(10)])),
            ("City", Row::new(4, vec![Value::Int64(101), Value::Int64(10)])),
        ];
        for (name, row) in rows {
            let table = schema.table(name).unwrap();
            InMemoryUpdater::apply(&mut store, table, &[(None, Some(row))]).unwrap();
        }
        store
    }

    #[test]
    fn test_not_null() {
        let s = schema(ConstraintAction::Restrict, ConstraintTiming::Immediate);
        let country = s.table("Country").unwrap();
        let bad = Row::new(9, vec![Value::Int64(1), Value::Null]);
        assert_eq!(
            ConstraintChecker::check_not_null(country, &bad),
            Err(Error::null_constraint("Country.regionId"))
        );
        let city = s.table("City").unwrap();
        let ok = Row::new(9, vec![Value::Int64(1), Value::Null]);
        assert!(ConstraintChecker::check_not_null(city, &ok).is_ok());
    }

    #[test]
    fn test_insert_requires_parent() {
        let s = schema(ConstraintAction::Restrict, ConstraintTiming::Immediate);
        let store = load(&s);
        let country = s.table("Country").unwrap();
        let orphan = Row::new(9, vec![Value::Int64(11), Value::from("asia")]);
        let err = ConstraintChecker::check_foreign_keys_for_insert(
            &s,
            &store,
            country,
            &[orphan.clone()],
            ConstraintTiming::Immediate,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ForeignKeyViolation { ref constraint, .. } if constraint == "fkRegion"));

        // Deferrable keys are not checked immediately.
        assert!(ConstraintChecker::check_foreign_keys_for_insert(
            &s,
            &store,
            country,
            &[orphan],
            ConstraintTiming::Deferrable,
        )
        .is_ok());
    }

    #[test]
    fn test_cascading_key_checks_child_side() {
        let s = schema(ConstraintAction::Cascade, ConstraintTiming::Immediate);
        let store = load(&s);
        let country = s.table("Country").unwrap();
        let orphan = Row::new(9, vec![Value::Int64(11), Value::from("asia")]);
        assert!(matches!(
            ConstraintChecker::check_foreign_keys_for_insert(
                &s,
                &store,
                country,
                &[orphan],
                ConstraintTiming::Immediate,
            ),
            Err(Error::ForeignKeyViolation { .. })
        ));

        let row = Row::new(2, vec![Value::Int64(10), Value::from("eu")]);
        let moved = Row::new(2, vec![Value::Int64(10), Value::from("asia")]);
        assert!(ConstraintChecker::check_foreign_keys_for_update(
            &s,
            &store,
            country,
            &[(row.clone(), moved)],
            ConstraintTiming::Immediate,
        )
        .is_err());

        // Renumbering the parent side is left to the cascade.
        let renumbered = Row::new(2, vec![Value::Int64(12), Value::from("eu")]);
        assert!(ConstraintChecker::check_foreign_keys_for_update(
            &s,
            &store,
            country,
            &[(row, renumbered)],
            ConstraintTiming::Immediate,
        )
        .is_ok());
    }

    #[test]
    fn test_delete_and_update_of_referenced_parent() {
        let s = schema(ConstraintAction::Restrict, ConstraintTiming::Immediate);
        let store = load(&s);
        let country = s.table("Country").unwrap();
        let row = Row::new(2, vec![Value::Int64(10), Value::from("eu")]);

        let err = ConstraintChecker::check_foreign_keys_for_delete(
            &s,
            &store,
            country,
            &[row.clone()],
            &BTreeSet::new(),
            ConstraintTiming::Immediate,
        );
        assert!(err.is_err());

        let moved = Row::new(2, vec![Value::Int64(12), Value::from("eu")]);
        let err = ConstraintChecker::check_foreign_keys_for_update(
            &s,
            &store,
            country,
            &[(row.clone(), moved)],
            ConstraintTiming::Immediate,
        );
        assert!(err.is_err());

        // Changing a non-key column is fine.
        let same_key = Row::new(2, vec![Value::Int64(10), Value::from("eu")]);
        assert!(ConstraintChecker::check_foreign_keys_for_update(
            &s,
            &store,
            country,
            &[(row, same_key)],
            ConstraintTiming::Immediate,
        )
        .is_ok());
    }

    #[test]
    fn test_cascade_deletes_are_transitive_and_ordered() {
        let s = schema(ConstraintAction::Cascade, ConstraintTiming::Immediate);
        let store = load(&s);
        let region = s.table("Region").unwrap();
        let result = ConstraintChecker::cascade_deletes(
            &s,
            &store,
            region,
            vec![Row::new(1, vec![Value::from("eu")])],
        )
        .unwrap();

        assert_eq!(result.order, vec!["City", "Country", "Region"]);
        let city_ids: Vec<RowId> = result.rows["City"].iter().map(Row::id).collect();
        assert_eq!(city_ids, vec![3, 4]);
        assert_eq!(result.rows["Country"].len(), 1);
    }

    #[test]
    fn test_cascade_updates_rewrite_children() {
        let s = schema(ConstraintAction::Cascade, ConstraintTiming::Immediate);
        let store = load(&s);
        let country = s.table("Country").unwrap();
        let before = Row::new(2, vec![Value::Int64(10), Value::from("eu")]);
        let after = Row::new(2, vec![Value::Int64(20), Value::from("eu")]);

        let updates = ConstraintChecker::cascade_updates(&s, &store, country, &before, &after).unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.table == "City"));
        assert!(updates.iter().all(|u| u.after.get(1) == Some(&Value::Int64(20))));
    }

    #[test]
    fn test_deletion_order_with_unrelated_tables() {
        let edges = BTreeSet::from([("B".to_string(), "A".to_string())]);
        let order = deletion_order(vec!["A".into(), "B".into(), "C".into()], &edges);
        assert_eq!(order, vec!["B", "A", "C"]);
    }
}

//! Journal scenarios across several tables.

use proptest::prelude::*;
use strata_core::schema::{ConstraintAction, ConstraintTiming, Schema, TableBuilder};
use strata_core::{DataType, Error, Row, RowId, Value};
use strata_storage::{Journal, Store};

/// Department <- Employee <- Badge, all cascading; Project restricts.
fn company() -> Schema {
    let department = TableBuilder::new("Department")
        .unwrap()
        .add_column("id", DataType::Int64)
        .unwrap()
        .add_column("name", DataType::String)
        .unwrap()
        .add_primary_key(&["id"], false)
        .unwrap()
        .build()
        .unwrap();
    let employee = TableBuilder::new("Employee")
        .unwrap()
        .add_column("id", DataType::Int64)
        .unwrap()
        .add_column("deptId", DataType::Int64)
        .unwrap()
        .add_primary_key(&["id"], false)
        .unwrap()
        .add_foreign_key_with(
            "fkDept",
            "deptId",
            "Department",
            "id",
            ConstraintAction::Cascade,
            ConstraintTiming::Immediate,
        )
        .unwrap()
        .build()
        .unwrap();
    let badge = TableBuilder::new("Badge")
        .unwrap()
        .add_column("id", DataType::Int64)
        .unwrap()
        .add_column("empId", DataType::Int64)
        .unwrap()
        .add_primary_key(&["id"], false)
        .unwrap()
        .add_foreign_key_with(
            "fkEmp",
            "empId",
            "Employee",
            "id",
            ConstraintAction::Cascade,
            ConstraintTiming::Immediate,
        )
        .unwrap()
        .build()
        .unwrap();
    let project = TableBuilder::new("Project")
        .unwrap()
        .add_column("id", DataType::Int64)
        .unwrap()
        .add_column("deptId", DataType::Int64)
        .unwrap()
        .add_primary_key(&["id"], false)
        .unwrap()
        .add_foreign_key("fkProjectDept", "deptId", "Department", "id")
        .unwrap()
        .build()
        .unwrap();
    Schema::new()
        .add_table(department)
        .unwrap()
        .add_table(employee)
        .unwrap()
        .add_table(badge)
        .unwrap()
        .add_table(project)
        .unwrap()
}

const ALL: &[&str] = &["Department", "Employee", "Badge", "Project"];

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|v| Value::Int64(*v)).collect()
}

fn seed(schema: &Schema, store: &mut Store) -> Vec<RowId> {
    let mut j = Journal::new(schema, store, ALL).unwrap();
    let d1 = j.create_row(vec![Value::Int64(1), Value::from("R&D")]);
    let d2 = j.create_row(vec![Value::Int64(2), Value::from("Sales")]);
    let depts = j.insert("Department", vec![d1, d2]).unwrap();
    let emps: Vec<Row> = [(10, 1), (11, 1), (12, 2)]
        .iter()
        .map(|(id, dept)| j.create_row(ints(&[*id, *dept])))
        .collect();
    j.insert("Employee", emps).unwrap();
    let badges: Vec<Row> = [(100, 10), (101, 11), (102, 12)]
        .iter()
        .map(|(id, emp)| j.create_row(ints(&[*id, *emp])))
        .collect();
    j.insert("Badge", badges).unwrap();
    j.commit().unwrap();
    depts
}

#[test]
fn cascade_delete_removes_dependents_transitively() {
    let schema = company();
    let mut store = Store::new(&schema);
    let depts = seed(&schema, &mut store);

    let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
    j.remove("Department", &depts[..1]).unwrap();
    assert_eq!(j.diff("Employee").unwrap().deleted().count(), 2);
    assert_eq!(j.diff("Badge").unwrap().deleted().count(), 2);
    j.commit().unwrap();

    assert_eq!(store.cache().count("Department"), 1);
    assert_eq!(store.cache().count("Employee"), 1);
    assert_eq!(store.cache().count("Badge"), 1);
    let fk = store.indices().index("Badge.fkEmp").unwrap();
    assert!(!fk.contains_key(&[Value::Int64(10)]));
    assert!(fk.contains_key(&[Value::Int64(12)]));
}

#[test]
fn cascade_delete_needs_every_table_in_scope() {
    let schema = company();
    let mut store = Store::new(&schema);
    let depts = seed(&schema, &mut store);

    let mut j = Journal::new(&schema, &mut store, &["Department", "Employee"]).unwrap();
    assert_eq!(
        j.remove("Department", &depts[..1]),
        Err(Error::scope_violation("Badge"))
    );
    j.rollback().unwrap();
    assert_eq!(store.cache().count("Employee"), 3);
}

#[test]
fn restricting_key_blocks_delete() {
    let schema = company();
    let mut store = Store::new(&schema);
    let depts = seed(&schema, &mut store);

    let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
    let p = j.create_row(ints(&[7, 2]));
    j.insert("Project", vec![p]).unwrap();
    let err = j.remove("Department", &depts[1..2]).unwrap_err();
    assert!(err.is_constraint_violation());
    j.rollback().unwrap();

    assert_eq!(store.cache().count("Project"), 0);
    assert_eq!(store.cache().count("Employee"), 3);
    assert_eq!(store.cache().count("Badge"), 3);
}

#[test]
fn cascade_update_rewrites_children() {
    let schema = company();
    let mut store = Store::new(&schema);
    let depts = seed(&schema, &mut store);

    let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
    let renumbered = Row::new(depts[0], vec![Value::Int64(5), Value::from("R&D")]);
    j.update("Department", vec![renumbered]).unwrap();
    j.commit().unwrap();

    let fk = store.indices().index("Employee.fkDept").unwrap();
    assert_eq!(fk.get(&[Value::Int64(5)]).len(), 2);
    assert!(fk.get(&[Value::Int64(1)]).is_empty());
}

#[test]
fn cascading_key_still_requires_parent() {
    let schema = company();
    let mut store = Store::new(&schema);
    seed(&schema, &mut store);

    let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
    let orphan = j.create_row(ints(&[13, 999]));
    let err = j.insert("Employee", vec![orphan]).unwrap_err();
    assert!(matches!(err, Error::ForeignKeyViolation { ref constraint, .. } if constraint == "fkDept"));
    j.rollback().unwrap();
    assert_eq!(store.cache().count("Employee"), 3);

    let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
    let id = j.store().indices().index("Employee.pkEmployee").unwrap().get(&[Value::Int64(10)])[0];
    let moved = Row::new(id, ints(&[10, 999]));
    let err = j.update("Employee", vec![moved]).unwrap_err();
    assert!(matches!(err, Error::ForeignKeyViolation { ref constraint, .. } if constraint == "fkDept"));
    j.rollback().unwrap();

    let fk = store.indices().index("Employee.fkDept").unwrap();
    assert!(fk.get(&[Value::Int64(999)]).is_empty());
    assert_eq!(fk.get(&[Value::Int64(1)]).len(), 2);
}

#[test]
fn diffs_follow_first_touch_order() {
    let schema = company();
    let mut store = Store::new(&schema);
    let depts = seed(&schema, &mut store);

    let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
    let project = j.create_row(ints(&[7, 1]));
    j.insert("Project", vec![project]).unwrap();
    let renamed = Row::new(depts[1], vec![Value::Int64(2), Value::from("Marketing")]);
    j.update("Department", vec![renamed]).unwrap();
    let badge = j.create_row(ints(&[103, 12]));
    j.insert("Badge", vec![badge]).unwrap();
    let project = j.create_row(ints(&[8, 2]));
    j.insert("Project", vec![project]).unwrap();

    let order: Vec<&str> = j.diffs().iter().map(|d| d.table_name()).collect();
    assert_eq!(order, vec!["Project", "Department", "Badge"]);
    assert_eq!(j.diff("Project").unwrap().added().count(), 2);

    j.rollback().unwrap();
    assert_eq!(store.cache().count("Project"), 0);
    assert_eq!(store.cache().count("Badge"), 3);
    let sales = store.cache().get(depts[1]).unwrap();
    assert_eq!(sales.get(1), Some(&Value::from("Sales")));
}

proptest! {
    /// Whatever a journal does, rolling it back restores cache and indices.
    #[test]
    fn rollback_restores_state(ops in prop::collection::vec((0u8..3, 0i64..20), 1..40)) {
        let schema = company();
        let mut store = Store::new(&schema);
        seed(&schema, &mut store);
        let before_rows: Vec<Vec<Value>> = store
            .cache()
            .get_table_rows("Department")
            .iter()
            .map(|r| r.values().to_vec())
            .collect();
        let before_keys = store.indices().index("Department.pkDepartment").unwrap().len();

        {
            let mut j = Journal::new(&schema, &mut store, ALL).unwrap();
            for (op, key) in ops {
                let existing = j
                    .store()
                    .indices()
                    .index("Department.pkDepartment")
                    .unwrap()
                    .get(&[Value::Int64(key)]);
                let result = match (op, existing.first()) {
                    (0, _) => {
                        let row = j.create_row(vec![Value::Int64(key), Value::from("x")]);
                        j.insert("Department", vec![row]).map(|_| ())
                    }
                    (1, Some(id)) => j.update(
                        "Department",
                        vec![Row::new(*id, vec![Value::Int64(key), Value::from("y")])],
                    ),
                    (_, Some(id)) => j.remove("Department", &[*id]),
                    _ => Ok(()),
                };
                if result.is_err() {
                    break;
                }
            }
            j.rollback().unwrap();
        }

        let after_rows: Vec<Vec<Value>> = store
            .cache()
            .get_table_rows("Department")
            .iter()
            .map(|r| r.values().to_vec())
            .collect();
        prop_assert_eq!(before_rows, after_rows);
        prop_assert_eq!(
            store.indices().index("Department.pkDepartment").unwrap().len(),
            before_keys
        );
        prop_assert_eq!(store.cache().count("Employee"), 3);
        prop_assert_eq!(store.cache().count("Badge"), 3);
    }
}

//! Order-by-index pass - serves ORDER BY from an index.
//!
//! When the sort keys are exactly the columns of an index, in the index's
//! order or its complete reverse, the rows can be read from the index in
//! that order and the `order_by` node goes away:
//!
//! ```text
//! order_by(T.id DESC)                 table_access_by_row_id(T)
//!       |                  =>                 |
//! table_access(T)               index_range_scan(T.pkT, [unbound, unbound], reverse)
//! ```
//!
//! An existing index range scan on the same index only has its direction
//! set. The rewrite is skipped when anything other than selects sits
//! between the `order_by` and the scan, or when the scan is a union of
//! several range scans.
//!
//! Indices keep null keys ahead of every other key whatever the column
//! order, while ORDER BY puts nulls first only for ascending keys. A
//! nullable sort column is therefore only served by an index that orders
//! it ascending; a reverse scan of such an index puts the nulls last,
//! as a descending sort does.

use crate::ast::ColumnRef;
use crate::context::{OrderKey, Projection, TableRef};
use crate::optimizer::{OptimizerContext, OptimizerPass};
use crate::planner::{IndexRangeScan, PlanNode, PlanTree};
use crate::tree::NodeId;
use alloc::vec::Vec;
use strata_core::schema::{IndexDef, Order};
use strata_core::Result;
use strata_index::SingleKeyRange;
use tracing::debug;

/// Pass that removes `order_by` nodes an index scan can satisfy.
pub struct OrderByIndexPass;

impl OptimizerPass for OrderByIndexPass {
    fn optimize(&self, mut plan: PlanTree, ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        let order_bys = plan.find(plan.root(), |n| matches!(n, PlanNode::OrderBy { .. }), |_| false);
        for order_by in order_bys {
            let PlanNode::OrderBy { keys } = plan.get(order_by).clone() else {
                continue;
            };
            let Some(columns) = sort_columns(&keys) else {
                continue;
            };
            let Some(source) = source_below(&plan, order_by) else {
                continue;
            };
            if apply(&mut plan, source, &columns, ctx)? {
                debug!(keys = keys.len(), "order_by served by index");
                plan.remove_node(order_by);
            }
        }
        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "order_by_index"
    }
}

/// The keys as plain columns of one table.
fn sort_columns(keys: &[OrderKey]) -> Option<Vec<(&ColumnRef, Order)>> {
    let mut columns = Vec::with_capacity(keys.len());
    for key in keys {
        let Projection::Column(c) = &key.key else {
            return None;
        };
        columns.push((c, key.order));
    }
    let first = columns.first()?.0;
    columns.iter().all(|(c, _)| c.scope() == first.scope()).then_some(columns)
}

/// The first node below `order_by` that is not a select.
fn source_below(plan: &PlanTree, order_by: NodeId) -> Option<NodeId> {
    let mut node = plan.child_at(order_by, 0)?;
    while plan.get(node).is_select() {
        node = plan.child_at(node, 0)?;
    }
    Some(node)
}

/// `Some(reverse)` if scanning `def` (reversed or not) yields the order.
fn scan_direction(def: &IndexDef, columns: &[(&ColumnRef, Order)]) -> Option<bool> {
    let indexed = def.columns();
    if indexed.len() != columns.len()
        || indexed.iter().zip(columns).any(|(i, (c, _))| i.name != c.column)
    {
        return None;
    }
    if indexed.iter().zip(columns).any(|(i, (c, _))| c.nullable && i.order == Order::Desc) {
        return None;
    }
    if indexed.iter().zip(columns).all(|(i, (_, o))| i.order == *o) {
        Some(false)
    } else if indexed.iter().zip(columns).all(|(i, (_, o))| i.order.reverse() == *o) {
        Some(true)
    } else {
        None
    }
}

fn apply(
    plan: &mut PlanTree,
    source: NodeId,
    columns: &[(&ColumnRef, Order)],
    ctx: &OptimizerContext<'_>,
) -> Result<bool> {
    let scope = columns[0].0.scope();
    match plan.get(source).clone() {
        PlanNode::TableAccessByRowId { table } if table.scope() == scope => {
            let Some(scan_node) = plan.child_at(source, 0) else {
                return Ok(false);
            };
            let PlanNode::IndexRangeScan(mut scan) = plan.get(scan_node).clone() else {
                // A multi-range scan has no single global order.
                return Ok(false);
            };
            let def = index_def(ctx, &table, &scan.index)?;
            let Some(reverse) = def.and_then(|d| scan_direction(d, columns)) else {
                return Ok(false);
            };
            scan.reverse = reverse;
            plan.replace_value(scan_node, PlanNode::IndexRangeScan(scan));
            Ok(true)
        }
        PlanNode::TableAccess { table } if table.scope() == scope => {
            let schema_table = ctx.schema.table(&table.table)?;
            let found = schema_table
                .indices()
                .iter()
                .find_map(|def| scan_direction(def, columns).map(|reverse| (def, reverse)));
            let Some((def, reverse)) = found else {
                return Ok(false);
            };
            let scan = PlanNode::IndexRangeScan(IndexRangeScan {
                table: table.clone(),
                index: def.normalized_name(),
                ranges: def.columns().iter().map(|_| SingleKeyRange::all()).collect(),
                reverse,
            });
            plan.replace_value(source, PlanNode::TableAccessByRowId { table });
            plan.push_child(source, scan);
            Ok(true)
        }
        _ => Ok(false),
    }
}

fn index_def<'a>(ctx: &OptimizerContext<'a>, table: &TableRef, normalized: &str) -> Result<Option<&'a IndexDef>> {
    Ok(ctx
        .schema
        .table(&table.table)?
        .indices()
        .iter()
        .find(|def| def.normalized_name() == normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::col;
    use crate::optimizer::test_support::{employee_schema, run_pass};
    use alloc::string::ToString;

    fn order_plan(keys: Vec<OrderKey>, below: PlanNode) -> (PlanTree, NodeId) {
        let mut plan = PlanTree::new(PlanNode::Project { columns: Vec::new() });
        let order_by = plan.push_child(plan.root(), PlanNode::OrderBy { keys });
        let node = plan.push_child(order_by, below);
        (plan, node)
    }

    fn key(c: &ColumnRef, order: Order) -> OrderKey {
        OrderKey {
            key: Projection::from(c),
            order,
        }
    }

    #[test]
    fn test_synthesized_reverse_scan() {
        let schema = employee_schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let (plan, _) = order_plan(
            alloc::vec![key(&id, Order::Desc)],
            PlanNode::table_access(TableRef::new("Employee")),
        );
        let expected = "project()\n\
                        -table_access_by_row_id(Employee)\n\
                        --index_range_scan(Employee.pkEmployee, [unbound, unbound], reverse)\n";
        let plan = run_pass(&schema, &OrderByIndexPass, plan);
        assert_eq!(plan.to_string(), expected);
        let plan = run_pass(&schema, &OrderByIndexPass, plan);
        assert_eq!(plan.to_string(), expected);
    }

    #[test]
    fn test_existing_scan_direction_is_set() {
        let schema = employee_schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let employee = TableRef::new("Employee");
        let (mut plan, access) = order_plan(
            alloc::vec![key(&id, Order::Desc)],
            PlanNode::TableAccessByRowId {
                table: employee.clone(),
            },
        );
        plan.push_child(
            access,
            PlanNode::IndexRangeScan(IndexRangeScan {
                table: employee,
                index: "Employee.pkEmployee".to_string(),
                ranges: alloc::vec![SingleKeyRange::lower_bound(strata_core::Value::Int64(100), true)],
                reverse: false,
            }),
        );
        let plan = run_pass(&schema, &OrderByIndexPass, plan);
        assert_eq!(
            plan.to_string(),
            "project()\n\
             -table_access_by_row_id(Employee)\n\
             --index_range_scan(Employee.pkEmployee, (100, unbound], reverse)\n"
        );
    }

    #[test]
    fn test_rejections() {
        let schema = employee_schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let employee = TableRef::new("Employee");

        // Multi-range scans stay sorted by order_by.
        let (mut plan, access) = order_plan(
            alloc::vec![key(&id, Order::Asc)],
            PlanNode::TableAccessByRowId {
                table: employee.clone(),
            },
        );
        let multi = plan.push_child(access, PlanNode::MultiIndexRangeScan);
        for v in [1i64, 5] {
            plan.push_child(
                multi,
                PlanNode::IndexRangeScan(IndexRangeScan {
                    table: employee.clone(),
                    index: "Employee.pkEmployee".to_string(),
                    ranges: alloc::vec![SingleKeyRange::only(strata_core::Value::Int64(v))],
                    reverse: false,
                }),
            );
        }
        let before = plan.to_string();
        assert_eq!(run_pass(&schema, &OrderByIndexPass, plan).to_string(), before);

        // Sorting on a column without an index.
        let name = col(&schema, "Employee", "name").unwrap();
        let (plan, _) = order_plan(alloc::vec![key(&name, Order::Asc)], PlanNode::table_access(employee));
        let before = plan.to_string();
        assert_eq!(run_pass(&schema, &OrderByIndexPass, plan).to_string(), before);
    }

    #[test]
    fn test_nullable_column_on_ascending_index() {
        let schema = employee_schema();
        let dept = col(&schema, "Employee", "deptId").unwrap();
        let salary = col(&schema, "Employee", "salary").unwrap();
        assert!(dept.nullable);

        // idx_dept_salary is (deptId ASC, salary DESC), nulls first.
        let (plan, _) = order_plan(
            alloc::vec![key(&dept, Order::Asc), key(&salary, Order::Desc)],
            PlanNode::table_access(TableRef::new("Employee")),
        );
        assert_eq!(
            run_pass(&schema, &OrderByIndexPass, plan).to_string(),
            "project()\n\
             -table_access_by_row_id(Employee)\n\
             --index_range_scan(Employee.idx_dept_salary, [unbound, unbound], [unbound, unbound], natural)\n"
        );

        // Reversed, the nulls come last, as DESC puts them.
        let (plan, _) = order_plan(
            alloc::vec![key(&dept, Order::Desc), key(&salary, Order::Asc)],
            PlanNode::table_access(TableRef::new("Employee")),
        );
        assert!(run_pass(&schema, &OrderByIndexPass, plan)
            .to_string()
            .contains("index_range_scan(Employee.idx_dept_salary, [unbound, unbound], [unbound, unbound], reverse)"));
    }

    #[test]
    fn test_nullable_column_on_descending_index() {
        use strata_core::schema::{Schema, TableBuilder};
        use strata_core::DataType;

        let shift = TableBuilder::new("Shift")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("start", DataType::Int64)
            .unwrap()
            .add_nullable(&["start"])
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_ordered_index("idx_start", &[("start", Order::Desc)], false)
            .unwrap()
            .build()
            .unwrap();
        let schema = Schema::new().add_table(shift).unwrap();
        let start = col(&schema, "Shift", "start").unwrap();

        for order in [Order::Asc, Order::Desc] {
            let (plan, _) = order_plan(
                alloc::vec![key(&start, order)],
                PlanNode::table_access(TableRef::new("Shift")),
            );
            let before = plan.to_string();
            assert_eq!(run_pass(&schema, &OrderByIndexPass, plan).to_string(), before);
        }
    }
}

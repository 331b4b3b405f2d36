//! Plan nodes.
//!
//! The same node type is used before and after optimization: the logical
//! generator only emits the relational steps, and the optimizer swaps in
//! index scans and picks join implementations.

use crate::ast::{AggregateColumn, ColumnRef, JoinPredicate, Predicate};
use crate::context::{JoinType, OrderKey, Projection, TableRef};
use crate::tree::Tree;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use strata_index::KeyRange;

/// A plan: a tree of steps whose root produces the result.
pub type PlanTree = Tree<PlanNode>;

/// Which side of a join a node sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

/// How a join is evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinImpl {
    /// Blocked nested loop. Works for every comparison.
    NestedLoop,
    /// Hash join. Equality only.
    Hash,
    /// Probes `index` with values of the other side. The indexed side is
    /// read from the store, not from its child plan.
    IndexNestedLoop { index: String, indexed: JoinSide },
}

impl fmt::Display for JoinImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinImpl::NestedLoop => "nested_loop",
            JoinImpl::Hash => "hash",
            JoinImpl::IndexNestedLoop { .. } => "index_nested_loop",
        })
    }
}

/// A scan of one index over one combination of per-column ranges.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexRangeScan {
    pub table: TableRef,
    /// Normalized index name, `Table.index`.
    pub index: String,
    /// One range per index column.
    pub ranges: Vec<KeyRange>,
    pub reverse: bool,
}

/// One step of a query plan.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanNode {
    /// Every row of a table.
    TableAccess { table: TableRef },
    /// Rows of a table fetched by the ids its child yields.
    TableAccessByRowId { table: TableRef },
    IndexRangeScan(IndexRangeScan),
    /// Union of its `IndexRangeScan` children.
    MultiIndexRangeScan,
    Select { predicate: Predicate },
    CrossProduct,
    Join {
        join_type: JoinType,
        implementation: JoinImpl,
        predicate: JoinPredicate,
    },
    Project { columns: Vec<Projection> },
    OrderBy { keys: Vec<OrderKey> },
    GroupBy { columns: Vec<ColumnRef> },
    Aggregation { columns: Vec<AggregateColumn> },
    Limit { count: usize },
    Skip { count: usize },
}

impl PlanNode {
    pub fn table_access(table: TableRef) -> Self {
        PlanNode::TableAccess { table }
    }

    pub fn select(predicate: Predicate) -> Self {
        PlanNode::Select { predicate }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, PlanNode::Select { .. })
    }

    pub fn is_table_access(&self) -> bool {
        matches!(self, PlanNode::TableAccess { .. })
    }

    /// Nodes with two inputs.
    pub fn is_binary(&self) -> bool {
        matches!(self, PlanNode::CrossProduct | PlanNode::Join { .. })
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            PlanNode::Select { predicate } => Some(predicate),
            _ => None,
        }
    }
}

fn join_labels<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNode::TableAccess { table } => write!(f, "table_access({})", table),
            PlanNode::TableAccessByRowId { table } => write!(f, "table_access_by_row_id({})", table),
            PlanNode::IndexRangeScan(scan) => write!(
                f,
                "index_range_scan({}, {}, {})",
                scan.index,
                join_labels(&scan.ranges),
                if scan.reverse { "reverse" } else { "natural" }
            ),
            PlanNode::MultiIndexRangeScan => f.write_str("multi_index_range_scan()"),
            PlanNode::Select { predicate } => write!(f, "select({})", predicate),
            PlanNode::CrossProduct => f.write_str("cross_product"),
            PlanNode::Join {
                join_type,
                implementation,
                predicate,
            } => write!(f, "join(type: {}, impl: {}, {})", join_type, implementation, predicate),
            PlanNode::Project { columns } => write!(f, "project({})", join_labels(columns)),
            PlanNode::OrderBy { keys } => write!(f, "order_by({})", join_labels(keys)),
            PlanNode::GroupBy { columns } => write!(f, "group_by({})", join_labels(columns)),
            PlanNode::Aggregation { columns } => write!(f, "aggregation({})", join_labels(columns)),
            PlanNode::Limit { count } => write!(f, "limit({})", count),
            PlanNode::Skip { count } => write!(f, "skip({})", count),
        }
    }
}

/// The table scopes a subtree reads from.
pub fn subtree_tables(plan: &PlanTree, start: crate::tree::NodeId) -> Vec<String> {
    plan.descendants(start)
        .into_iter()
        .filter_map(|id| match plan.get(id) {
            PlanNode::TableAccess { table } | PlanNode::TableAccessByRowId { table } => {
                Some(table.scope().to_string())
            }
            _ => None,
        })
        .collect()
}

/// Compact single-line form, handy in log events.
pub fn plan_summary(plan: &PlanTree) -> String {
    plan.nodes()
        .into_iter()
        .map(|id| format!("{}", plan.get(id)))
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::col;
    use strata_core::schema::{Order, Schema, TableBuilder};
    use strata_core::{DataType, Value};

    fn schema() -> Schema {
        let t = TableBuilder::new("Employee")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap();
        Schema::new().add_table(t).unwrap()
    }

    #[test]
    fn test_labels() {
        let schema = schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let employee = TableRef::new("Employee");

        let scan = PlanNode::IndexRangeScan(IndexRangeScan {
            table: employee.clone(),
            index: "Employee.pkEmployee".to_string(),
            ranges: alloc::vec![KeyRange::lower_bound(Value::Int64(100), true)],
            reverse: false,
        });
        assert_eq!(scan.to_string(), "index_range_scan(Employee.pkEmployee, (100, unbound], natural)");
        assert_eq!(PlanNode::select(id.gt(100i64)).to_string(), "select(value_pred(Employee.id gt 100))");
        assert_eq!(PlanNode::Project { columns: Vec::new() }.to_string(), "project()");
        assert_eq!(
            PlanNode::OrderBy {
                keys: alloc::vec![OrderKey {
                    key: Projection::from(&id),
                    order: Order::Desc
                }]
            }
            .to_string(),
            "order_by(Employee.id DESC)"
        );
        assert_eq!(PlanNode::table_access(employee).to_string(), "table_access(Employee)");
        assert_eq!(PlanNode::Limit { count: 20 }.to_string(), "limit(20)");
    }

    #[test]
    fn test_tree_dump() {
        let mut plan = PlanTree::new(PlanNode::Limit { count: 20 });
        let project = plan.push_child(plan.root(), PlanNode::Project { columns: Vec::new() });
        plan.push_child(project, PlanNode::table_access(TableRef::new("Employee")));
        assert_eq!(plan.to_string(), "limit(20)\n-project()\n--table_access(Employee)\n");
        assert_eq!(subtree_tables(&plan, project), alloc::vec!["Employee".to_string()]);
        assert_eq!(plan_summary(&plan), "limit(20) -> project() -> table_access(Employee)");
    }
}

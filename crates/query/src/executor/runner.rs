//! Plan execution.
//!
//! `QueryRunner` walks a plan tree bottom-up. Every node turns the output
//! of its children into its own output: plain rows, or a list of groups
//! once a `group_by` or `aggregation` has run.

use crate::ast::{AggregateFunc, EvaluatorRegistry};
use crate::config::EngineConfig;
use crate::context::{JoinType, Projection};
use crate::executor::join::{hash_join, index_nested_loop_join, nested_loop_join, IndexLookup, JoinInput};
use crate::executor::{aggregate, sort, EntryIdGenerator, Relation, RelationEntry};
use crate::planner::{plan_summary, IndexRangeScan, JoinImpl, JoinSide, PlanNode, PlanTree};
use crate::tree::NodeId;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use hashbrown::HashMap;
use strata_core::schema::Schema;
use strata_core::{Error, Result, Row, Value};
use strata_storage::Store;
use tracing::{debug, trace};

/// Table name of the relation a projection produces.
pub const PROJECTION_TABLE: &str = "#projection";

/// What flows out of a plan node.
#[derive(Debug)]
enum Output {
    Rows(Relation),
    Groups(Vec<Relation>),
}

/// Executes plans against a store.
pub struct QueryRunner<'a> {
    schema: &'a Schema,
    store: &'a Store,
    config: &'a EngineConfig,
    registry: EvaluatorRegistry,
    ids: EntryIdGenerator,
}

impl<'a> QueryRunner<'a> {
    pub fn new(schema: &'a Schema, store: &'a Store, config: &'a EngineConfig) -> Self {
        Self::with_registry(schema, store, config, EvaluatorRegistry::new())
    }

    /// A runner using custom comparison evaluators.
    pub fn with_registry(
        schema: &'a Schema,
        store: &'a Store,
        config: &'a EngineConfig,
        registry: EvaluatorRegistry,
    ) -> Self {
        Self {
            schema,
            store,
            config,
            registry,
            ids: EntryIdGenerator::new(),
        }
    }

    /// Runs `plan` and returns the rows its root produces.
    pub fn execute(&mut self, plan: &PlanTree) -> Result<Relation> {
        debug!(plan = %plan_summary(plan), "executing plan");
        let output = self.run(plan, plan.root())?;
        let relation = match output {
            Output::Rows(r) => r,
            Output::Groups(groups) => flatten(groups),
        };
        trace!(rows = relation.len(), "plan executed");
        Ok(relation)
    }

    fn run(&mut self, plan: &PlanTree, node: NodeId) -> Result<Output> {
        match plan.get(node) {
            PlanNode::TableAccess { table } => {
                let width = self.schema.table(&table.table)?.columns().len();
                let rows = self.store.cache().get_table_rows(&table.table);
                Ok(Output::Rows(Relation::from_rows(rows, table.scope(), width)))
            }
            PlanNode::IndexRangeScan(scan) => self.index_range_scan(scan).map(Output::Rows),
            PlanNode::MultiIndexRangeScan => {
                let mut scans = Vec::with_capacity(plan.children(node).len());
                for &child in plan.children(node) {
                    scans.push(rows(self.run(plan, child)?)?);
                }
                Relation::union(scans).map(Output::Rows)
            }
            PlanNode::TableAccessByRowId { table } => {
                let ids: Vec<u64> = rows(self.run(plan, child(plan, node, 0)?)?)?
                    .iter()
                    .map(|e| e.row_id())
                    .collect();
                let width = self.schema.table(&table.table)?.columns().len();
                let found = self.store.cache().get_many(&ids).into_iter().flatten().collect();
                Ok(Output::Rows(Relation::from_rows(found, table.scope(), width)))
            }
            PlanNode::Select { predicate } => {
                let input = rows(self.run(plan, child(plan, node, 0)?)?)?;
                predicate.eval(&self.registry, &input).map(Output::Rows)
            }
            PlanNode::CrossProduct => {
                let left = rows(self.run(plan, child(plan, node, 0)?)?)?;
                let right = rows(self.run(plan, child(plan, node, 1)?)?)?;
                let mut output = Relation::combined_layout(&left, &right)?;
                for l in left.iter() {
                    for r in right.iter() {
                        output.push(RelationEntry::combine(&mut self.ids, l, r));
                    }
                }
                Ok(Output::Rows(output))
            }
            PlanNode::Join {
                join_type,
                implementation,
                predicate,
            } => {
                debug!(algorithm = %implementation, join = %predicate, "join");
                let outer = *join_type == JoinType::LeftOuter;
                if let JoinImpl::IndexNestedLoop { index, indexed } = implementation {
                    return self.index_join(plan, node, predicate, index, *indexed, outer).map(Output::Rows);
                }
                let left = rows(self.run(plan, child(plan, node, 0)?)?)?;
                let right = rows(self.run(plan, child(plan, node, 1)?)?)?;
                let input = JoinInput::new(&left, &right, predicate)?;
                let joined = match implementation {
                    JoinImpl::Hash => hash_join(&input, &mut self.ids, outer)?,
                    _ => nested_loop_join(&input, &self.registry, &mut self.ids, outer, self.config.block_size())?,
                };
                Ok(Output::Rows(joined))
            }
            PlanNode::GroupBy { columns } => {
                let input = rows(self.run(plan, child(plan, node, 0)?)?)?;
                let mut positions = Vec::with_capacity(columns.len());
                for c in columns {
                    positions.push(input.require_position(c)?);
                }
                let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
                let mut members: Vec<Vec<RelationEntry>> = Vec::new();
                for entry in input.iter() {
                    let key: Vec<Value> = positions
                        .iter()
                        .map(|p| entry.get_field(*p).cloned().unwrap_or(Value::Null))
                        .collect();
                    let slot = *slots.entry(key).or_insert_with(|| {
                        members.push(Vec::new());
                        members.len() - 1
                    });
                    members[slot].push(entry.clone());
                }
                trace!(groups = members.len(), "grouped");
                Ok(Output::Groups(members.into_iter().map(|m| input.with_entries(m)).collect()))
            }
            PlanNode::Aggregation { columns } => {
                let mut groups = match self.run(plan, child(plan, node, 0)?)? {
                    Output::Rows(r) => alloc::vec![r],
                    Output::Groups(g) => g,
                };
                for group in groups.iter_mut() {
                    aggregate::memoize(columns, group)?;
                }
                Ok(Output::Groups(groups))
            }
            PlanNode::OrderBy { keys } => match self.run(plan, child(plan, node, 0)?)? {
                Output::Rows(mut r) => {
                    sort::sort_entries(&mut r, keys)?;
                    Ok(Output::Rows(r))
                }
                Output::Groups(mut g) => {
                    sort::sort_groups(&mut g, keys)?;
                    Ok(Output::Groups(g))
                }
            },
            PlanNode::Project { columns } => {
                let input = self.run(plan, child(plan, node, 0)?)?;
                self.project(input, columns).map(Output::Rows)
            }
            PlanNode::Skip { count } => {
                let count = *count;
                Ok(match self.run(plan, child(plan, node, 0)?)? {
                    Output::Rows(mut r) => {
                        r.entries.drain(..count.min(r.entries.len()));
                        Output::Rows(r)
                    }
                    Output::Groups(g) => Output::Groups(g.into_iter().skip(count).collect()),
                })
            }
            PlanNode::Limit { count } => {
                let count = *count;
                Ok(match self.run(plan, child(plan, node, 0)?)? {
                    Output::Rows(mut r) => {
                        r.entries.truncate(count);
                        Output::Rows(r)
                    }
                    Output::Groups(mut g) => {
                        g.truncate(count);
                        Output::Groups(g)
                    }
                })
            }
        }
    }

    fn index_range_scan(&self, scan: &IndexRangeScan) -> Result<Relation> {
        let index = self.store.indices().index(&scan.index)?;
        let ids = index.get_range(&scan.ranges, scan.reverse, None, 0);
        let rows = ids.into_iter().map(|id| Row::new(id, Vec::new())).collect();
        Ok(Relation::from_rows_owned(rows, scan.table.scope(), 0))
    }

    fn index_join(
        &mut self,
        plan: &PlanTree,
        node: NodeId,
        predicate: &crate::ast::JoinPredicate,
        index: &str,
        indexed: JoinSide,
        outer: bool,
    ) -> Result<Relation> {
        let (indexed_pos, outer_pos) = match indexed {
            JoinSide::Left => (0, 1),
            JoinSide::Right => (1, 0),
        };
        let PlanNode::TableAccess { table } = plan.get(child(plan, node, indexed_pos)?) else {
            return Err(Error::internal(format!("index join input of {} is not a table scan", predicate)));
        };
        let schema_table = self.schema.table(&table.table)?;
        let def = schema_table
            .indices()
            .iter()
            .find(|d| d.normalized_name() == index)
            .ok_or_else(|| Error::index_not_found(index))?;
        let lookup = IndexLookup {
            index: self.store.indices().index(index)?,
            key_width: def.columns().len(),
            cache: self.store.cache(),
            scope: table.scope().to_string(),
            column_count: schema_table.columns().len(),
        };

        let probe_column = if predicate.left().scope() == table.scope() {
            predicate.right()
        } else {
            predicate.left()
        };
        let outer_rel = rows(self.run(plan, child(plan, node, outer_pos)?)?)?;
        let probe_pos = outer_rel.require_position(probe_column)?;
        index_nested_loop_join(&outer_rel, probe_pos, &lookup, indexed, outer, &mut self.ids)
    }

    fn project(&mut self, input: Output, columns: &[Projection]) -> Result<Relation> {
        match input {
            Output::Rows(r) if columns.is_empty() => Ok(r),
            Output::Groups(g) if columns.is_empty() => Ok(flatten(g)),
            Output::Rows(r) => {
                let mut positions = Vec::with_capacity(columns.len());
                for p in columns {
                    match p {
                        Projection::Column(c) => positions.push(r.require_position(c)?),
                        Projection::Aggregate(a) => {
                            return Err(Error::internal(format!("{} projected without aggregation", a)))
                        }
                    }
                }
                let mut output = projection_layout(columns.len());
                for entry in r.iter() {
                    let values = positions
                        .iter()
                        .map(|p| entry.get_field(*p).cloned().unwrap_or(Value::Null))
                        .collect();
                    self.push_projected(&mut output, values);
                }
                Ok(output)
            }
            Output::Groups(groups) => {
                let mut output = projection_layout(columns.len());
                for mut group in groups {
                    for values in self.group_rows(&mut group, columns)? {
                        self.push_projected(&mut output, values);
                    }
                }
                Ok(output)
            }
        }
    }

    /// The projected rows of one group: one row, or one per distinct value
    /// when a DISTINCT is projected.
    fn group_rows(&self, group: &mut Relation, columns: &[Projection]) -> Result<Vec<Vec<Value>>> {
        let mut distinct: Vec<Option<Vec<Value>>> = Vec::with_capacity(columns.len());
        let mut single: Vec<Value> = Vec::with_capacity(columns.len());
        for p in columns {
            match p {
                Projection::Aggregate(a) if a.func == AggregateFunc::Distinct => {
                    aggregate::memoize(core::slice::from_ref(a), group)?;
                    let values = group.get_distinct(&a.to_string()).map(<[Value]>::to_vec);
                    distinct.push(Some(values.unwrap_or_default()));
                    single.push(Value::Null);
                }
                other => {
                    distinct.push(None);
                    single.push(sort::group_value(group, other)?);
                }
            }
        }
        let expanded = distinct.iter().flatten().map(Vec::len).max();
        let row_count = expanded.unwrap_or(1);
        Ok((0..row_count)
            .map(|i| {
                single
                    .iter()
                    .zip(&distinct)
                    .map(|(value, d)| match d {
                        Some(values) => values.get(i).cloned().unwrap_or(Value::Null),
                        None => value.clone(),
                    })
                    .collect()
            })
            .collect())
    }

    fn push_projected(&mut self, output: &mut Relation, values: Vec<Value>) {
        let id = self.ids.next_id();
        output.push(RelationEntry::with_id(id, Row::new(id, values)));
    }
}

fn projection_layout(width: usize) -> Relation {
    Relation::new(alloc::vec![String::from(PROJECTION_TABLE)], alloc::vec![width])
}

fn child(plan: &PlanTree, node: NodeId, position: usize) -> Result<NodeId> {
    plan.child_at(node, position)
        .ok_or_else(|| Error::internal(format!("{} is missing input {}", plan.get(node), position)))
}

fn rows(output: Output) -> Result<Relation> {
    match output {
        Output::Rows(r) => Ok(r),
        Output::Groups(_) => Err(Error::internal("grouped input where rows are expected")),
    }
}

fn flatten(groups: Vec<Relation>) -> Relation {
    let mut iter = groups.into_iter();
    let Some(mut first) = iter.next() else {
        return Relation::default();
    };
    for g in iter {
        first.entries.extend(g.entries);
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::aggregate::{avg, count, distinct, max};
    use crate::ast::col;
    use crate::context::{QueryContext, TableRef};
    use crate::optimizer::test_support::{employee_schema, populated_store};
    use crate::optimizer::{Optimizer, OptimizerContext};
    use crate::planner::LogicalPlanGenerator;
    use crate::SelectBuilder;
    use strata_core::schema::Order;

    fn run(schema: &Schema, store: &Store, query: &QueryContext, optimize: bool) -> Relation {
        let config = EngineConfig::default();
        let mut plan = LogicalPlanGenerator::new(query).generate().unwrap();
        if optimize {
            plan = Optimizer::new()
                .optimize(plan, &OptimizerContext::new(schema, store, &config))
                .unwrap();
        }
        QueryRunner::new(schema, store, &config).execute(&plan).unwrap()
    }

    fn both(schema: &Schema, store: &Store, query: &QueryContext) -> Vec<Vec<Value>> {
        let plain = run(schema, store, query, false).to_values();
        let optimized = run(schema, store, query, true).to_values();
        assert_eq!(plain, optimized);
        plain
    }

    #[test]
    fn test_filter_order_limit() {
        let schema = employee_schema();
        let store = populated_store(&schema, 50);
        let id = col(&schema, "Employee", "id").unwrap();
        let query = SelectBuilder::new(&schema)
            .select([&id])
            .from("Employee")
            .where_(id.gt(40i64))
            .order_by(&id, Order::Desc)
            .skip(1)
            .limit(3)
            .build()
            .unwrap();
        let rows = both(&schema, &store, &query);
        assert_eq!(
            rows,
            alloc::vec![
                alloc::vec![Value::Int64(49)],
                alloc::vec![Value::Int64(48)],
                alloc::vec![Value::Int64(47)]
            ]
        );
    }

    #[test]
    fn test_join_and_group_by() {
        let schema = employee_schema();
        let store = populated_store(&schema, 20);
        let e_dept = col(&schema, "Employee", "deptId").unwrap();
        let e_salary = col(&schema, "Employee", "salary").unwrap();
        let d_id = col(&schema, "Dept", "id").unwrap();
        let d_name = col(&schema, "Dept", "name").unwrap();
        let query = SelectBuilder::new(&schema)
            .select([Projection::from(&d_name), count(&e_salary).into(), max(&e_salary).into()])
            .from("Employee")
            .inner_join("Dept", e_dept.eq_col(&d_id))
            .group_by([&d_name])
            .order_by(&d_name, Order::Asc)
            .build()
            .unwrap();
        let rows = both(&schema, &store, &query);
        assert_eq!(rows.len(), 5);
        assert_eq!(
            rows[0],
            alloc::vec![Value::String("dept0".into()), Value::Int64(4), Value::Float64(1020.0)]
        );
        assert_eq!(
            rows[4],
            alloc::vec![Value::String("dept4".into()), Value::Int64(4), Value::Float64(1019.0)]
        );
    }

    #[test]
    fn test_aggregates_without_group_by() {
        let schema = employee_schema();
        let store = populated_store(&schema, 9);
        let salary = col(&schema, "Employee", "salary").unwrap();
        let id = col(&schema, "Employee", "id").unwrap();
        let query = SelectBuilder::new(&schema)
            .select([count(&id), avg(&salary)])
            .from("Employee")
            .build()
            .unwrap();
        assert_eq!(
            both(&schema, &store, &query),
            alloc::vec![alloc::vec![Value::Int64(9), Value::Float64(1005.0)]]
        );

        // Nothing matches: COUNT is zero, AVG is null.
        let query = SelectBuilder::new(&schema)
            .select([count(&id), avg(&salary)])
            .from("Employee")
            .where_(id.gt(100i64))
            .build()
            .unwrap();
        assert_eq!(
            both(&schema, &store, &query),
            alloc::vec![alloc::vec![Value::Int64(0), Value::Null]]
        );
    }

    #[test]
    fn test_distinct_expands_rows() {
        let schema = employee_schema();
        let store = populated_store(&schema, 12);
        let dept = col(&schema, "Employee", "deptId").unwrap();
        let query = SelectBuilder::new(&schema)
            .select([distinct(&dept)])
            .from("Employee")
            .build()
            .unwrap();
        let mut rows = both(&schema, &store, &query);
        rows.sort();
        let expected: Vec<Vec<Value>> = (0..5).map(|d| alloc::vec![Value::Int64(d)]).collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn test_left_outer_join_keeps_unmatched() {
        let schema = employee_schema();
        let mut store = populated_store(&schema, 10);
        {
            let mut journal = strata_storage::Journal::new(&schema, &mut store, &["Employee"]).unwrap();
            let row = journal.create_row(alloc::vec![
                Value::Int64(99),
                Value::String("orphan".into()),
                Value::Null,
                Value::Float64(1.0),
            ]);
            journal.insert("Employee", alloc::vec![row]).unwrap();
            journal.commit().unwrap();
        }
        let e_dept = col(&schema, "Employee", "deptId").unwrap();
        let e_id = col(&schema, "Employee", "id").unwrap();
        let d_id = col(&schema, "Dept", "id").unwrap();
        let d_name = col(&schema, "Dept", "name").unwrap();
        let query = SelectBuilder::new(&schema)
            .select([&e_id, &d_name])
            .from("Employee")
            .left_outer_join("Dept", e_dept.eq_col(&d_id))
            .order_by(&e_id, Order::Asc)
            .build()
            .unwrap();
        let rows = both(&schema, &store, &query);
        assert_eq!(rows.len(), 11);
        assert_eq!(rows[10], alloc::vec![Value::Int64(99), Value::Null]);
        assert_eq!(rows[0], alloc::vec![Value::Int64(1), Value::String("dept1".into())]);
    }

    #[test]
    fn test_index_scan_plan_reads_rows_in_index_order() {
        let schema = employee_schema();
        let store = populated_store(&schema, 30);
        let employee = TableRef::new("Employee");
        let mut plan = PlanTree::new(PlanNode::TableAccessByRowId { table: employee.clone() });
        plan.push_child(
            plan.root(),
            PlanNode::IndexRangeScan(IndexRangeScan {
                table: employee,
                index: "Employee.pkEmployee".into(),
                ranges: alloc::vec![strata_index::SingleKeyRange::lower_bound(Value::Int64(27), true)],
                reverse: true,
            }),
        );
        let config = EngineConfig::default();
        let out = QueryRunner::new(&schema, &store, &config).execute(&plan).unwrap();
        let ids: Vec<Value> = out.to_values().into_iter().map(|r| r[0].clone()).collect();
        assert_eq!(ids, alloc::vec![Value::Int64(30), Value::Int64(29), Value::Int64(28)]);
    }
}

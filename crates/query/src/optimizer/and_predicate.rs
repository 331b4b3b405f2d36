//! AND predicate pass - breaks a select over an AND into chained selects.
//!
//! ```text
//! select(a AND b AND c)    =>    select(a)
//!        |                          |
//!   table_access                 select(b)
//!                                   |
//!                                select(c)
//!                                   |
//!                              table_access
//! ```
//!
//! Each conjunct can then be pushed down and matched against indices on
//! its own.

use crate::ast::{CombineOp, Predicate};
use crate::optimizer::{OptimizerContext, OptimizerPass};
use crate::planner::{PlanNode, PlanTree};
use alloc::vec::Vec;
use strata_core::Result;

/// Pass that breaks down AND predicates into chained select nodes.
pub struct AndPredicatePass;

impl OptimizerPass for AndPredicatePass {
    fn optimize(&self, mut plan: PlanTree, _ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        let targets = plan.find(
            plan.root(),
            |node| matches!(node.predicate(), Some(Predicate::Combined(c)) if c.op() == CombineOp::And),
            |_| false,
        );
        for id in targets {
            let Some(Predicate::Combined(combined)) = plan.get(id).predicate().cloned() else {
                continue;
            };
            let conjuncts = break_and_predicate(combined.into_children());
            let mut chain = conjuncts.into_iter().map(PlanNode::select);
            let Some(head_node) = chain.next() else {
                continue;
            };
            let head = plan.add_node(head_node);
            let mut tail = head;
            for node in chain {
                tail = plan.push_child(tail, node);
            }
            plan.replace_node_with_chain(id, head, tail);
        }
        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "and_predicate"
    }
}

/// Flattens nested ANDs into their conjuncts, in order.
fn break_and_predicate(children: Vec<Predicate>) -> Vec<Predicate> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Predicate::Combined(c) if c.op() == CombineOp::And => {
                out.extend(break_and_predicate(c.into_children()))
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::test_support::{employee_schema, run_pass};
    use crate::ast::col;
    use crate::context::TableRef;
    use alloc::string::ToString;

    #[test]
    fn test_and_becomes_chain() {
        let schema = employee_schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let salary = col(&schema, "Employee", "salary").unwrap();

        let mut plan = PlanTree::new(PlanNode::Project { columns: Vec::new() });
        let select = plan.push_child(
            plan.root(),
            PlanNode::select(id.gt(1i64).and(salary.lt(10.0)).and(id.lt(5i64))),
        );
        plan.push_child(select, PlanNode::table_access(TableRef::new("Employee")));

        let expected = "project()\n\
                        -select(value_pred(Employee.id gt 1))\n\
                        --select(value_pred(Employee.salary lt 10))\n\
                        ---select(value_pred(Employee.id lt 5))\n\
                        ----table_access(Employee)\n";
        let plan = run_pass(&schema, &AndPredicatePass, plan);
        assert_eq!(plan.to_string(), expected);
        // Converged.
        let plan = run_pass(&schema, &AndPredicatePass, plan);
        assert_eq!(plan.to_string(), expected);
    }

    #[test]
    fn test_or_is_kept() {
        let schema = employee_schema();
        let id = col(&schema, "Employee", "id").unwrap();
        let mut plan = PlanTree::new(PlanNode::select(id.eq(1i64).or(id.eq(2i64))));
        plan.push_child(plan.root(), PlanNode::table_access(TableRef::new("Employee")));
        let before = plan.to_string();
        let plan = run_pass(&schema, &AndPredicatePass, plan);
        assert_eq!(plan.to_string(), before);
    }
}

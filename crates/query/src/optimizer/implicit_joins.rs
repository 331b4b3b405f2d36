//! Implicit joins pass - turns a join predicate over a cross product into
//! an inner join.
//!
//! ```text
//! select(A.x = B.y)
//!       |                 =>    join(inner, A.x = B.y)
//! cross_product                    /          \
//!   /        \                    A            B
//!  A          B
//! ```
//!
//! The join predicate is oriented so that its left column is read from
//! the left input.

use crate::ast::Predicate;
use crate::context::JoinType;
use crate::optimizer::{OptimizerContext, OptimizerPass};
use crate::planner::{subtree_tables, JoinImpl, PlanNode, PlanTree};
use alloc::string::ToString;
use strata_core::Result;
use tracing::trace;

/// Pass that converts select + cross product into an inner join.
pub struct ImplicitJoinsPass;

impl OptimizerPass for ImplicitJoinsPass {
    fn optimize(&self, mut plan: PlanTree, _ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        let selects = plan.find(
            plan.root(),
            |node| matches!(node.predicate(), Some(Predicate::Join(_))),
            |_| false,
        );
        for select in selects {
            let Some(Predicate::Join(predicate)) = plan.get(select).predicate().cloned() else {
                continue;
            };
            let Some(cross) = plan.child_at(select, 0) else {
                continue;
            };
            if !matches!(plan.get(cross), PlanNode::CrossProduct) {
                continue;
            }
            let [left, right] = plan.children(cross) else {
                continue;
            };
            let left_tables = subtree_tables(&plan, *left);
            let right_tables = subtree_tables(&plan, *right);
            let (l, r) = (predicate.left().scope().to_string(), predicate.right().scope().to_string());

            let predicate = if left_tables.contains(&l) && right_tables.contains(&r) {
                predicate
            } else if left_tables.contains(&r) && right_tables.contains(&l) {
                predicate.reverse()
            } else {
                continue;
            };
            trace!(predicate = %predicate, "cross product turned into inner join");
            let join = plan.add_node(PlanNode::Join {
                join_type: JoinType::Inner,
                implementation: JoinImpl::NestedLoop,
                predicate,
            });
            plan.replace_chain_with_node(select, cross, join);
        }
        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "implicit_joins"
    }
}

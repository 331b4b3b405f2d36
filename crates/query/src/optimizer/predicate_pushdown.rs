//! Push-down-selections pass.
//!
//! Moves each `select` below the cross products and joins under it, onto
//! the branch that supplies every table its predicate reads:
//!
//! ```text
//! select(A.x = 1)               cross_product
//!       |                         /        \
//! cross_product     =>    select(A.x = 1)   table_access(B)
//!   /        \                  |
//! A           B           table_access(A)
//! ```
//!
//! A predicate over two tables stops right above the node that brings
//! them together. Selects are only pushed into the left (preserved) side
//! of an outer join.

use crate::context::JoinType;
use crate::optimizer::{OptimizerContext, OptimizerPass};
use crate::planner::{subtree_tables, PlanNode, PlanTree};
use crate::tree::NodeId;
use alloc::string::ToString;
use alloc::vec::Vec;
use strata_core::Result;

/// Pass that pushes select nodes towards the tables they filter.
pub struct PushDownSelectionsPass;

impl OptimizerPass for PushDownSelectionsPass {
    fn optimize(&self, mut plan: PlanTree, _ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        // Every move takes a select strictly deeper, so this terminates.
        while let Some((select, target)) = next_move(&plan) {
            plan.remove_node(select);
            plan.insert_node_at(target, select);
        }
        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "push_down_selections"
    }
}

/// The first select, in pre-order, that can go lower, and the node it
/// should be put above.
fn next_move(plan: &PlanTree) -> Option<(NodeId, NodeId)> {
    plan.find(plan.root(), PlanNode::is_select, |_| false)
        .into_iter()
        .find_map(|select| target_of(plan, select).map(|target| (select, target)))
}

fn target_of(plan: &PlanTree, select: NodeId) -> Option<NodeId> {
    let predicate = plan.get(select).predicate()?;
    let tables: Vec<_> = predicate.tables().into_iter().map(|t| t.to_string()).collect();

    // Skip over the selects stacked below this one.
    let mut below = plan.child_at(select, 0)?;
    while plan.get(below).is_select() {
        below = plan.child_at(below, 0)?;
    }

    let allowed = match plan.get(below) {
        PlanNode::CrossProduct => 2,
        PlanNode::Join {
            join_type: JoinType::Inner,
            ..
        } => 2,
        PlanNode::Join {
            join_type: JoinType::LeftOuter,
            ..
        } => 1,
        _ => return None,
    };
    plan.children(below)
        .iter()
        .take(allowed)
        .copied()
        .find(|branch| {
            let supplied = subtree_tables(plan, *branch);
            tables.iter().all(|t| supplied.contains(t))
        })
}

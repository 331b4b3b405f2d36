//! Join strategy pass - picks how each join is evaluated.
//!
//! - index nested loop when one input is a plain table scan whose join
//!   column leads one of its indices (only the right input of an outer
//!   join qualifies)
//! - hash join for the remaining equi-joins
//! - nested loop otherwise

use crate::ast::ColumnRef;
use crate::context::JoinType;
use crate::optimizer::{OptimizerContext, OptimizerPass};
use crate::planner::{JoinImpl, JoinSide, PlanNode, PlanTree};
use crate::tree::NodeId;
use alloc::string::String;
use strata_core::Result;
use tracing::debug;

/// Pass that chooses join implementations.
pub struct JoinStrategyPass;

impl OptimizerPass for JoinStrategyPass {
    fn optimize(&self, mut plan: PlanTree, ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        let joins = plan.find(plan.root(), |n| matches!(n, PlanNode::Join { .. }), |_| false);
        for join in joins {
            let PlanNode::Join {
                join_type,
                predicate,
                implementation,
            } = plan.get(join).clone()
            else {
                continue;
            };
            let chosen = choose(&plan, join, join_type, &predicate, ctx)?;
            if chosen != implementation {
                debug!(join = %predicate, implementation = %chosen, "join strategy");
                plan.replace_value(
                    join,
                    PlanNode::Join {
                        join_type,
                        implementation: chosen,
                        predicate,
                    },
                );
            }
        }
        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "join_strategy"
    }
}

fn choose(
    plan: &PlanTree,
    join: NodeId,
    join_type: JoinType,
    predicate: &crate::ast::JoinPredicate,
    ctx: &OptimizerContext<'_>,
) -> Result<JoinImpl> {
    if !predicate.is_equi_join() {
        return Ok(JoinImpl::NestedLoop);
    }
    if ctx.config.enable_index_join {
        let sides = match join_type {
            JoinType::Inner => &[JoinSide::Right, JoinSide::Left][..],
            JoinType::LeftOuter => &[JoinSide::Right][..],
        };
        for side in sides {
            let (position, column) = match side {
                JoinSide::Left => (0, predicate.left()),
                JoinSide::Right => (1, predicate.right()),
            };
            let Some(child) = plan.child_at(join, position) else {
                continue;
            };
            if let Some(index) = leading_index(plan, child, column, ctx)? {
                return Ok(JoinImpl::IndexNestedLoop { index, indexed: *side });
            }
        }
    }
    if ctx.config.enable_hash_join {
        return Ok(JoinImpl::Hash);
    }
    Ok(JoinImpl::NestedLoop)
}

/// An index led by `column`, if `node` scans `column`'s whole table.
fn leading_index(
    plan: &PlanTree,
    node: NodeId,
    column: &ColumnRef,
    ctx: &OptimizerContext<'_>,
) -> Result<Option<String>> {
    let PlanNode::TableAccess { table } = plan.get(node) else {
        return Ok(None);
    };
    if table.scope() != column.scope() {
        return Ok(None);
    }
    let found = ctx
        .schema
        .table(&table.table)?
        .indices()
        .iter()
        .find(|def| def.columns().first().is_some_and(|c| c.name == column.column))
        .map(|def| def.normalized_name());
    Ok(found)
}

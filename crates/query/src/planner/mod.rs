//! Query planning: plan nodes and the logical plan generator.

mod logical;
mod node;

pub use logical::LogicalPlanGenerator;
pub use node::{plan_summary, subtree_tables, IndexRangeScan, JoinImpl, JoinSide, PlanNode, PlanTree};

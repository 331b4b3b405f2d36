//! Query optimizer module.

mod and_predicate;
mod implicit_joins;
mod index_selection;
mod join_strategy;
mod order_by_index;
mod pass;
mod predicate_pushdown;

pub use and_predicate::AndPredicatePass;
pub use implicit_joins::ImplicitJoinsPass;
pub use index_selection::{IndexCostEstimator, IndexRangeCandidate, IndexRangeScanPass};
pub use join_strategy::JoinStrategyPass;
pub use order_by_index::OrderByIndexPass;
pub use pass::{OptimizerContext, OptimizerPass};
pub use predicate_pushdown::PushDownSelectionsPass;

use crate::planner::PlanTree;
use alloc::boxed::Box;
use alloc::vec::Vec;
use strata_core::Result;
use tracing::{debug, trace};

/// Query optimizer that applies optimization passes.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizerPass>>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Optimizer {
    /// Creates an optimizer with the default passes.
    pub fn new() -> Self {
        Self::with_passes(Self::default_passes())
    }

    /// The default passes, in the order they run:
    /// 1. AndPredicatePass - split AND selects into chains
    /// 2. PushDownSelectionsPass - move selects towards their tables
    /// 3. ImplicitJoinsPass - select + cross product into inner join
    /// 4. IndexRangeScanPass - replace filtered scans with index scans
    /// 5. JoinStrategyPass - pick nested loop, hash or index join
    /// 6. OrderByIndexPass - serve ORDER BY from an index
    pub fn default_passes() -> Vec<Box<dyn OptimizerPass>> {
        alloc::vec![
            Box::new(AndPredicatePass),
            Box::new(PushDownSelectionsPass),
            Box::new(ImplicitJoinsPass),
            Box::new(IndexRangeScanPass),
            Box::new(JoinStrategyPass),
            Box::new(OrderByIndexPass),
        ]
    }

    /// Creates an optimizer with custom passes.
    pub fn with_passes(passes: Vec<Box<dyn OptimizerPass>>) -> Self {
        Self { passes }
    }

    /// Runs every pass in order.
    pub fn optimize(&self, mut plan: PlanTree, ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        for pass in &self.passes {
            plan = pass.optimize(plan, ctx)?;
            debug!(pass = pass.name(), "optimizer pass applied");
            trace!(plan = %crate::planner::plan_summary(&plan));
        }
        Ok(plan)
    }
}

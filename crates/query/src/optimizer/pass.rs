//! Optimizer pass trait.

use crate::config::EngineConfig;
use crate::planner::PlanTree;
use strata_core::schema::Schema;
use strata_core::Result;
use strata_storage::Store;

/// What passes may consult while rewriting a plan.
#[derive(Clone, Copy)]
pub struct OptimizerContext<'a> {
    pub schema: &'a Schema,
    pub store: &'a Store,
    pub config: &'a EngineConfig,
}

impl<'a> OptimizerContext<'a> {
    pub fn new(schema: &'a Schema, store: &'a Store, config: &'a EngineConfig) -> Self {
        Self { schema, store, config }
    }
}

/// An optimization pass that rewrites a plan tree. Running a pass on its
/// own output must leave the tree unchanged.
pub trait OptimizerPass {
    /// Optimizes the given plan.
    fn optimize(&self, plan: PlanTree, ctx: &OptimizerContext<'_>) -> Result<PlanTree>;

    /// Returns the name of this pass.
    fn name(&self) -> &'static str {
        "unnamed"
    }
}

//! Index selection: replaces filtered table scans with index range scans.
//!
//! ```text
//! select(T.id > 100)                 table_access_by_row_id(T)
//!       |                  =>                 |
//! table_access(T)              index_range_scan(T.pkT, (100, unbound], natural)
//! ```
//!
//! The [`IndexCostEstimator`] decides which index, if any, answers the
//! selects sitting directly on a table scan. The selects it consumes are
//! removed; the rest stay above the new scan.

use crate::ast::{EvalType, Predicate, PredicateId};
use crate::context::TableRef;
use crate::optimizer::{OptimizerContext, OptimizerPass};
use crate::planner::{IndexRangeScan, PlanNode, PlanTree};
use crate::tree::NodeId;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use strata_core::schema::{IndexDef, Table};
use strata_core::Result;
use strata_index::{KeyRange, SingleKeyRange};
use tracing::debug;

/// An index paired with the predicates it can answer.
#[derive(Clone, Debug)]
pub struct IndexRangeCandidate {
    /// Normalized index name.
    pub index: String,
    /// Predicates answered by the scan.
    pub predicates: Vec<PredicateId>,
    /// Per index column, the sorted ranges the scan must cover. Columns
    /// without a predicate get `all()`.
    column_ranges: Vec<Vec<KeyRange>>,
}

impl IndexRangeCandidate {
    /// Matches `predicates` against the columns of `def`. Returns `None`
    /// unless the bound columns form a non-empty prefix of the index.
    fn new(def: &IndexDef, predicates: &[&Predicate]) -> Option<Self> {
        let mut used = Vec::new();
        let mut column_ranges = Vec::with_capacity(def.columns().len());
        let mut prefix_ended = false;

        for indexed in def.columns() {
            let bound: Vec<&Predicate> = predicates
                .iter()
                .copied()
                .filter(|p| p.key_range_column().is_some_and(|c| c.column == indexed.name))
                .collect();
            if bound.is_empty() {
                prefix_ended = true;
                column_ranges.push(alloc::vec![SingleKeyRange::all()]);
                continue;
            }
            if prefix_ended {
                // A bound column after a gap leaves the index unusable.
                return None;
            }
            let mut ranges = alloc::vec![SingleKeyRange::all()];
            for p in bound {
                ranges = intersect(&ranges, &p.to_key_range());
                used.push(p.id());
            }
            column_ranges.push(ranges);
        }

        if used.is_empty() {
            return None;
        }
        Some(Self {
            index: def.normalized_name(),
            predicates: used,
            column_ranges,
        })
    }

    /// Every combination of one range per column.
    pub fn key_range_combinations(&self) -> Vec<Vec<KeyRange>> {
        let mut combos: Vec<Vec<KeyRange>> = alloc::vec![Vec::new()];
        for ranges in &self.column_ranges {
            let mut next = Vec::with_capacity(combos.len() * ranges.len());
            for combo in &combos {
                for range in ranges {
                    let mut extended = combo.clone();
                    extended.push(range.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        combos
    }

    /// Rows the scan is expected to touch.
    pub fn cost(&self, ctx: &OptimizerContext<'_>) -> Result<usize> {
        let index = ctx.store.indices().index(&self.index)?;
        Ok(self
            .key_range_combinations()
            .iter()
            .map(|combo| index.cost(combo))
            .sum())
    }
}

/// Pairwise intersection of two sorted, disjoint range lists.
fn intersect(a: &[KeyRange], b: &[KeyRange]) -> Vec<KeyRange> {
    let mut out: Vec<KeyRange> = a
        .iter()
        .flat_map(|x| b.iter().filter_map(move |y| x.and(y)))
        .collect();
    out.sort_by(|x, y| x.compare(y));
    out
}

/// Picks the index to answer a set of predicates on one table.
pub struct IndexCostEstimator<'a> {
    ctx: &'a OptimizerContext<'a>,
    table: &'a Table,
    scope: &'a str,
}

impl<'a> IndexCostEstimator<'a> {
    pub fn new(ctx: &'a OptimizerContext<'a>, table: &'a Table, scope: &'a str) -> Self {
        Self { ctx, table, scope }
    }

    fn is_candidate(&self, predicate: &Predicate, probe_limit: usize) -> bool {
        let Some(column) = predicate.key_range_column() else {
            return false;
        };
        if column.scope() != self.scope || column.table != self.table.name() {
            return false;
        }
        let multi_valued = match predicate {
            Predicate::Value(p) => p.eval_type() == EvalType::In,
            Predicate::Combined(_) => true,
            Predicate::Join(_) => false,
        };
        !multi_valued || predicate.value_count() < probe_limit
    }

    /// The cheapest usable candidate, or `None` if no index helps. A single
    /// usable candidate is taken without costing; ties go to the index
    /// declared first.
    pub fn choose_index_for(&self, predicates: &[&Predicate]) -> Result<Option<IndexRangeCandidate>> {
        let rows = self.ctx.store.cache().count(self.table.name());
        let probe_limit = self.ctx.config.index_probe_limit(rows);
        let qualifying: Vec<&Predicate> = predicates
            .iter()
            .copied()
            .filter(|p| self.is_candidate(p, probe_limit))
            .collect();
        if qualifying.is_empty() {
            return Ok(None);
        }

        let mut candidates: Vec<IndexRangeCandidate> = self
            .table
            .indices()
            .iter()
            .filter_map(|def| IndexRangeCandidate::new(def, &qualifying))
            .collect();
        if candidates.len() <= 1 {
            return Ok(candidates.pop());
        }

        let mut best: Option<(usize, IndexRangeCandidate)> = None;
        for candidate in candidates {
            let cost = candidate.cost(self.ctx)?;
            match &best {
                Some((best_cost, _)) if cost >= *best_cost => {}
                _ => best = Some((cost, candidate)),
            }
        }
        Ok(best.map(|(cost, candidate)| {
            debug!(index = %candidate.index, cost, "index chosen");
            candidate
        }))
    }
}

/// Pass that turns `select`s over a table scan into an index range scan.
pub struct IndexRangeScanPass;

impl OptimizerPass for IndexRangeScanPass {
    fn optimize(&self, mut plan: PlanTree, ctx: &OptimizerContext<'_>) -> Result<PlanTree> {
        let scans = plan.find(plan.root(), PlanNode::is_table_access, |_| false);
        for access in scans {
            let PlanNode::TableAccess { table } = plan.get(access).clone() else {
                continue;
            };
            let selects = selects_above(&plan, access);
            if selects.is_empty() {
                continue;
            }
            let schema_table = ctx.schema.table(&table.table)?;
            let candidate = {
                let predicates: Vec<&Predicate> =
                    selects.iter().filter_map(|s| plan.get(*s).predicate()).collect();
                IndexCostEstimator::new(ctx, schema_table, table.scope()).choose_index_for(&predicates)?
            };
            if let Some(candidate) = candidate {
                rewrite(&mut plan, access, &selects, table, &candidate);
            }
        }
        Ok(plan)
    }

    fn name(&self) -> &'static str {
        "index_range_scan"
    }
}

/// The unbroken run of selects directly above `node`, nearest first.
fn selects_above(plan: &PlanTree, node: NodeId) -> Vec<NodeId> {
    let mut selects = Vec::new();
    let mut current = node;
    while let Some(parent) = plan.parent(current) {
        if !plan.get(parent).is_select() {
            break;
        }
        selects.push(parent);
        current = parent;
    }
    selects
}

fn rewrite(plan: &mut PlanTree, access: NodeId, selects: &[NodeId], table: TableRef, candidate: &IndexRangeCandidate) {
    for select in selects {
        let consumed = plan
            .get(*select)
            .predicate()
            .is_some_and(|p| candidate.predicates.contains(&p.id()));
        if consumed {
            plan.remove_node(*select);
        }
    }

    let scan_of = |ranges: Vec<KeyRange>| {
        PlanNode::IndexRangeScan(IndexRangeScan {
            table: table.clone(),
            index: candidate.index.clone(),
            ranges,
            reverse: false,
        })
    };
    let mut combos = candidate.key_range_combinations();
    let source = if combos.len() == 1 {
        plan.add_node(scan_of(combos.remove(0)))
    } else {
        let multi = plan.add_node(PlanNode::MultiIndexRangeScan);
        for combo in combos {
            plan.push_child(multi, scan_of(combo));
        }
        multi
    };
    plan.replace_value(
        access,
        PlanNode::TableAccessByRowId {
            table: table.clone(),
        },
    );
    plan.add_child(access, source);
    debug!(table = %table, index = %candidate.index, "table scan replaced by index range scan");
}

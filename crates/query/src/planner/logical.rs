//! Translates a query into its initial plan.

use crate::ast::{and, Predicate};
use crate::context::{JoinType, QueryContext, TableRef};
use crate::planner::node::{JoinImpl, PlanNode, PlanTree};
use crate::tree::NodeId;
use alloc::vec::Vec;
use strata_core::{Error, Result};

/// Builds the unoptimized plan of a resolved query:
///
/// ```text
/// limit
/// -skip
/// --project
/// ---order_by
/// ----aggregation
/// -----group_by
/// ------select
/// -------source
/// ```
///
/// Steps the query does not use are left out. The source is a left-deep
/// chain of cross products over the FROM tables and inner joins; inner
/// join conditions join the WHERE predicate, outer joins become `join`
/// nodes.
pub struct LogicalPlanGenerator<'q> {
    query: &'q QueryContext,
}

impl<'q> LogicalPlanGenerator<'q> {
    pub fn new(query: &'q QueryContext) -> Self {
        Self { query }
    }

    pub fn generate(&self) -> Result<PlanTree> {
        let q = self.query;
        let mut chain: Vec<PlanNode> = Vec::new();
        if let Some(count) = q.limit_value() {
            chain.push(PlanNode::Limit { count });
        }
        if let Some(count) = q.skip_value() {
            chain.push(PlanNode::Skip { count });
        }
        chain.push(PlanNode::Project {
            columns: q.columns.clone(),
        });
        if !q.order_by.is_empty() {
            chain.push(PlanNode::OrderBy {
                keys: q.order_by.clone(),
            });
        }
        if q.has_aggregates() {
            chain.push(PlanNode::Aggregation {
                columns: q.aggregates(),
            });
        }
        if !q.group_by.is_empty() {
            chain.push(PlanNode::GroupBy {
                columns: q.group_by.clone(),
            });
        }
        if let Some(predicate) = self.where_predicate() {
            chain.push(PlanNode::select(predicate));
        }

        let mut nodes = chain.into_iter();
        let Some(root) = nodes.next() else {
            return Err(Error::internal("empty plan"));
        };
        let mut plan = PlanTree::new(root);
        let mut tail = plan.root();
        for node in nodes {
            tail = plan.push_child(tail, node);
        }
        let source = self.source(&mut plan)?;
        plan.add_child(tail, source);
        Ok(plan)
    }

    /// WHERE plus every inner join condition.
    fn where_predicate(&self) -> Option<Predicate> {
        let mut conjuncts: Vec<Predicate> = self
            .query
            .joins
            .iter()
            .filter(|j| j.join_type == JoinType::Inner)
            .map(|j| j.predicate.clone())
            .collect();
        conjuncts.extend(self.query.where_clause.iter().cloned());
        match conjuncts.len() {
            0 => None,
            1 => conjuncts.pop(),
            _ => Some(and(conjuncts)),
        }
    }

    fn source(&self, plan: &mut PlanTree) -> Result<NodeId> {
        let q = self.query;
        let mut tables = q.from.iter();
        let Some(first) = tables.next() else {
            return Err(Error::invalid_query("from() has not been called"));
        };
        let mut current = plan.add_node(PlanNode::table_access(first.clone()));
        let mut scopes: Vec<&str> = alloc::vec![first.scope()];

        for table in tables {
            current = cross_product(plan, current, table);
            scopes.push(table.scope());
        }

        for join in &q.joins {
            match join.join_type {
                JoinType::Inner => current = cross_product(plan, current, &join.table),
                JoinType::LeftOuter => {
                    let Some(predicate) = join.join_predicate() else {
                        return Err(Error::invalid_query("outer join needs a join predicate"));
                    };
                    // The left column must come from the tables joined so far.
                    let predicate = if scopes.contains(&predicate.left().scope()) {
                        predicate.clone()
                    } else {
                        predicate.reverse()
                    };
                    let node = plan.add_node(PlanNode::Join {
                        join_type: JoinType::LeftOuter,
                        implementation: JoinImpl::NestedLoop,
                        predicate,
                    });
                    let right = plan.add_node(PlanNode::table_access(join.table.clone()));
                    plan.add_child(node, current);
                    plan.add_child(node, right);
                    current = node;
                }
            }
            scopes.push(join.table.scope());
        }
        Ok(current)
    }
}

fn cross_product(plan: &mut PlanTree, left: NodeId, table: &TableRef) -> NodeId {
    let node = plan.add_node(PlanNode::CrossProduct);
    let right = plan.add_node(PlanNode::table_access(table.clone()));
    plan.add_child(node, left);
    plan.add_child(node, right);
    node
}

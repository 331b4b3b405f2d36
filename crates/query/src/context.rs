//! The parts of a SELECT query, as produced by the builder.

use crate::ast::{AggregateColumn, ColumnRef, JoinPredicate, Predicate, PredicateId};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use strata_core::schema::Order;
use strata_core::{Error, Result, Value};

/// A table in the FROM clause, optionally aliased.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    pub fn aliased(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: Some(alias.into()),
        }
    }

    /// The name the table goes by in the query.
    #[inline]
    pub fn scope(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.table, alias),
            None => f.write_str(&self.table),
        }
    }
}

/// Join type for join clauses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "inner",
            JoinType::LeftOuter => "left_outer",
        })
    }
}

/// An explicit JOIN.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinClause {
    pub table: TableRef,
    pub join_type: JoinType,
    pub predicate: Predicate,
}

impl JoinClause {
    /// The join condition of an outer join.
    pub fn join_predicate(&self) -> Option<&JoinPredicate> {
        match &self.predicate {
            Predicate::Join(p) => Some(p),
            _ => None,
        }
    }
}

/// One item of the projection list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Projection {
    Column(ColumnRef),
    Aggregate(AggregateColumn),
}

impl Projection {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Projection::Aggregate(_))
    }
}

impl From<ColumnRef> for Projection {
    fn from(c: ColumnRef) -> Self {
        Projection::Column(c)
    }
}

impl From<&ColumnRef> for Projection {
    fn from(c: &ColumnRef) -> Self {
        Projection::Column(c.clone())
    }
}

impl From<AggregateColumn> for Projection {
    fn from(a: AggregateColumn) -> Self {
        Projection::Aggregate(a)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Column(c) => c.fmt(f),
            Projection::Aggregate(a) => a.fmt(f),
        }
    }
}

/// One ORDER BY item. Aggregates can be sorted on when grouping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub key: Projection,
    pub order: Order,
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.order)
    }
}

/// A LIMIT or SKIP count, possibly supplied at bind time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Count {
    Value(usize),
    Binder(usize),
}

/// Everything a SELECT query says, plus the counters that give its
/// predicates their ids.
#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    pub from: Vec<TableRef>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Predicate>,
    pub columns: Vec<Projection>,
    pub order_by: Vec<OrderKey>,
    pub group_by: Vec<ColumnRef>,
    pub limit: Option<Count>,
    pub skip: Option<Count>,
    bound_values: Vec<Value>,
    next_predicate_id: u32,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next predicate id.
    pub fn next_predicate_id(&mut self) -> PredicateId {
        self.next_predicate_id += 1;
        PredicateId(self.next_predicate_id)
    }

    /// Gives every node of `predicate` a fresh id.
    pub fn register_predicate(&mut self, mut predicate: Predicate) -> Predicate {
        predicate.assign_ids(&mut || self.next_predicate_id());
        predicate
    }

    /// Every table of the query: FROM tables first, then joined ones.
    pub fn tables(&self) -> Vec<&TableRef> {
        self.from.iter().chain(self.joins.iter().map(|j| &j.table)).collect()
    }

    pub fn has_aggregates(&self) -> bool {
        self.columns.iter().any(Projection::is_aggregate)
            || self.order_by.iter().any(|o| o.key.is_aggregate())
    }

    /// Aggregates used anywhere in the query, without duplicates.
    pub fn aggregates(&self) -> Vec<AggregateColumn> {
        let mut out: Vec<AggregateColumn> = Vec::new();
        let keys = self.columns.iter().chain(self.order_by.iter().map(|o| &o.key));
        for key in keys {
            if let Projection::Aggregate(a) = key {
                if !out.contains(a) {
                    out.push(a.clone());
                }
            }
        }
        out
    }

    /// Join conditions of the outer joins.
    pub fn outer_join_predicates(&self) -> Vec<&JoinPredicate> {
        self.joins
            .iter()
            .filter(|j| j.join_type == JoinType::LeftOuter)
            .filter_map(JoinClause::join_predicate)
            .collect()
    }

    /// Supplies values for placeholders, replacing earlier bindings.
    pub fn bind(&mut self, values: Vec<Value>) {
        self.bound_values = values;
    }

    pub fn bound_values(&self) -> &[Value] {
        &self.bound_values
    }

    /// A copy with every placeholder replaced by its bound value. Fails
    /// with `InvalidQuery` if a placeholder has no value.
    pub fn resolve(&self) -> Result<QueryContext> {
        let values = &self.bound_values;
        let mut resolved = self.clone();
        if let Some(p) = &self.where_clause {
            resolved.where_clause = Some(p.bind(values)?);
        }
        for join in resolved.joins.iter_mut() {
            join.predicate = join.predicate.bind(values)?;
        }
        resolved.limit = self.limit.map(|c| resolve_count(c, values, "limit")).transpose()?;
        resolved.skip = self.skip.map(|c| resolve_count(c, values, "skip")).transpose()?;
        Ok(resolved)
    }

    /// The LIMIT of a resolved query.
    pub fn limit_value(&self) -> Option<usize> {
        match self.limit {
            Some(Count::Value(n)) => Some(n),
            _ => None,
        }
    }

    /// The SKIP of a resolved query.
    pub fn skip_value(&self) -> Option<usize> {
        match self.skip {
            Some(Count::Value(n)) => Some(n),
            _ => None,
        }
    }
}

fn resolve_count(count: Count, values: &[Value], clause: &str) -> Result<Count> {
    match count {
        Count::Value(_) => Ok(count),
        Count::Binder(i) => {
            let value = values
                .get(i)
                .ok_or_else(|| Error::invalid_query(format!("binder ?{} is not bound", i)))?;
            match value.as_i64() {
                Some(n) if n >= 0 => Ok(Count::Value(n as usize)),
                _ => Err(Error::invalid_query(format!(
                    "{} must be a non-negative integer, got {}",
                    clause, value
                ))),
            }
        }
    }
}

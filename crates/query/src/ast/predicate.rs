//! Predicate definitions for query filtering.
//!
//! A predicate is one of three shapes: a column compared with literals
//! (`ValuePredicate`), a column compared with a column of another table
//! (`JoinPredicate`) or an AND/OR of predicates (`CombinedPredicate`).
//! Every node carries a query-scoped id assigned by the query context, so
//! plan passes can refer to predicates across copies of the plan.

use crate::ast::column::{coerce, ColumnRef, Operand};
use crate::ast::evaluator::{EvaluatorFn, EvaluatorRegistry};
use crate::executor::{Relation, RelationEntry};
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use strata_core::{Error, Result, Value};
use strata_index::{KeyRange, SingleKeyRange};

/// Query-scoped predicate id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PredicateId(pub u32);

/// Evaluation type for predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalType {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Match,
    Between,
    In,
}

impl EvalType {
    /// The operator that holds after swapping the two sides.
    pub fn reverse(self) -> Self {
        match self {
            EvalType::Lt => EvalType::Gt,
            EvalType::Lte => EvalType::Gte,
            EvalType::Gt => EvalType::Lt,
            EvalType::Gte => EvalType::Lte,
            other => other,
        }
    }

    /// The logical negation of a comparison operator. MATCH, BETWEEN and
    /// IN have no operator negation and map to themselves.
    pub fn negate(self) -> Self {
        match self {
            EvalType::Eq => EvalType::Neq,
            EvalType::Neq => EvalType::Eq,
            EvalType::Lt => EvalType::Gte,
            EvalType::Lte => EvalType::Gt,
            EvalType::Gt => EvalType::Lte,
            EvalType::Gte => EvalType::Lt,
            other => other,
        }
    }

    /// True for the binary comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            EvalType::Eq | EvalType::Neq | EvalType::Lt | EvalType::Lte | EvalType::Gt | EvalType::Gte
        )
    }
}

impl fmt::Display for EvalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EvalType::Eq => "eq",
            EvalType::Neq => "neq",
            EvalType::Lt => "lt",
            EvalType::Lte => "lte",
            EvalType::Gt => "gt",
            EvalType::Gte => "gte",
            EvalType::Match => "match",
            EvalType::Between => "between",
            EvalType::In => "in",
        })
    }
}

/// A column compared with one or more literals.
#[derive(Clone, Debug, PartialEq)]
pub struct ValuePredicate {
    id: PredicateId,
    column: ColumnRef,
    eval_type: EvalType,
    operands: Vec<Operand>,
    is_complement: bool,
}

impl ValuePredicate {
    /// Creates a predicate. Literals are coerced to the column type.
    pub fn new(column: ColumnRef, eval_type: EvalType, operands: Vec<Operand>) -> Self {
        let data_type = column.data_type;
        let operands = operands
            .into_iter()
            .map(|op| match op {
                Operand::Value(v) => Operand::Value(coerce(v, data_type)),
                binder => binder,
            })
            .collect();
        Self {
            id: PredicateId::default(),
            column,
            eval_type,
            operands,
            is_complement: false,
        }
    }

    #[inline]
    pub fn id(&self) -> PredicateId {
        self.id
    }

    #[inline]
    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    #[inline]
    pub fn eval_type(&self) -> EvalType {
        self.eval_type
    }

    #[inline]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// True if this predicate has been negated.
    #[inline]
    pub fn is_complement(&self) -> bool {
        self.is_complement
    }

    /// Negates (or un-negates) this predicate.
    pub fn set_complement(&mut self, complement: bool) {
        self.is_complement = complement;
    }

    pub fn has_binders(&self) -> bool {
        self.operands.iter().any(|op| matches!(op, Operand::Binder(_)))
    }

    /// The literals, or an error naming the first unbound placeholder.
    pub fn literals(&self) -> Result<Vec<Value>> {
        self.operands
            .iter()
            .map(|op| match op {
                Operand::Value(v) => Ok(v.clone()),
                Operand::Binder(i) => Err(Error::invalid_query(format!("binder ?{} is not bound", i))),
            })
            .collect()
    }

    /// Replaces placeholders with `values[index]`.
    pub fn bind(&self, values: &[Value]) -> Result<Self> {
        let mut bound = self.clone();
        for op in bound.operands.iter_mut() {
            if let Operand::Binder(i) = op {
                let value = values
                    .get(*i)
                    .ok_or_else(|| Error::invalid_query(format!("binder ?{} is not bound", i)))?;
                *op = Operand::Value(coerce(value.clone(), self.column.data_type));
            }
        }
        Ok(bound)
    }

    /// Number of values an index would have to be probed for.
    pub fn value_count(&self) -> usize {
        match self.eval_type {
            EvalType::In => self.operands.len(),
            _ => 1,
        }
    }

    fn is_null_check(&self) -> bool {
        matches!(self.operands.as_slice(), [op] if op.is_null())
    }

    /// True if the predicate can be answered by scanning key ranges.
    pub fn is_key_range_compatible(&self) -> bool {
        !self.has_binders()
            && !self.operands.is_empty()
            && !self.operands.iter().any(Operand::is_null)
            && !matches!(self.eval_type, EvalType::Match)
            && (self.eval_type != EvalType::Between || self.operands.len() == 2)
    }

    /// The key ranges holding exactly the matching non-null values, sorted
    /// and disjoint. Empty for predicates that are not key range
    /// compatible.
    pub fn to_key_range(&self) -> Vec<KeyRange> {
        if !self.is_key_range_compatible() {
            return Vec::new();
        }
        let values: Vec<Value> = self.operands.iter().filter_map(|op| op.value().cloned()).collect();
        let first = values[0].clone();
        let ranges = match self.eval_type {
            EvalType::Eq => alloc::vec![SingleKeyRange::only(first)],
            EvalType::Neq => alloc::vec![
                SingleKeyRange::upper_bound(first.clone(), true),
                SingleKeyRange::lower_bound(first, true),
            ],
            EvalType::Lt => alloc::vec![SingleKeyRange::upper_bound(first, true)],
            EvalType::Lte => alloc::vec![SingleKeyRange::upper_bound(first, false)],
            EvalType::Gt => alloc::vec![SingleKeyRange::lower_bound(first, true)],
            EvalType::Gte => alloc::vec![SingleKeyRange::lower_bound(first, false)],
            EvalType::Between => alloc::vec![SingleKeyRange::between(first, values[1].clone())],
            EvalType::In => {
                let distinct: BTreeSet<Value> = values.into_iter().collect();
                distinct.into_iter().map(SingleKeyRange::only).collect()
            }
            EvalType::Match => Vec::new(),
        };
        if !self.is_complement {
            return ranges;
        }
        match self.eval_type {
            EvalType::Neq => alloc::vec![SingleKeyRange::only(first_value(&self.operands))],
            EvalType::In => SingleKeyRange::complement_all(&ranges),
            _ => ranges.first().map(SingleKeyRange::complement).unwrap_or_default(),
        }
    }

    fn display_operands(&self) -> String {
        match (self.eval_type, self.operands.as_slice()) {
            (EvalType::Between | EvalType::In, ops) => {
                let parts: Vec<String> = ops.iter().map(|op| format!("{}", op)).collect();
                format!("[{}]", parts.join(", "))
            }
            (_, [op]) => format!("{}", op),
            (_, ops) => {
                let parts: Vec<String> = ops.iter().map(|op| format!("{}", op)).collect();
                parts.join(", ")
            }
        }
    }
}

fn first_value(operands: &[Operand]) -> Value {
    operands
        .first()
        .and_then(Operand::value)
        .cloned()
        .unwrap_or(Value::Null)
}

/// A comparison between columns of two tables.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinPredicate {
    id: PredicateId,
    left: ColumnRef,
    right: ColumnRef,
    eval_type: EvalType,
}

impl JoinPredicate {
    pub fn new(left: ColumnRef, right: ColumnRef, eval_type: EvalType) -> Self {
        Self {
            id: PredicateId::default(),
            left,
            right,
            eval_type,
        }
    }

    #[inline]
    pub fn id(&self) -> PredicateId {
        self.id
    }

    #[inline]
    pub fn left(&self) -> &ColumnRef {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &ColumnRef {
        &self.right
    }

    #[inline]
    pub fn eval_type(&self) -> EvalType {
        self.eval_type
    }

    /// True for equi-joins, the only kind hash and index joins can run.
    pub fn is_equi_join(&self) -> bool {
        self.eval_type == EvalType::Eq
    }

    /// The same condition with the sides swapped: `a < b` becomes `b > a`.
    pub fn reverse(&self) -> Self {
        Self {
            id: self.id,
            left: self.right.clone(),
            right: self.left.clone(),
            eval_type: self.eval_type.reverse(),
        }
    }

    /// Evaluates the condition on two values. Nulls never match.
    pub fn matches_values(&self, evaluator: EvaluatorFn, left: &Value, right: &Value) -> bool {
        !left.is_null() && !right.is_null() && evaluator(left, core::slice::from_ref(right))
    }
}

/// How the children of a combined predicate are joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombineOp {
    And,
    Or,
}

impl CombineOp {
    fn flip(self) -> Self {
        match self {
            CombineOp::And => CombineOp::Or,
            CombineOp::Or => CombineOp::And,
        }
    }
}

/// An AND or OR of predicates.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedPredicate {
    id: PredicateId,
    op: CombineOp,
    children: Vec<Predicate>,
}

impl CombinedPredicate {
    #[inline]
    pub fn id(&self) -> PredicateId {
        self.id
    }

    #[inline]
    pub fn op(&self) -> CombineOp {
        self.op
    }

    #[inline]
    pub fn children(&self) -> &[Predicate] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Predicate> {
        self.children
    }
}

/// A filter or join condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Value(ValuePredicate),
    Join(JoinPredicate),
    Combined(CombinedPredicate),
}

impl Predicate {
    /// Creates an AND/OR of `children`.
    pub fn combined(op: CombineOp, children: Vec<Predicate>) -> Self {
        Predicate::Combined(CombinedPredicate {
            id: PredicateId::default(),
            op,
            children,
        })
    }

    pub fn id(&self) -> PredicateId {
        match self {
            Predicate::Value(p) => p.id,
            Predicate::Join(p) => p.id,
            Predicate::Combined(p) => p.id,
        }
    }

    /// Gives every node of this predicate a fresh id from `next`.
    pub fn assign_ids(&mut self, next: &mut dyn FnMut() -> PredicateId) {
        match self {
            Predicate::Value(p) => p.id = next(),
            Predicate::Join(p) => p.id = next(),
            Predicate::Combined(p) => {
                p.id = next();
                for child in p.children.iter_mut() {
                    child.assign_ids(next);
                }
            }
        }
    }

    /// `self AND other`.
    pub fn and(self, other: Predicate) -> Predicate {
        and(alloc::vec![self, other])
    }

    /// `self OR other`.
    pub fn or(self, other: Predicate) -> Predicate {
        or(alloc::vec![self, other])
    }

    /// The logical negation. Value predicates are flagged as complemented,
    /// join predicates get the negated operator and combined predicates are
    /// rewritten by De Morgan's laws.
    pub fn not(self) -> Predicate {
        match self {
            Predicate::Value(mut p) => {
                p.is_complement = !p.is_complement;
                Predicate::Value(p)
            }
            Predicate::Join(mut p) => {
                p.eval_type = p.eval_type.negate();
                Predicate::Join(p)
            }
            Predicate::Combined(p) => Predicate::Combined(CombinedPredicate {
                id: p.id,
                op: p.op.flip(),
                children: p.children.into_iter().map(Predicate::not).collect(),
            }),
        }
    }

    /// Columns referenced anywhere in this predicate.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        match self {
            Predicate::Value(p) => alloc::vec![&p.column],
            Predicate::Join(p) => alloc::vec![&p.left, &p.right],
            Predicate::Combined(p) => p.children.iter().flat_map(|c| c.columns()).collect(),
        }
    }

    /// Table names (or aliases) referenced, sorted and deduplicated.
    pub fn tables(&self) -> BTreeSet<&str> {
        self.columns().into_iter().map(|c| c.scope()).collect()
    }

    pub fn has_binders(&self) -> bool {
        match self {
            Predicate::Value(p) => p.has_binders(),
            Predicate::Join(_) => false,
            Predicate::Combined(p) => p.children.iter().any(Predicate::has_binders),
        }
    }

    /// Replaces placeholders with bound values.
    pub fn bind(&self, values: &[Value]) -> Result<Predicate> {
        Ok(match self {
            Predicate::Value(p) => Predicate::Value(p.bind(values)?),
            Predicate::Join(p) => Predicate::Join(p.clone()),
            Predicate::Combined(p) => Predicate::Combined(CombinedPredicate {
                id: p.id,
                op: p.op,
                children: p
                    .children
                    .iter()
                    .map(|c| c.bind(values))
                    .collect::<Result<Vec<_>>>()?,
            }),
        })
    }

    /// True if the predicate can be answered by scanning key ranges of a
    /// single column. An OR qualifies only when every branch is a
    /// compatible value predicate on the same column.
    pub fn is_key_range_compatible(&self) -> bool {
        match self {
            Predicate::Value(p) => p.is_key_range_compatible(),
            Predicate::Join(_) => false,
            Predicate::Combined(p) if p.op == CombineOp::Or => {
                let mut columns = p.children.iter().map(|c| match c {
                    Predicate::Value(v) if v.is_key_range_compatible() => Some(&v.column),
                    _ => None,
                });
                let Some(Some(first)) = columns.next() else {
                    return false;
                };
                columns.all(|c| c == Some(first))
            }
            Predicate::Combined(_) => false,
        }
    }

    /// The column a key-range compatible predicate constrains.
    pub fn key_range_column(&self) -> Option<&ColumnRef> {
        if !self.is_key_range_compatible() {
            return None;
        }
        match self {
            Predicate::Value(p) => Some(&p.column),
            Predicate::Combined(p) => p.children.first().and_then(|c| c.key_range_column()),
            Predicate::Join(_) => None,
        }
    }

    /// Number of index probes needed to answer this predicate.
    pub fn value_count(&self) -> usize {
        match self {
            Predicate::Value(p) => p.value_count(),
            Predicate::Join(_) => 1,
            Predicate::Combined(p) => p.children.iter().map(Predicate::value_count).sum(),
        }
    }

    /// Sorted, disjoint key ranges covering exactly the matching values.
    pub fn to_key_range(&self) -> Vec<KeyRange> {
        match self {
            Predicate::Value(p) => p.to_key_range(),
            Predicate::Combined(p) if self.is_key_range_compatible() => {
                let mut ranges: Vec<KeyRange> =
                    p.children.iter().flat_map(|c| c.to_key_range()).collect();
                ranges.sort_by(|a, b| a.compare(b));
                merge_overlapping(ranges)
            }
            _ => Vec::new(),
        }
    }

    /// Filters `relation` down to the entries satisfying this predicate.
    pub fn eval(&self, registry: &EvaluatorRegistry, relation: &Relation) -> Result<Relation> {
        let compiled = Compiled::new(self, registry, relation)?;
        let entries = relation
            .entries
            .iter()
            .filter(|e| compiled.matches(e))
            .cloned()
            .collect();
        Ok(relation.with_entries(entries))
    }
}

fn merge_overlapping(ranges: Vec<KeyRange>) -> Vec<KeyRange> {
    let mut merged: Vec<KeyRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if last.overlaps(&range) => {
                *last = SingleKeyRange::get_bounding_range(last, &range);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Splices children that are themselves `op` into the parent list.
fn flatten(op: CombineOp, children: Vec<Predicate>) -> Vec<Predicate> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Predicate::Combined(c) if c.op == op => flat.extend(c.children),
            other => flat.push(other),
        }
    }
    flat
}

/// `AND` of `children`, flattening nested ANDs. A single child is
/// returned as is.
pub fn and(children: Vec<Predicate>) -> Predicate {
    let mut children = flatten(CombineOp::And, children);
    if children.len() == 1 {
        return children.remove(0);
    }
    Predicate::combined(CombineOp::And, children)
}

/// `OR` of `children`, flattening nested ORs. A single child is returned
/// as is.
pub fn or(children: Vec<Predicate>) -> Predicate {
    let mut children = flatten(CombineOp::Or, children);
    if children.len() == 1 {
        return children.remove(0);
    }
    Predicate::combined(CombineOp::Or, children)
}

/// `NOT predicate`.
pub fn not(predicate: Predicate) -> Predicate {
    predicate.not()
}

/// A predicate resolved against one relation's layout.
enum Compiled {
    Value {
        position: usize,
        evaluator: Option<EvaluatorFn>,
        args: Vec<Value>,
        null_check: bool,
        eval_type: EvalType,
        complement: bool,
    },
    Join {
        left: usize,
        right: usize,
        evaluator: EvaluatorFn,
    },
    All(Vec<Compiled>),
    Any(Vec<Compiled>),
}

impl Compiled {
    fn new(predicate: &Predicate, registry: &EvaluatorRegistry, relation: &Relation) -> Result<Self> {
        Ok(match predicate {
            Predicate::Value(p) => {
                let null_check = p.is_null_check();
                Compiled::Value {
                    position: relation.require_position(&p.column)?,
                    evaluator: if null_check {
                        None
                    } else {
                        Some(registry.get(p.column.data_type, p.eval_type)?)
                    },
                    args: p.literals()?,
                    null_check,
                    eval_type: p.eval_type,
                    complement: p.is_complement,
                }
            }
            Predicate::Join(p) => Compiled::Join {
                left: relation.require_position(&p.left)?,
                right: relation.require_position(&p.right)?,
                evaluator: registry.get(p.left.data_type, p.eval_type)?,
            },
            Predicate::Combined(p) => {
                let children = p
                    .children
                    .iter()
                    .map(|c| Compiled::new(c, registry, relation))
                    .collect::<Result<Vec<_>>>()?;
                match p.op {
                    CombineOp::And => Compiled::All(children),
                    CombineOp::Or => Compiled::Any(children),
                }
            }
        })
    }

    fn matches(&self, entry: &RelationEntry) -> bool {
        match self {
            Compiled::Value {
                position,
                evaluator,
                args,
                null_check,
                eval_type,
                complement,
            } => {
                let value = entry.get_field(*position).unwrap_or(&Value::Null);
                if *null_check {
                    // `eq(null)` is IS NULL, `neq(null)` is IS NOT NULL.
                    let hit = match eval_type {
                        EvalType::Eq => value.is_null(),
                        EvalType::Neq => !value.is_null(),
                        _ => false,
                    };
                    return hit != *complement;
                }
                if value.is_null() {
                    return false;
                }
                evaluator.is_some_and(|f| f(value, args) != *complement)
            }
            Compiled::Join { left, right, evaluator } => {
                match (entry.get_field(*left), entry.get_field(*right)) {
                    (Some(l), Some(r)) => {
                        !l.is_null() && !r.is_null() && evaluator(l, core::slice::from_ref(r))
                    }
                    _ => false,
                }
            }
            Compiled::All(children) => children.iter().all(|c| c.matches(entry)),
            Compiled::Any(children) => children.iter().any(|c| c.matches(entry)),
        }
    }
}

impl fmt::Display for ValuePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.is_complement { "not " } else { "" };
        write!(
            f,
            "value_pred({} {}{} {})",
            self.column,
            not,
            self.eval_type,
            self.display_operands()
        )
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "join_pred({} {} {})", self.left, self.eval_type, self.right)
    }
}

impl fmt::Display for CombinedPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            CombineOp::And => f.write_str("combined_pred_and"),
            CombineOp::Or => f.write_str("combined_pred_or"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Value(p) => p.fmt(f),
            Predicate::Join(p) => p.fmt(f),
            Predicate::Combined(p) => p.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::column::bind;
    use alloc::string::ToString;
    use alloc::vec;
    use strata_core::schema::{Table, TableBuilder};
    use strata_core::{DataType, Row};

    fn employee() -> Table {
        TableBuilder::new("Employee")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("salary", DataType::Float64)
            .unwrap()
            .add_nullable(&["salary"])
            .build()
            .unwrap()
    }

    fn column(name: &str) -> ColumnRef {
        ColumnRef::of(&employee(), name).unwrap()
    }

    fn relation() -> Relation {
        let rows = vec![
            Row::new(1, vec![Value::Int64(1), "Alice".into(), Value::Float64(100.0)]),
            Row::new(2, vec![Value::Int64(2), "Bob".into(), Value::Null]),
            Row::new(3, vec![Value::Int64(3), "Carol".into(), Value::Float64(300.0)]),
        ];
        Relation::from_rows_owned(rows, "Employee", 3)
    }

    fn ids(relation: &Relation) -> Vec<u64> {
        relation.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_display() {
        let id = column("id");
        assert_eq!(id.gt(100i64).to_string(), "value_pred(Employee.id gt 100)");
        assert_eq!(id.in_list([1i64, 2]).to_string(), "value_pred(Employee.id in [1, 2])");
        assert_eq!(id.gt(1i64).not().to_string(), "value_pred(Employee.id not gt 1)");
        let other = ColumnRef::of(&employee(), "id").unwrap().with_alias("e2");
        assert_eq!(id.eq_col(&other).to_string(), "join_pred(Employee.id eq e2.id)");
        assert_eq!(id.eq(1i64).or(id.eq(2i64)).to_string(), "combined_pred_or");
    }

    #[test]
    fn test_eval_value_predicates() {
        let registry = EvaluatorRegistry::new();
        let r = relation();

        let p = column("id").gte(2i64);
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![2, 3]);

        let p = column("name").matches("^[AB]");
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![1, 2]);

        // Nulls never satisfy a comparison, negated or not.
        let p = column("salary").gt(150.0);
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![3]);
        let p = column("salary").gt(150.0).not();
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![1]);

        let p = column("salary").is_null();
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![2]);
        let p = column("salary").is_null().not();
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![1, 3]);
    }

    #[test]
    fn test_eval_combined() {
        let registry = EvaluatorRegistry::new();
        let r = relation();
        let id = column("id");

        let p = id.eq(1i64).or(id.eq(3i64));
        assert_eq!(ids(&p.eval(&registry, &r).unwrap()), vec![1, 3]);

        // De Morgan: NOT (id = 1 OR id = 3) is id <> 1 AND id <> 3.
        let negated = p.not();
        assert!(matches!(&negated, Predicate::Combined(c) if c.op() == CombineOp::And));
        assert_eq!(ids(&negated.eval(&registry, &r).unwrap()), vec![2]);
    }

    #[test]
    fn test_eval_reports_unbound_binders() {
        let registry = EvaluatorRegistry::new();
        let p = column("id").eq(bind(0));
        assert!(matches!(
            p.eval(&registry, &relation()),
            Err(Error::InvalidQuery { .. })
        ));
        let bound = p.bind(&[Value::Int64(2)]).unwrap();
        assert_eq!(ids(&bound.eval(&registry, &relation()).unwrap()), vec![2]);
        assert!(p.bind(&[]).is_err());
    }

    #[test]
    fn test_eval_on_foreign_relation_is_internal_error() {
        let registry = EvaluatorRegistry::new();
        let other = Relation::from_rows_owned(vec![], "Department", 2);
        assert!(matches!(
            column("id").eq(1i64).eval(&registry, &other),
            Err(Error::Internal { .. })
        ));
    }

    #[test]
    fn test_key_ranges() {
        let id = column("id");
        assert_eq!(id.gt(100i64).to_key_range()[0].to_string(), "(100, unbound]");
        assert_eq!(id.lte(5i64).to_key_range()[0].to_string(), "[unbound, 5]");
        assert_eq!(id.between(1i64, 5i64).to_key_range()[0].to_string(), "[1, 5]");

        let neq: Vec<String> = id.neq(3i64).to_key_range().iter().map(|r| r.to_string()).collect();
        assert_eq!(neq, vec!["[unbound, 3)", "(3, unbound]"]);

        let in_list: Vec<String> =
            id.in_list([3i64, 1, 3]).to_key_range().iter().map(|r| r.to_string()).collect();
        assert_eq!(in_list, vec!["[1, 1]", "[3, 3]"]);

        let not_in: Vec<String> = id
            .in_list([1i64, 3])
            .not()
            .to_key_range()
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(not_in, vec!["[unbound, 1)", "(1, 3)", "(3, unbound]"]);

        assert_eq!(id.gt(100i64).not().to_key_range()[0].to_string(), "[unbound, 100]");
    }

    #[test]
    fn test_key_range_compatibility() {
        let id = column("id");
        let name = column("name");
        assert!(id.eq(1i64).is_key_range_compatible());
        assert!(!id.is_null().is_key_range_compatible());
        assert!(!name.matches("a").is_key_range_compatible());
        assert!(!id.eq(bind(0)).is_key_range_compatible());

        assert!(id.eq(1i64).or(id.gt(5i64)).is_key_range_compatible());
        assert!(!id.eq(1i64).or(name.eq("a")).is_key_range_compatible());
        assert!(!id.eq(1i64).and(id.gt(5i64)).is_key_range_compatible());

        let merged: Vec<String> = id
            .between(1i64, 5i64)
            .or(id.between(3i64, 8i64))
            .or(id.eq(10i64))
            .to_key_range()
            .iter()
            .map(|r| r.to_string())
            .collect();
        assert_eq!(merged, vec!["[1, 8]", "[10, 10]"]);
    }

    #[test]
    fn test_join_predicate_reverse() {
        let left = column("id");
        let right = column("salary").with_alias("e2");
        let Predicate::Join(p) = left.compare_col(EvalType::Gt, &right) else {
            panic!("expected a join predicate");
        };
        let reversed = p.reverse();
        assert_eq!(reversed.to_string(), "join_pred(e2.salary lt Employee.id)");
        assert_eq!(reversed.reverse(), p);
        assert_eq!(p.eval_type(), EvalType::Gt);
    }

    #[test]
    fn test_assign_ids() {
        let id = column("id");
        let mut p = id.eq(1i64).or(id.eq(2i64));
        let mut next = 0u32;
        p.assign_ids(&mut || {
            next += 1;
            PredicateId(next)
        });
        assert_eq!(p.id(), PredicateId(1));
        let Predicate::Combined(c) = &p else { unreachable!() };
        assert_eq!(c.children()[1].id(), PredicateId(3));
    }
}

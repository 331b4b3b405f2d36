//! AST module for column references, predicates and aggregates.

pub mod aggregate;
mod column;
mod evaluator;
mod predicate;

pub use aggregate::{AggregateColumn, AggregateFunc};
pub use column::{bind, col, Binder, ColumnRef, Operand};
pub use evaluator::{EvaluatorFn, EvaluatorRegistry};
pub use predicate::{
    and, not, or, CombineOp, CombinedPredicate, EvalType, JoinPredicate, Predicate, PredicateId,
    ValuePredicate,
};

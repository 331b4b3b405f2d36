//! Join algorithms.
//!
//! All three produce entries laid out as the left input's tables followed
//! by the right input's, whichever side they iterate over.

mod hash;
mod index_nested;
mod nested;

pub use hash::hash_join;
pub use index_nested::{index_nested_loop_join, IndexLookup};
pub use nested::nested_loop_join;

use crate::ast::JoinPredicate;
use crate::executor::Relation;
use alloc::format;
use strata_core::{Error, Result};

/// Two join inputs with the predicate oriented to them: its left column
/// is read from `left`, its right column from `right`.
pub struct JoinInput<'r> {
    pub left: &'r Relation,
    pub right: &'r Relation,
    pub predicate: JoinPredicate,
    pub left_pos: usize,
    pub right_pos: usize,
}

impl<'r> JoinInput<'r> {
    /// Orients `predicate` to the relations. Fails if its columns do not
    /// come from one side each.
    pub fn new(left: &'r Relation, right: &'r Relation, predicate: &JoinPredicate) -> Result<Self> {
        let (l, r) = (predicate.left().scope(), predicate.right().scope());
        let predicate = if left.contains_table(l) && right.contains_table(r) {
            predicate.clone()
        } else if left.contains_table(r) && right.contains_table(l) {
            predicate.reverse()
        } else {
            return Err(Error::internal(format!(
                "join predicate {} does not match the joined relations",
                predicate
            )));
        };
        Ok(Self {
            left_pos: left.require_position(predicate.left())?,
            right_pos: right.require_position(predicate.right())?,
            left,
            right,
            predicate,
        })
    }

    /// Whether the right input should drive the iteration: only for inner
    /// joins, and only when it is the larger input.
    pub fn swap_roles(&self, outer: bool) -> bool {
        !outer && self.right.len() > self.left.len()
    }

    /// An empty relation with the combined layout.
    pub fn output(&self) -> Result<Relation> {
        Relation::combined_layout(self.left, self.right)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::keyed;
    use super::*;
    use crate::ast::{col, EvalType, Predicate};
    use strata_core::schema::{Schema, TableBuilder};
    use strata_core::DataType;

    fn schema() -> Schema {
        let table = |name: &str| {
            TableBuilder::new(name)
                .unwrap()
                .add_column("id", DataType::Int64)
                .unwrap()
                .add_column("key", DataType::Int64)
                .unwrap()
                .add_nullable(&["key"])
                .build()
                .unwrap()
        };
        Schema::new().add_table(table("A")).unwrap().add_table(table("B")).unwrap()
    }

    fn join_pred(p: Predicate) -> JoinPredicate {
        match p {
            Predicate::Join(j) => j,
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_predicate_oriented_to_inputs() {
        let schema = schema();
        let a = col(&schema, "A", "key").unwrap();
        let b = col(&schema, "B", "key").unwrap();
        let left = keyed("A", 1, &[Some(1)]);
        let right = keyed("B", 10, &[Some(1), Some(2)]);

        let pred = join_pred(b.compare_col(EvalType::Lt, &a));
        let input = JoinInput::new(&left, &right, &pred).unwrap();
        assert_eq!(input.predicate.left().scope(), "A");
        assert_eq!(input.predicate.eval_type(), EvalType::Gt);
        assert_eq!((input.left_pos, input.right_pos), (1, 1));
        assert!(input.swap_roles(false));
        assert!(!input.swap_roles(true));
        assert_eq!(input.output().unwrap().width(), 4);
    }

    #[test]
    fn test_mismatched_predicate_is_internal_error() {
        let schema = schema();
        let a = col(&schema, "A", "key").unwrap();
        let b = col(&schema, "B", "key").unwrap();
        let left = keyed("A", 1, &[Some(1)]);
        let other = keyed("A", 5, &[Some(1)]);
        let pred = join_pred(a.eq_col(&b));
        assert!(matches!(JoinInput::new(&left, &other, &pred), Err(Error::Internal { .. })));
    }
}

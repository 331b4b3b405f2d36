//! Blocked nested-loop join.

use super::JoinInput;
use crate::ast::EvaluatorRegistry;
use crate::executor::{EntryIdGenerator, Relation, RelationEntry};
use alloc::vec;
use strata_core::Result;

/// Joins the inputs on any comparison predicate.
///
/// The inner side is scanned in blocks of `block_size` entries so a block
/// stays hot while every driving entry is compared against it. For an
/// outer join, left entries that matched nothing in any block are padded
/// with nulls once all blocks are done.
pub fn nested_loop_join(
    input: &JoinInput<'_>,
    registry: &EvaluatorRegistry,
    ids: &mut EntryIdGenerator,
    outer: bool,
    block_size: usize,
) -> Result<Relation> {
    let mut output = input.output()?;
    let swap = input.swap_roles(outer);
    let predicate = if swap { input.predicate.reverse() } else { input.predicate.clone() };
    let evaluator = registry.get(predicate.left().data_type, predicate.eval_type())?;

    let (driving, driving_pos, inner, inner_pos) = if swap {
        (input.right, input.right_pos, input.left, input.left_pos)
    } else {
        (input.left, input.left_pos, input.right, input.right_pos)
    };

    let mut matched = vec![false; driving.len()];
    for block in inner.entries.chunks(block_size.max(1)) {
        for (i, d) in driving.iter().enumerate() {
            let Some(dv) = d.get_field(driving_pos) else {
                continue;
            };
            if dv.is_null() {
                continue;
            }
            for e in block {
                let Some(ev) = e.get_field(inner_pos) else {
                    continue;
                };
                if !predicate.matches_values(evaluator, dv, ev) {
                    continue;
                }
                matched[i] = true;
                let entry = if swap {
                    RelationEntry::combine(ids, e, d)
                } else {
                    RelationEntry::combine(ids, d, e)
                };
                output.push(entry);
            }
        }
    }

    if outer {
        let right_width = input.right.width();
        for (d, _) in driving.iter().zip(&matched).filter(|(_, m)| !**m) {
            output.push(RelationEntry::combine_with_null(ids, d, right_width));
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{keyed, sorted_rows};
    use super::*;
    use crate::ast::{col, EvalType, JoinPredicate, Predicate};
    use strata_core::schema::{Schema, TableBuilder};
    use strata_core::{DataType, Value};

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

    fn pred(schema: &Schema, eval_type: EvalType) -> JoinPredicate {
        let a = col(schema, "A", "key").unwrap();
        let b = col(schema, "B", "key").unwrap();
        match a.compare_col(eval_type, &b) {
            Predicate::Join(j) => j,
            other => panic!("unexpected {}", other),
        }
    }

    #[test]
    fn test_equi_join_across_blocks() {
        let schema = schema();
        let left = keyed("A", 1, &[Some(1), Some(2), None, Some(3)]);
        let right = keyed("B", 10, &[Some(2), Some(3), Some(3), None, Some(9)]);
        let p = pred(&schema, EvalType::Eq);
        let input = JoinInput::new(&left, &right, &p).unwrap();
        let registry = EvaluatorRegistry::new();
        let mut ids = EntryIdGenerator::new();

        let small_blocks = nested_loop_join(&input, &registry, &mut ids, false, 2).unwrap();
        let one_block = nested_loop_join(&input, &registry, &mut ids, false, 256).unwrap();
        assert_eq!(small_blocks.len(), 3);
        assert_eq!(sorted_rows(&small_blocks), sorted_rows(&one_block));
        for row in small_blocks.to_values() {
            assert_eq!(row[1], row[3]);
        }
    }

    #[test]
    fn test_non_equi_join_keeps_layout_when_swapped() {
        let schema = schema();
        let left = keyed("A", 1, &[Some(5)]);
        let right = keyed("B", 10, &[Some(1), Some(6), Some(7)]);
        let p = pred(&schema, EvalType::Lt);
        let input = JoinInput::new(&left, &right, &p).unwrap();
        assert!(input.swap_roles(false));

        let out = nested_loop_join(&input, &EvaluatorRegistry::new(), &mut EntryIdGenerator::new(), false, 2).unwrap();
        assert_eq!(out.tables(), &["A", "B"]);
        let mut right_keys: alloc::vec::Vec<_> = out.to_values().into_iter().map(|r| r[3].clone()).collect();
        right_keys.sort();
        assert_eq!(right_keys, vec![Value::Int64(6), Value::Int64(7)]);
    }

    #[test]
    fn test_outer_join_pads_unmatched() {
        let schema = schema();
        let left = keyed("A", 1, &[Some(1), None, Some(4)]);
        let right = keyed("B", 10, &[Some(1), Some(1)]);
        let p = pred(&schema, EvalType::Eq);
        let input = JoinInput::new(&left, &right, &p).unwrap();

        let out = nested_loop_join(&input, &EvaluatorRegistry::new(), &mut EntryIdGenerator::new(), true, 1).unwrap();
        assert_eq!(out.len(), 4);
        let padded = out.to_values().into_iter().filter(|r| r[2].is_null() && r[3].is_null()).count();
        assert_eq!(padded, 2);
    }
}

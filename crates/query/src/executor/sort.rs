//! ORDER BY over entries or over groups.

use crate::context::{OrderKey, Projection};
use crate::executor::{aggregate, Relation, RelationEntry};
use alloc::string::ToString;
use alloc::vec::Vec;
use core::cmp::Ordering;
use strata_core::{Result, Value};

/// Sorts the entries of `relation` by the column keys. Sorting is stable
/// and nulls come first in ascending order.
pub fn sort_entries(relation: &mut Relation, keys: &[OrderKey]) -> Result<()> {
    let mut positions = Vec::with_capacity(keys.len());
    for key in keys {
        // An aggregate is constant over a single relation.
        if let Projection::Column(c) = &key.key {
            positions.push((relation.require_position(c)?, key.order));
        }
    }
    relation.entries.sort_by(|a, b| {
        positions
            .iter()
            .map(|(pos, order)| order.apply(field(a, *pos).cmp(field(b, *pos))))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    Ok(())
}

/// Sorts grouped relations. A column key compares the group's first
/// entry; an aggregate key compares the group's aggregate value.
pub fn sort_groups(groups: &mut [Relation], keys: &[OrderKey]) -> Result<()> {
    let mut sort_keys: Vec<Vec<Value>> = Vec::with_capacity(groups.len());
    for group in groups.iter_mut() {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(group_value(group, &key.key)?);
        }
        sort_keys.push(values);
    }
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|a, b| {
        keys.iter()
            .enumerate()
            .map(|(i, k)| k.order.apply(sort_keys[*a][i].cmp(&sort_keys[*b][i])))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    apply_permutation(groups, &order);
    Ok(())
}

/// The value a group shows for `projection`, computing aggregates that
/// are not memoized yet.
pub fn group_value(group: &mut Relation, projection: &Projection) -> Result<Value> {
    match projection {
        Projection::Column(c) => {
            let pos = group.require_position(c)?;
            Ok(group
                .entries
                .first()
                .and_then(|e| e.get_field(pos))
                .cloned()
                .unwrap_or(Value::Null))
        }
        Projection::Aggregate(agg) => {
            aggregate::memoize(core::slice::from_ref(agg), group)?;
            Ok(group.get_aggregate(&agg.to_string()).cloned().unwrap_or(Value::Null))
        }
    }
}

fn field(entry: &RelationEntry, pos: usize) -> &Value {
    entry.get_field(pos).unwrap_or(&Value::Null)
}

fn apply_permutation(groups: &mut [Relation], order: &[usize]) {
    let mut taken: Vec<Option<Relation>> = groups.iter_mut().map(|g| Some(core::mem::take(g))).collect();
    for (slot, &from) in groups.iter_mut().zip(order) {
        if let Some(g) = taken[from].take() {
            *slot = g;
        }
    }
}

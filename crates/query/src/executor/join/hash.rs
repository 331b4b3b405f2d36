//! Hash join for equality predicates.

use super::JoinInput;
use crate::executor::{EntryIdGenerator, Relation, RelationEntry};
use alloc::format;
use alloc::vec::Vec;
use hashbrown::HashMap;
use strata_core::{Error, Result, Value};

/// Joins the inputs on an equality predicate.
///
/// The smaller input is hashed on its join column and the other one
/// probes it. Outer joins always hash the right input, so every left
/// entry is a probe and unmatched ones can be padded with nulls.
pub fn hash_join(input: &JoinInput<'_>, ids: &mut EntryIdGenerator, outer: bool) -> Result<Relation> {
    if !input.predicate.is_equi_join() {
        return Err(Error::internal(format!(
            "hash join on non-equality predicate {}",
            input.predicate
        )));
    }
    let mut output = input.output()?;
    let build_left = input.swap_roles(outer);
    let (build, build_pos, probe, probe_pos) = if build_left {
        (input.left, input.left_pos, input.right, input.right_pos)
    } else {
        (input.right, input.right_pos, input.left, input.left_pos)
    };

    let mut table: HashMap<&Value, Vec<&RelationEntry>> = HashMap::with_capacity(build.len());
    for entry in build.iter() {
        if let Some(key) = entry.get_field(build_pos).filter(|v| !v.is_null()) {
            table.entry(key).or_default().push(entry);
        }
    }

    let right_width = input.right.width();
    for p in probe.iter() {
        let matches = p
            .get_field(probe_pos)
            .filter(|v| !v.is_null())
            .and_then(|key| table.get(key));
        match matches {
            Some(entries) => {
                for b in entries {
                    let entry = if build_left {
                        RelationEntry::combine(ids, b, p)
                    } else {
                        RelationEntry::combine(ids, p, b)
                    };
                    output.push(entry);
                }
            }
            None if outer => output.push(RelationEntry::combine_with_null(ids, p, right_width)),
            None => {}
        }
    }
    Ok(output)
}

//! Index nested-loop join.

use crate::executor::{EntryIdGenerator, Relation, RelationEntry};
use crate::planner::JoinSide;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use strata_core::{Result, Row, Value};
use strata_index::{Index, SingleKeyRange};
use strata_storage::RowCache;

/// The indexed input of an index nested-loop join: a whole table, read
/// through one of its indices instead of being scanned.
pub struct IndexLookup<'s> {
    pub index: &'s dyn Index,
    /// Number of columns in the index key; the join column is the first.
    pub key_width: usize,
    pub cache: &'s RowCache,
    /// The table's scope in the query.
    pub scope: String,
    pub column_count: usize,
}

impl IndexLookup<'_> {
    /// The layout of the indexed table as a relation.
    pub fn layout(&self) -> Relation {
        Relation::new(alloc::vec![self.scope.clone()], alloc::vec![self.column_count])
    }

    fn probe(&self, key: &Value) -> Vec<Rc<Row>> {
        if self.key_width == 1 {
            let ids = self.index.get(core::slice::from_ref(key));
            if self.index.is_unique_key() {
                return ids.first().and_then(|id| self.cache.get(*id)).into_iter().collect();
            }
            return self.cache.get_many(&ids).into_iter().flatten().collect();
        }
        let mut ranges = Vec::with_capacity(self.key_width);
        ranges.push(SingleKeyRange::only(key.clone()));
        ranges.resize(self.key_width, SingleKeyRange::all());
        let ids = self.index.get_range(&ranges, false, None, 0);
        self.cache.get_many(&ids).into_iter().flatten().collect()
    }
}

/// Joins `outer` against the indexed table on equality of the value at
/// `outer_pos` with the index's first key column.
///
/// `indexed` says which side of the join the indexed table is on, and so
/// the order entries are combined in. Only a right-hand indexed table can
/// take part in an outer join; unmatched outer entries are then padded
/// with nulls.
pub fn index_nested_loop_join(
    outer_rel: &Relation,
    outer_pos: usize,
    lookup: &IndexLookup<'_>,
    indexed: JoinSide,
    outer_join: bool,
    ids: &mut EntryIdGenerator,
) -> Result<Relation> {
    let indexed_layout = lookup.layout();
    let mut output = match indexed {
        JoinSide::Right => Relation::combined_layout(outer_rel, &indexed_layout)?,
        JoinSide::Left => Relation::combined_layout(&indexed_layout, outer_rel)?,
    };
    let pad = outer_join && indexed == JoinSide::Right;

    for entry in outer_rel.iter() {
        let rows = match entry.get_field(outer_pos) {
            Some(key) if !key.is_null() => lookup.probe(key),
            _ => Vec::new(),
        };
        if rows.is_empty() && pad {
            output.push(RelationEntry::combine_with_null(ids, entry, lookup.column_count));
            continue;
        }
        for row in rows {
            let found = RelationEntry::from_row(row);
            let combined = match indexed {
                JoinSide::Right => RelationEntry::combine(ids, entry, &found),
                JoinSide::Left => RelationEntry::combine(ids, &found, entry),
            };
            output.push(combined);
        }
    }
    Ok(output)
}

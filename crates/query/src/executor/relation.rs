//! Relation and RelationEntry types for query execution.
//!
//! A relation is what flows between plan steps. Every entry holds one flat
//! row; entries of a joined relation hold the concatenation of the joined
//! rows, and the relation records which tables contributed which column
//! span, in order.

use crate::ast::ColumnRef;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;
use strata_core::{Error, Result, Row, RowId, Value};

/// Identifies an entry within a query execution.
pub type EntryId = u64;

/// First id handed out for combined entries. Entries read from a table
/// keep their row id, which stays below this.
pub const COMBINED_ENTRY_BASE: EntryId = 1 << 62;

/// Allocates increasing ids for combined entries.
#[derive(Clone, Debug)]
pub struct EntryIdGenerator {
    next: EntryId,
}

impl Default for EntryIdGenerator {
    fn default() -> Self {
        Self {
            next: COMBINED_ENTRY_BASE,
        }
    }
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> EntryId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A relation entry wraps a row with its id.
#[derive(Clone, Debug)]
pub struct RelationEntry {
    id: EntryId,
    /// The underlying row (reference counted for efficient sharing).
    pub row: Rc<Row>,
    /// Whether this entry is from a joined relation.
    pub is_combined: bool,
}

impl RelationEntry {
    /// Creates an entry for a stored row.
    pub fn from_row(row: Rc<Row>) -> Self {
        Self {
            id: row.id(),
            row,
            is_combined: false,
        }
    }

    /// Creates an entry for an owned row.
    pub fn from_row_owned(row: Row) -> Self {
        Self::from_row(Rc::new(row))
    }

    /// Creates an entry with an explicit id.
    pub fn with_id(id: EntryId, row: Row) -> Self {
        Self {
            id,
            row: Rc::new(row),
            is_combined: false,
        }
    }

    #[inline]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Row id of a stored row. Meaningless for combined entries.
    #[inline]
    pub fn row_id(&self) -> RowId {
        self.row.id()
    }

    /// Gets a field value by flat column position.
    #[inline]
    pub fn get_field(&self, index: usize) -> Option<&Value> {
        self.row.get(index)
    }

    /// Combines two entries into a joined entry.
    pub fn combine(ids: &mut EntryIdGenerator, left: &RelationEntry, right: &RelationEntry) -> Self {
        let left_values = left.row.values();
        let right_values = right.row.values();
        let mut values = Vec::with_capacity(left_values.len() + right_values.len());
        values.extend(left_values.iter().cloned());
        values.extend(right_values.iter().cloned());
        let id = ids.next_id();
        Self {
            id,
            row: Rc::new(Row::new(id, values)),
            is_combined: true,
        }
    }

    /// Combines `left` with an all-null right side of `right_width` columns
    /// (for outer joins).
    pub fn combine_with_null(ids: &mut EntryIdGenerator, left: &RelationEntry, right_width: usize) -> Self {
        let left_values = left.row.values();
        let total = left_values.len() + right_width;
        let mut values = Vec::with_capacity(total);
        values.extend(left_values.iter().cloned());
        values.resize(total, Value::Null);
        let id = ids.next_id();
        Self {
            id,
            row: Rc::new(Row::new(id, values)),
            is_combined: true,
        }
    }
}

/// A relation is a collection of entries with table context.
#[derive(Clone, Debug, Default)]
pub struct Relation {
    /// The entries in this relation.
    pub entries: Vec<RelationEntry>,
    /// Table names (or aliases) in this relation.
    tables: Vec<String>,
    /// The i-th element is the number of columns of the i-th table.
    table_column_counts: Vec<usize>,
    /// Memoized aggregate results, keyed by the aggregate's display form.
    aggregates: BTreeMap<String, Value>,
    /// Memoized DISTINCT results.
    distinct: BTreeMap<String, Vec<Value>>,
}

impl Relation {
    /// Creates a new empty relation over `tables`.
    pub fn new(tables: Vec<String>, column_counts: Vec<usize>) -> Self {
        Self {
            entries: Vec::new(),
            tables,
            table_column_counts: column_counts,
            aggregates: BTreeMap::new(),
            distinct: BTreeMap::new(),
        }
    }

    /// Creates a relation over the stored rows of one table.
    pub fn from_rows(rows: Vec<Rc<Row>>, table: impl Into<String>, column_count: usize) -> Self {
        let mut relation = Self::new(alloc::vec![table.into()], alloc::vec![column_count]);
        relation.entries = rows.into_iter().map(RelationEntry::from_row).collect();
        relation
    }

    /// Creates a relation from owned rows of one table.
    pub fn from_rows_owned(rows: Vec<Row>, table: impl Into<String>, column_count: usize) -> Self {
        Self::from_rows(rows.into_iter().map(Rc::new).collect(), table, column_count)
    }

    /// An empty relation with the same tables.
    pub fn empty_like(&self) -> Self {
        Self::new(self.tables.clone(), self.table_column_counts.clone())
    }

    /// A relation with the same tables holding `entries`.
    pub fn with_entries(&self, entries: Vec<RelationEntry>) -> Self {
        let mut relation = self.empty_like();
        relation.entries = entries;
        relation
    }

    /// The table layout of `left` joined with `right`. Fails if a table
    /// name appears on both sides, which happens when a table is joined
    /// with itself without an alias.
    pub fn combined_layout(left: &Relation, right: &Relation) -> Result<Relation> {
        if let Some(dup) = left.tables.iter().find(|t| right.tables.contains(t)) {
            return Err(Error::internal(format!("self join without alias on {}", dup)));
        }
        let mut tables = left.tables.clone();
        tables.extend(right.tables.iter().cloned());
        let mut counts = left.table_column_counts.clone();
        counts.extend(right.table_column_counts.iter().copied());
        Ok(Relation::new(tables, counts))
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn table_column_counts(&self) -> &[usize] {
        &self.table_column_counts
    }

    /// Total number of columns per entry.
    pub fn width(&self) -> usize {
        self.table_column_counts.iter().sum()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    /// Computes the column offset for a given table name.
    pub fn get_table_offset(&self, table_name: &str) -> Option<usize> {
        let mut offset = 0;
        for (i, t) in self.tables.iter().enumerate() {
            if t == table_name {
                return Some(offset);
            }
            offset += self.table_column_counts.get(i).copied().unwrap_or(0);
        }
        None
    }

    /// Flat position of `column` in this relation's entries.
    pub fn column_position(&self, column: &ColumnRef) -> Option<usize> {
        self.get_table_offset(column.scope()).map(|offset| offset + column.index)
    }

    /// Like `column_position`, failing if the column's table is not here.
    pub fn require_position(&self, column: &ColumnRef) -> Result<usize> {
        self.column_position(column).ok_or_else(|| {
            Error::internal(format!("column {} is not part of relation {:?}", column, self.tables))
        })
    }

    /// The value of `column` in `entry`.
    pub fn value_of<'e>(&self, entry: &'e RelationEntry, column: &ColumnRef) -> Option<&'e Value> {
        self.column_position(column).and_then(|p| entry.get_field(p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: RelationEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationEntry> {
        self.entries.iter()
    }

    /// True if both relations have the same table layout.
    pub fn is_compatible(&self, other: &Relation) -> bool {
        self.tables == other.tables && self.table_column_counts == other.table_column_counts
    }

    /// Entries of all `relations`, deduplicated by entry id, in first-seen
    /// order.
    pub fn union(relations: Vec<Relation>) -> Result<Relation> {
        let mut iter = relations.into_iter();
        let Some(mut result) = iter.next() else {
            return Ok(Relation::default());
        };
        let mut seen: HashSet<EntryId> = result.entries.iter().map(|e| e.id()).collect();
        for relation in iter {
            if !result.is_compatible(&relation) {
                return Err(Error::internal("union of relations with different tables"));
            }
            for entry in relation.entries {
                if seen.insert(entry.id()) {
                    result.entries.push(entry);
                }
            }
        }
        Ok(result)
    }

    /// Entries present in every relation, in the order of the first.
    pub fn intersect(relations: Vec<Relation>) -> Result<Relation> {
        let mut iter = relations.into_iter();
        let Some(mut result) = iter.next() else {
            return Ok(Relation::default());
        };
        for relation in iter {
            if !result.is_compatible(&relation) {
                return Err(Error::internal("intersection of relations with different tables"));
            }
            let ids: HashSet<EntryId> = relation.entries.iter().map(|e| e.id()).collect();
            result.entries.retain(|e| ids.contains(&e.id()));
        }
        Ok(result)
    }

    pub fn set_aggregate(&mut self, key: impl Into<String>, value: Value) {
        self.aggregates.insert(key.into(), value);
    }

    pub fn get_aggregate(&self, key: &str) -> Option<&Value> {
        self.aggregates.get(key)
    }

    pub fn set_distinct(&mut self, key: impl Into<String>, values: Vec<Value>) {
        self.distinct.insert(key.into(), values);
    }

    pub fn get_distinct(&self, key: &str) -> Option<&[Value]> {
        self.distinct.get(key).map(Vec::as_slice)
    }

    /// The rows' values, in entry order.
    pub fn to_values(&self) -> Vec<Vec<Value>> {
        self.entries.iter().map(|e| e.row.values().to_vec()).collect()
    }
}

impl IntoIterator for Relation {
    type Item = RelationEntry;
    type IntoIter = alloc::vec::IntoIter<RelationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

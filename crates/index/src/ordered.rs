//! Sorted-array index over composite keys.
//!
//! Entries are kept sorted by a null-aware `MultiKeyComparator` built from
//! the index column orders, so scanning the array front to back is the
//! index's natural order. Lookups binary search; range scans binary search
//! the first dimension and filter the remaining ones.

use crate::comparator::{Comparator, MultiKeyComparatorWithNull};
use crate::stats::IndexStats;
use crate::traits::{Index, IndexError, Key, KeyRange};
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use strata_core::schema::Order;
use strata_core::{RowId, Value};

/// An ordered index backed by a sorted vector.
#[derive(Clone, Debug)]
pub struct OrderedIndex {
    name: String,
    comparator: MultiKeyComparatorWithNull,
    unique: bool,
    entries: Vec<(Key, Vec<RowId>)>,
    stats: IndexStats,
}

impl OrderedIndex {
    /// Creates an empty index. `orders` has one entry per key column.
    pub fn new(name: impl Into<String>, orders: Vec<Order>, unique: bool) -> Self {
        Self {
            name: name.into(),
            comparator: MultiKeyComparatorWithNull::new(orders),
            unique,
            entries: Vec::new(),
            stats: IndexStats::new(),
        }
    }

    /// Returns the per-column orders.
    pub fn orders(&self) -> &[Order] {
        self.comparator.orders()
    }

    fn find(&self, key: &[Value]) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(k, _)| self.comparator.compare(k.as_slice(), key))
    }

    /// The entries whose first component may satisfy `ranges[0]`.
    fn candidate_span(&self, ranges: &[KeyRange]) -> (usize, usize) {
        let first = match ranges.first() {
            Some(r) if !r.is_all() => r,
            _ => return (0, self.entries.len()),
        };
        let order = self.orders().first().copied().unwrap_or_default();
        // Nulls sort first and never satisfy a bounded range.
        let before = |v: &Value| {
            v.is_null()
                || match order {
                    Order::Asc => first.is_below(v),
                    Order::Desc => first.is_above(v),
                }
        };
        let start = self
            .entries
            .partition_point(|(k, _)| k.first().map_or(true, before));
        let end = self
            .entries
            .partition_point(|(k, _)| k.first().map_or(true, |v| before(v) || first.contains(v)));
        (start, end.max(start))
    }

    fn matching_entries<'a>(
        &'a self,
        ranges: &'a [KeyRange],
    ) -> impl DoubleEndedIterator<Item = &'a (Key, Vec<RowId>)> + 'a {
        let (start, end) = self.candidate_span(ranges);
        self.entries[start..end]
            .iter()
            .filter(move |(k, _)| self.comparator.is_in_range(k, ranges))
    }
}

impl Index for OrderedIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn add(&mut self, key: Key, row_id: RowId) -> Result<(), IndexError> {
        match self.find(&key) {
            Ok(pos) => {
                if self.unique {
                    return Err(IndexError::DuplicateKey {
                        index: self.name.clone(),
                        key,
                    });
                }
                let ids = &mut self.entries[pos].1;
                if !ids.contains(&row_id) {
                    ids.push(row_id);
                    self.stats.add(&key, 1);
                }
            }
            Err(pos) => {
                self.stats.add(&key, 1);
                self.entries.insert(pos, (key, vec![row_id]));
            }
        }
        Ok(())
    }

    /// Sorts the batch once and merges it into the entries, so bulk loads
    /// stay `O(n log n)`.
    fn add_batch(&mut self, mut batch: Vec<(Key, RowId)>) -> Result<(), IndexError> {
        let cmp = &self.comparator;
        batch.sort_by(|(a, _), (b, _)| cmp.compare(a.as_slice(), b.as_slice()));

        let mut incoming: Vec<(Key, Vec<RowId>)> = Vec::new();
        for (key, row_id) in batch {
            match incoming.last_mut() {
                Some((last, ids)) if cmp.compare(last.as_slice(), key.as_slice()).is_eq() => {
                    if !ids.contains(&row_id) {
                        ids.push(row_id);
                    }
                }
                _ => incoming.push((key, vec![row_id])),
            }
        }
        if self.unique {
            if let Some((key, _)) = incoming
                .iter()
                .find(|(key, ids)| ids.len() > 1 || self.find(key).is_ok())
            {
                return Err(IndexError::DuplicateKey {
                    index: self.name.clone(),
                    key: key.clone(),
                });
            }
        }

        let mut merged = Vec::with_capacity(self.entries.len() + incoming.len());
        let mut existing = core::mem::take(&mut self.entries).into_iter().peekable();
        for (key, ids) in incoming {
            while let Some(entry) =
                existing.next_if(|(k, _)| cmp.compare(k.as_slice(), key.as_slice()).is_lt())
            {
                merged.push(entry);
            }
            match existing.next_if(|(k, _)| cmp.compare(k.as_slice(), key.as_slice()).is_eq()) {
                Some((key, mut current)) => {
                    for row_id in ids {
                        if !current.contains(&row_id) {
                            current.push(row_id);
                            self.stats.add(&key, 1);
                        }
                    }
                    merged.push((key, current));
                }
                None => {
                    self.stats.add(&key, ids.len());
                    merged.push((key, ids));
                }
            }
        }
        merged.extend(existing);
        self.entries = merged;
        Ok(())
    }

    fn set(&mut self, key: Key, row_id: RowId) {
        match self.find(&key) {
            Ok(pos) => {
                let old = core::mem::replace(&mut self.entries[pos].1, vec![row_id]);
                self.stats.remove(old.len());
                self.stats.add(&key, 1);
            }
            Err(pos) => {
                self.stats.add(&key, 1);
                self.entries.insert(pos, (key, vec![row_id]));
            }
        }
    }

    fn get(&self, key: &[Value]) -> Vec<RowId> {
        match self.find(key) {
            Ok(pos) => self.entries[pos].1.clone(),
            Err(_) => Vec::new(),
        }
    }

    fn remove(&mut self, key: &[Value], row_id: Option<RowId>) {
        let Ok(pos) = self.find(key) else {
            return;
        };
        match row_id {
            Some(id) => {
                let ids = &mut self.entries[pos].1;
                if let Some(i) = ids.iter().position(|r| *r == id) {
                    ids.remove(i);
                    self.stats.remove(1);
                }
                if ids.is_empty() {
                    self.entries.remove(pos);
                }
            }
            None => {
                let (_, ids) = self.entries.remove(pos);
                self.stats.remove(ids.len());
            }
        }
    }

    fn contains_key(&self, key: &[Value]) -> bool {
        self.find(key).is_ok()
    }

    fn get_range(
        &self,
        ranges: &[KeyRange],
        reverse: bool,
        limit: Option<usize>,
        skip: usize,
    ) -> Vec<RowId> {
        let limit = limit.unwrap_or(usize::MAX);
        let entries = self.matching_entries(ranges);
        if reverse {
            entries
                .rev()
                .flat_map(|(_, ids)| ids.iter().rev().copied())
                .skip(skip)
                .take(limit)
                .collect()
        } else {
            entries
                .flat_map(|(_, ids)| ids.iter().copied())
                .skip(skip)
                .take(limit)
                .collect()
        }
    }

    fn cost(&self, ranges: &[KeyRange]) -> usize {
        if ranges.iter().all(|r| r.is_all()) {
            return self.stats.total_rows();
        }
        self.matching_entries(ranges).map(|(_, ids)| ids.len()).sum()
    }

    fn is_unique_key(&self) -> bool {
        self.unique
    }

    fn stats(&self) -> &IndexStats {
        &self.stats
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(v: i64) -> Key {
        vec![Value::Int64(v)]
    }

    fn filled(order: Order) -> OrderedIndex {
        let mut idx = OrderedIndex::new("Employee.idxAge", vec![order], false);
        for (row, age) in [(1, 30), (2, 20), (3, 40), (4, 20), (5, 50)] {
            idx.add(key(age), row).unwrap();
        }
        idx
    }

    #[test]
    fn test_unique_rejects_duplicates() {
        let mut idx = OrderedIndex::new("T.pkT", vec![Order::Asc], true);
        idx.add(key(1), 10).unwrap();
        let err = idx.add(key(1), 11).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateKey { .. }));
        assert_eq!(idx.get(&key(1)), vec![10]);
        assert_eq!(idx.stats().total_rows(), 1);
    }

    #[test]
    fn test_batch_merges_into_existing_entries() {
        let mut idx = filled(Order::Asc);
        idx.add_batch(vec![(key(45), 8), (key(20), 6), (key(10), 7), (key(45), 9), (key(20), 2)])
            .unwrap();
        assert_eq!(idx.get(&key(20)), vec![2, 4, 6]);
        assert_eq!(idx.get(&key(45)), vec![8, 9]);
        assert_eq!(idx.get_range(&[], false, None, 0), vec![7, 2, 4, 6, 1, 3, 8, 9, 5]);
        assert_eq!(idx.stats().total_rows(), 9);
        assert_eq!(idx.len(), 6);

        let mut desc = OrderedIndex::new("T.idxD", vec![Order::Desc], false);
        desc.add_batch((0..100).map(|i| (key(i), i as RowId)).collect()).unwrap();
        let all = desc.get_range(&[], false, None, 0);
        assert_eq!(all.first(), Some(&99));
        assert_eq!(all.last(), Some(&0));
    }

    #[test]
    fn test_unique_batch_is_all_or_nothing() {
        let mut idx = OrderedIndex::new("T.pkT", vec![Order::Asc], true);
        idx.add(key(1), 10).unwrap();
        assert!(idx.add_batch(vec![(key(2), 11), (key(1), 12)]).is_err());
        assert!(idx.add_batch(vec![(key(3), 13), (key(3), 14)]).is_err());
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.stats().total_rows(), 1);

        idx.add_batch(vec![(key(3), 13), (key(2), 11)]).unwrap();
        assert_eq!(idx.get_range(&[], false, None, 0), vec![10, 11, 13]);
    }

    #[test]
    fn test_get_and_remove() {
        let mut idx = filled(Order::Asc);
        assert_eq!(idx.get(&key(20)), vec![2, 4]);
        idx.remove(&key(20), Some(2));
        assert_eq!(idx.get(&key(20)), vec![4]);
        idx.remove(&key(20), Some(4));
        assert!(!idx.contains_key(&key(20)));
        idx.remove(&key(30), None);
        assert_eq!(idx.stats().total_rows(), 2);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_set_replaces_values() {
        let mut idx = filled(Order::Asc);
        idx.set(key(20), 9);
        assert_eq!(idx.get(&key(20)), vec![9]);
        assert_eq!(idx.stats().total_rows(), 4);
    }

    #[test]
    fn test_range_scan_ascending() {
        let idx = filled(Order::Asc);
        let r = [KeyRange::lower_bound(Value::Int64(20), true)];
        assert_eq!(idx.get_range(&r, false, None, 0), vec![1, 3, 5]);
        assert_eq!(idx.get_range(&r, true, None, 0), vec![5, 3, 1]);
        assert_eq!(idx.get_range(&r, false, Some(1), 1), vec![3]);
        assert_eq!(idx.get_range(&[], false, None, 0), vec![2, 4, 1, 3, 5]);
        assert_eq!(idx.cost(&r), 3);
    }

    #[test]
    fn test_range_scan_descending_index() {
        let idx = filled(Order::Desc);
        let r = [KeyRange::between(Value::Int64(20), Value::Int64(40))];
        assert_eq!(idx.get_range(&r, false, None, 0), vec![3, 1, 2, 4]);
        assert_eq!(idx.get_range(&r, true, None, 0), vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_nulls_excluded_from_bounded_ranges() {
        let mut idx = OrderedIndex::new("T.idxX", vec![Order::Asc], false);
        idx.add(vec![Value::Null], 1).unwrap();
        idx.add(key(5), 2).unwrap();
        let upper = [KeyRange::upper_bound(Value::Int64(10), false)];
        assert_eq!(idx.get_range(&upper, false, None, 0), vec![2]);
        assert_eq!(idx.get_range(&[KeyRange::all()], false, None, 0), vec![1, 2]);
    }

    #[test]
    fn test_composite_range() {
        let mut idx = OrderedIndex::new("T.idxAB", vec![Order::Asc, Order::Desc], false);
        let rows = [(1, 1, 1), (2, 1, 2), (3, 2, 1), (4, 2, 2), (5, 3, 9)];
        for (row, a, b) in rows {
            idx.add(vec![Value::Int64(a), Value::Int64(b)], row).unwrap();
        }
        let ranges = [
            KeyRange::between(Value::Int64(1), Value::Int64(2)),
            KeyRange::only(Value::Int64(2)),
        ];
        assert_eq!(idx.get_range(&ranges, false, None, 0), vec![2, 4]);
        // Second column is descending inside each first-column group.
        assert_eq!(
            idx.get_range(&[KeyRange::only(Value::Int64(1))], false, None, 0),
            vec![2, 1]
        );
    }
}

//! Comparators for composite index keys.
//!
//! A composite key is a slice with one component per index column. The
//! comparators here order keys component by component, inverting the
//! comparison on descending columns, and decide whether a key falls
//! inside a per-column list of `SingleKeyRange`s.

use crate::key_range::SingleKeyRange;
use alloc::vec::Vec;
use core::cmp::Ordering;
use strata_core::schema::Order;
use strata_core::Value;

/// A component of a composite key.
pub trait KeyPart: Ord + Clone {
    /// True if the component is SQL null.
    fn is_null(&self) -> bool {
        false
    }
}

impl KeyPart for Value {
    fn is_null(&self) -> bool {
        Value::is_null(self)
    }
}

impl KeyPart for i32 {}
impl KeyPart for i64 {}
impl KeyPart for &str {}

/// Trait for comparing index keys.
pub trait Comparator<K: ?Sized> {
    /// Compares two keys according to the comparator's ordering.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// Returns true if a < b according to this comparator.
    fn is_less(&self, a: &K, b: &K) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Returns the smaller of two keys; `a` on ties.
    fn min<'k>(&self, a: &'k K, b: &'k K) -> &'k K {
        if self.compare(b, a) == Ordering::Less {
            b
        } else {
            a
        }
    }

    /// Returns the larger of two keys; `a` on ties.
    fn max<'k>(&self, a: &'k K, b: &'k K) -> &'k K {
        if self.compare(b, a) == Ordering::Greater {
            b
        } else {
            a
        }
    }
}

fn compare_components<K: Ord>(
    orders: &[Order],
    a: &[K],
    b: &[K],
    cmp_part: impl Fn(Order, &K, &K) -> Ordering,
) -> Ordering {
    for (i, order) in orders.iter().enumerate() {
        let cmp = match (a.get(i), b.get(i)) {
            (Some(av), Some(bv)) => cmp_part(*order, av, bv),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

/// A comparator for composite keys.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiKeyComparator {
    orders: Vec<Order>,
}

impl MultiKeyComparator {
    /// Creates a new multi-key comparator with the given orders.
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Creates orders for n keys, all with the same order.
    pub fn create_orders(n: usize, order: Order) -> Vec<Order> {
        (0..n).map(|_| order).collect()
    }

    /// Returns the orders of this comparator.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// True iff every component of `key` is inside the range for its
    /// dimension. Dimensions without a range are unconstrained. Column
    /// direction does not affect containment.
    pub fn is_in_range<K: KeyPart>(&self, key: &[K], ranges: &[SingleKeyRange<K>]) -> bool {
        key.iter()
            .zip(ranges)
            .all(|(component, range)| range.contains(component))
    }

    /// Sorts per-dimension range tuples by their first dimension, in the
    /// direction of the first column. The sort is stable.
    pub fn sort_key_ranges<K: KeyPart>(&self, ranges: &mut [Vec<SingleKeyRange<K>>]) {
        let order = self.orders.first().copied().unwrap_or_default();
        ranges.sort_by(|a, b| match (a.first(), b.first()) {
            (Some(ra), Some(rb)) => order.apply(ra.compare(rb)),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }
}

impl<K: Ord> Comparator<[K]> for MultiKeyComparator {
    fn compare(&self, a: &[K], b: &[K]) -> Ordering {
        compare_components(&self.orders, a, b, |order, x, y| order.apply(x.cmp(y)))
    }
}

/// A composite key comparator for nullable columns. Null components sort
/// before non-null ones in every direction and only ever satisfy an
/// unbounded range.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiKeyComparatorWithNull {
    inner: MultiKeyComparator,
}

impl MultiKeyComparatorWithNull {
    /// Creates a new multi-key comparator with null handling.
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            inner: MultiKeyComparator::new(orders),
        }
    }

    /// Returns the orders of this comparator.
    pub fn orders(&self) -> &[Order] {
        self.inner.orders()
    }

    /// Like `MultiKeyComparator::is_in_range`, except that a null
    /// component fails every range other than `all()`.
    pub fn is_in_range<K: KeyPart>(&self, key: &[K], ranges: &[SingleKeyRange<K>]) -> bool {
        key.iter().zip(ranges).all(|(component, range)| {
            if component.is_null() {
                range.is_all()
            } else {
                range.contains(component)
            }
        })
    }

    /// See `MultiKeyComparator::sort_key_ranges`.
    pub fn sort_key_ranges<K: KeyPart>(&self, ranges: &mut [Vec<SingleKeyRange<K>>]) {
        self.inner.sort_key_ranges(ranges)
    }
}

impl<K: KeyPart> Comparator<[K]> for MultiKeyComparatorWithNull {
    fn compare(&self, a: &[K], b: &[K]) -> Ordering {
        compare_components(self.inner.orders(), a, b, |order, x, y| {
            match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => order.apply(x.cmp(y)),
            }
        })
    }
}

//! Single-dimension key ranges and their algebra.
//!
//! A `SingleKeyRange` is an interval over one key dimension. Either end may
//! be `Unbound`; when it is, the matching exclusion flag is always false.
//! Every operation is pure and returns new ranges.
//!
//! Comparisons between bounds are done on *edges*: a lower bound sits at
//! its value when inclusive and just above it when exclusive, an upper
//! bound sits at its value when inclusive and just below it when
//! exclusive. An unbound lower edge is below every key and an unbound
//! upper edge is above every key. On equal values an exclusive bound is
//! therefore further in its own direction than an inclusive one, which is
//! the tie rule `overlaps`, `and` and `get_bounding_range` rely on.

use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

/// One end of a key range.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyBound<K> {
    /// No limit on this side.
    Unbound,
    /// A concrete key.
    Value(K),
}

impl<K> KeyBound<K> {
    #[inline]
    pub fn is_unbound(&self) -> bool {
        matches!(self, KeyBound::Unbound)
    }

    /// Returns the concrete key, if any.
    #[inline]
    pub fn value(&self) -> Option<&K> {
        match self {
            KeyBound::Unbound => None,
            KeyBound::Value(k) => Some(k),
        }
    }
}

/// Position of a bound on the key line.
#[derive(Debug, PartialEq, Eq)]
enum Edge<'a, K> {
    NegInf,
    /// `offset` is -1 (just below), 0 (at) or 1 (just above) the key.
    At(&'a K, i8),
    PosInf,
}

impl<K: Ord> Ord for Edge<'_, K> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Edge::NegInf, Edge::NegInf) | (Edge::PosInf, Edge::PosInf) => Ordering::Equal,
            (Edge::NegInf, _) | (_, Edge::PosInf) => Ordering::Less,
            (_, Edge::NegInf) | (Edge::PosInf, _) => Ordering::Greater,
            (Edge::At(a, ao), Edge::At(b, bo)) => a.cmp(b).then(ao.cmp(bo)),
        }
    }
}

impl<K: Ord> PartialOrd for Edge<'_, K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An interval over a single key dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SingleKeyRange<K> {
    from: KeyBound<K>,
    to: KeyBound<K>,
    exclude_lower: bool,
    exclude_upper: bool,
}

impl<K: Ord + Clone> SingleKeyRange<K> {
    /// Creates a range. Exclusion flags of unbound ends are forced to false.
    pub fn new(from: KeyBound<K>, to: KeyBound<K>, exclude_lower: bool, exclude_upper: bool) -> Self {
        let exclude_lower = exclude_lower && !from.is_unbound();
        let exclude_upper = exclude_upper && !to.is_unbound();
        Self {
            from,
            to,
            exclude_lower,
            exclude_upper,
        }
    }

    /// `[unbound, key]`, or `[unbound, key)` when `exclusive`.
    pub fn upper_bound(key: K, exclusive: bool) -> Self {
        Self::new(KeyBound::Unbound, KeyBound::Value(key), false, exclusive)
    }

    /// `[key, unbound]`, or `(key, unbound]` when `exclusive`.
    pub fn lower_bound(key: K, exclusive: bool) -> Self {
        Self::new(KeyBound::Value(key), KeyBound::Unbound, exclusive, false)
    }

    /// `[key, key]`.
    pub fn only(key: K) -> Self {
        Self::new(KeyBound::Value(key.clone()), KeyBound::Value(key), false, false)
    }

    /// `[unbound, unbound]`.
    pub fn all() -> Self {
        Self::new(KeyBound::Unbound, KeyBound::Unbound, false, false)
    }

    /// A closed range `[from, to]`.
    pub fn between(from: K, to: K) -> Self {
        Self::new(KeyBound::Value(from), KeyBound::Value(to), false, false)
    }

    #[inline]
    pub fn from(&self) -> &KeyBound<K> {
        &self.from
    }

    #[inline]
    pub fn to(&self) -> &KeyBound<K> {
        &self.to
    }

    #[inline]
    pub fn exclude_lower(&self) -> bool {
        self.exclude_lower
    }

    #[inline]
    pub fn exclude_upper(&self) -> bool {
        self.exclude_upper
    }

    pub fn is_all(&self) -> bool {
        self.from.is_unbound() && self.to.is_unbound()
    }

    /// True for a closed single-point range.
    pub fn is_only(&self) -> bool {
        match (&self.from, &self.to) {
            (KeyBound::Value(a), KeyBound::Value(b)) => {
                a == b && !self.exclude_lower && !self.exclude_upper
            }
            _ => false,
        }
    }

    /// True if no key can satisfy the range.
    pub fn is_empty(&self) -> bool {
        self.lower_edge() > self.upper_edge()
    }

    fn lower_edge(&self) -> Edge<'_, K> {
        match &self.from {
            KeyBound::Unbound => Edge::NegInf,
            KeyBound::Value(k) => Edge::At(k, if self.exclude_lower { 1 } else { 0 }),
        }
    }

    fn upper_edge(&self) -> Edge<'_, K> {
        match &self.to {
            KeyBound::Unbound => Edge::PosInf,
            KeyBound::Value(k) => Edge::At(k, if self.exclude_upper { -1 } else { 0 }),
        }
    }

    /// True iff `key` lies within the range.
    pub fn contains(&self, key: &K) -> bool {
        let point = Edge::At(key, 0);
        self.lower_edge() <= point && point <= self.upper_edge()
    }

    /// True iff `key` lies strictly before the lower end of the range.
    pub fn is_below(&self, key: &K) -> bool {
        Edge::At(key, 0) < self.lower_edge()
    }

    /// True iff `key` lies strictly after the upper end of the range.
    pub fn is_above(&self, key: &K) -> bool {
        Edge::At(key, 0) > self.upper_edge()
    }

    /// True iff at least one key lies in both ranges.
    pub fn overlaps(&self, other: &Self) -> bool {
        let (left, right) = match self.lower_edge().cmp(&other.lower_edge()) {
            Ordering::Equal => return !self.is_empty() && !other.is_empty(),
            Ordering::Less => (self, other),
            Ordering::Greater => (other, self),
        };
        right.lower_edge() <= left.upper_edge() && !right.is_empty()
    }

    /// The range of keys in both `self` and `other`, or `None` when they
    /// do not overlap.
    pub fn and(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let low = if self.lower_edge() >= other.lower_edge() { self } else { other };
        let high = if self.upper_edge() <= other.upper_edge() { self } else { other };
        Some(Self::new(
            low.from.clone(),
            high.to.clone(),
            low.exclude_lower,
            high.exclude_upper,
        ))
    }

    /// Clips the range to `[min, max]`.
    pub fn get_bounded(&self, min: K, max: K) -> Option<Self> {
        self.and(&Self::between(min, max))
    }

    /// The smallest range containing both `r1` and `r2`.
    pub fn get_bounding_range(r1: &Self, r2: &Self) -> Self {
        let low = if r1.lower_edge() <= r2.lower_edge() { r1 } else { r2 };
        let high = if r1.upper_edge() >= r2.upper_edge() { r1 } else { r2 };
        Self::new(
            low.from.clone(),
            high.to.clone(),
            low.exclude_lower,
            high.exclude_upper,
        )
    }

    /// The same interval with its ends swapped, for use against a key
    /// order that runs the other way.
    pub fn reverse(&self) -> Self {
        Self::new(
            self.to.clone(),
            self.from.clone(),
            self.exclude_upper,
            self.exclude_lower,
        )
    }

    /// Keys outside this range, as zero, one or two ranges.
    pub fn complement(&self) -> Vec<Self> {
        let mut out = Vec::with_capacity(2);
        if let KeyBound::Value(from) = &self.from {
            out.push(Self::upper_bound(from.clone(), !self.exclude_lower));
        }
        if let KeyBound::Value(to) = &self.to {
            out.push(Self::lower_bound(to.clone(), !self.exclude_upper));
        }
        out
    }

    /// Orders ranges by lower edge, then upper edge.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.lower_edge()
            .cmp(&other.lower_edge())
            .then_with(|| self.upper_edge().cmp(&other.upper_edge()))
    }

    /// Keys outside every range of a disjoint set.
    ///
    /// The input is sorted first. For `N` disjoint `only` ranges the
    /// result is the `N + 1` gaps around them; gaps that would be empty
    /// (touching ranges, unbound outer ends) are left out.
    pub fn complement_all(ranges: &[Self]) -> Vec<Self> {
        if ranges.is_empty() {
            return Vec::new();
        }
        let mut sorted: Vec<&Self> = ranges.iter().collect();
        sorted.sort_by(|a, b| a.compare(b));

        let mut gaps = Vec::with_capacity(sorted.len() + 1);
        if let KeyBound::Value(from) = &sorted[0].from {
            gaps.push(Self::upper_bound(from.clone(), !sorted[0].exclude_lower));
        }
        for pair in sorted.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if let (KeyBound::Value(to), KeyBound::Value(from)) = (&prev.to, &next.from) {
                let gap = Self::new(
                    KeyBound::Value(to.clone()),
                    KeyBound::Value(from.clone()),
                    !prev.exclude_upper,
                    !next.exclude_lower,
                );
                if !gap.is_empty() {
                    gaps.push(gap);
                }
            }
        }
        let last = sorted[sorted.len() - 1];
        if let KeyBound::Value(to) = &last.to {
            gaps.push(Self::lower_bound(to.clone(), !last.exclude_upper));
        }
        gaps
    }
}

impl<K: fmt::Display> fmt::Display for SingleKeyRange<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.exclude_lower { "(" } else { "[" })?;
        match &self.from {
            KeyBound::Unbound => f.write_str("unbound")?,
            KeyBound::Value(k) => write!(f, "{}", k)?,
        }
        f.write_str(", ")?;
        match &self.to {
            KeyBound::Unbound => f.write_str("unbound")?,
            KeyBound::Value(k) => write!(f, "{}", k)?,
        }
        f.write_str(if self.exclude_upper { ")" } else { "]" })
    }
}

//! Strata Index - ordered composite-key indices and key ranges.
//!
//! - `SingleKeyRange`: a one-dimensional interval with optional open ends
//! - `MultiKeyComparator` / `MultiKeyComparatorWithNull`: composite key order
//! - `OrderedIndex`: sorted-array index implementing `Index`
//!
//! # Example
//!
//! ```rust
//! use strata_core::schema::Order;
//! use strata_core::Value;
//! use strata_index::{Index, KeyRange, OrderedIndex};
//!
//! let mut idx = OrderedIndex::new("Employee.pkEmployee", vec![Order::Asc], true);
//! idx.add(vec![Value::Int64(10)], 100).unwrap();
//! idx.add(vec![Value::Int64(20)], 200).unwrap();
//! idx.add(vec![Value::Int64(5)], 50).unwrap();
//!
//! assert_eq!(idx.get(&[Value::Int64(10)]), vec![100]);
//!
//! let range = KeyRange::lower_bound(Value::Int64(10), false);
//! assert_eq!(idx.get_range(&[range], false, None, 0), vec![100, 200]);
//! ```

#![no_std]

extern crate alloc;

pub mod comparator;
pub mod key_range;
pub mod ordered;
pub mod stats;
pub mod traits;

pub use comparator::{Comparator, KeyPart, MultiKeyComparator, MultiKeyComparatorWithNull};
pub use key_range::{KeyBound, SingleKeyRange};
pub use ordered::OrderedIndex;
pub use stats::IndexStats;
pub use traits::{Index, IndexError, Key, KeyRange};

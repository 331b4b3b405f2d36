//! In-memory row storage for Strata.
//!
//! A `Store` holds the `RowCache` and the `IndexStore` that queries read.
//! All writes go through a `Journal`, which is scoped to a set of tables,
//! checks constraints as it goes and can be rolled back until committed.
//! `TableDiff`s record what a journal changed per table, and the
//! `InMemoryUpdater` applies them to indices first, then to the cache.
//!
//! # Example
//!
//! ```rust
//! use strata_core::schema::{Schema, TableBuilder};
//! use strata_core::{DataType, Value};
//! use strata_storage::{Journal, Store};
//!
//! let users = TableBuilder::new("users")
//!     .unwrap()
//!     .add_column("id", DataType::Int64)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"], false)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let schema = Schema::new().add_table(users).unwrap();
//! let mut store = Store::new(&schema);
//!
//! let mut journal = Journal::new(&schema, &mut store, &["users"]).unwrap();
//! let row = journal.create_row(vec![Value::Int64(1), Value::String("Alice".into())]);
//! journal.insert("users", vec![row]).unwrap();
//! journal.commit().unwrap();
//!
//! assert_eq!(store.cache().count("users"), 1);
//! ```

#![no_std]

extern crate alloc;

pub mod cache;
pub mod constraint;
pub mod diff;
pub mod index_store;
pub mod journal;
pub mod store;
pub mod updater;

pub use cache::RowCache;
pub use constraint::{CascadeDeletes, CascadeUpdate, ConstraintChecker};
pub use diff::{Modification, RowChange, TableDiff};
pub use index_store::IndexStore;
pub use journal::Journal;
pub use store::Store;
pub use updater::InMemoryUpdater;

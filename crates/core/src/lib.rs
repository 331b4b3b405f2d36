//! Values, rows and schema definitions shared by the Strata crates.
//!
//! A `Schema` is a list of `Table`s built with `TableBuilder`. Rows are
//! positional `Vec<Value>`s tagged with a `RowId`, and every fallible
//! call returns the one crate-wide `Error`.
//!
//! # Example
//!
//! ```rust
//! use strata_core::{DataType, Row, RowIdGenerator, Value};
//! use strata_core::schema::{Schema, TableBuilder};
//!
//! let table = TableBuilder::new("Employee")
//!     .unwrap()
//!     .add_column("id", DataType::Int64)
//!     .unwrap()
//!     .add_column("name", DataType::String)
//!     .unwrap()
//!     .add_primary_key(&["id"], true)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let schema = Schema::new().add_table(table).unwrap();
//!
//! let mut ids = RowIdGenerator::default();
//! let row = Row::new(ids.next_id(), vec![Value::Int64(1), Value::String("Alice".into())]);
//! let table = schema.table("Employee").unwrap();
//! let pk = table.primary_key().unwrap();
//! assert_eq!(table.index_key(pk, &row), vec![Value::Int64(1)]);
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod pattern_match;
mod row;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::{Row, RowId, RowIdGenerator, DUMMY_ROW_ID};
pub use types::DataType;
pub use value::Value;

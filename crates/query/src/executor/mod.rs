//! Query executor module.

pub mod aggregate;
pub mod join;
mod relation;
mod runner;
pub mod sort;

pub use relation::{EntryId, EntryIdGenerator, Relation, RelationEntry, COMBINED_ENTRY_BASE};
pub use runner::{QueryRunner, PROJECTION_TABLE};

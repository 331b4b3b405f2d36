//! Schema definitions: columns, tables, indices and constraints.

mod catalog;
mod column;
mod constraint;
mod index;
mod table;

pub use catalog::Schema;
pub use column::Column;
pub use constraint::{ConstraintAction, ConstraintTiming, Constraints, ForeignKey};
pub use index::{IndexDef, IndexedColumn, Order};
pub use table::{Table, TableBuilder};

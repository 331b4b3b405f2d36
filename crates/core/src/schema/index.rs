//! Index definitions.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

/// Sort direction of an index column or an `order_by` key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    /// Orients a natural comparison.
    #[inline]
    pub fn apply(self, ord: Ordering) -> Ordering {
        if self == Order::Desc {
            ord.reverse()
        } else {
            ord
        }
    }

    #[inline]
    pub fn reverse(self) -> Order {
        if self == Order::Asc {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if *self == Order::Asc { "ASC" } else { "DESC" })
    }
}

/// One key component of an index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedColumn {
    pub name: String,
    pub order: Order,
}

impl IndexedColumn {
    pub fn new(name: impl Into<String>, order: Order) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }
}

/// Definition of one index over a table. Registered in the index store
/// under `table.index`.
#[derive(Clone, Debug)]
pub struct IndexDef {
    name: String,
    table_name: String,
    columns: Vec<IndexedColumn>,
    unique: bool,
    auto_increment: bool,
}

impl IndexDef {
    pub(crate) fn new(
        name: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<IndexedColumn>,
        unique: bool,
    ) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            columns,
            unique,
            auto_increment: false,
        }
    }

    /// Primary keys over a single integer column may hand out row keys.
    pub(crate) fn with_auto_increment(mut self, on: bool) -> Self {
        self.auto_increment = on && self.columns.len() == 1;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn normalized_name(&self) -> String {
        format!("{}.{}", self.table_name, self.name)
    }

    #[inline]
    pub fn columns(&self) -> &[IndexedColumn] {
        &self.columns
    }

    pub fn orders(&self) -> Vec<Order> {
        self.columns.iter().map(|c| c.order).collect()
    }

    /// Key position of `column`, if it is part of the index.
    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    #[inline]
    pub fn is_single_column(&self) -> bool {
        self.columns.len() == 1
    }

    #[inline]
    pub fn has_auto_increment(&self) -> bool {
        self.auto_increment
    }
}

impl PartialEq for IndexDef {
    fn eq(&self, other: &Self) -> bool {
        self.table_name == other.table_name && self.name == other.name
    }
}

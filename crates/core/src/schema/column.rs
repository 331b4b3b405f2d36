//! Column definition.

use crate::types::DataType;
use crate::value::Value;
use alloc::format;
use alloc::string::String;

/// One column of a table. Built by `TableBuilder`, which fixes its
/// position and whether it is backed by a single-column unique index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) nullable: bool,
    pub(crate) unique: bool,
    pub(crate) position: usize,
}

impl Column {
    pub(crate) fn new(name: String, data_type: DataType, position: usize) -> Self {
        Self {
            name,
            data_type,
            nullable: data_type.is_nullable_by_default(),
            unique: false,
            position,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `table.column`.
    pub fn normalized_name(&self, table: &str) -> String {
        format!("{}.{}", table, self.name)
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True if a single-column unique index (or primary key) covers the
    /// column. Foreign keys may only reference such columns.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Position of the column in its table's rows.
    #[inline]
    pub fn index(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn is_indexable(&self) -> bool {
        self.data_type.is_indexable()
    }

    /// The value a row gets when it does not mention this column: null
    /// where allowed, the type's zero value otherwise.
    pub fn default_value(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            Value::default_for_type(self.data_type)
        }
    }
}

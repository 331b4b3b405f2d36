//! Data type definitions for the Strata engine.
//!
//! Every column carries one of these tags. Predicate evaluators are
//! registered per `(DataType, EvalType)` pair, so this list is also the
//! list of types a query can filter on.

use core::fmt;

/// Supported column data types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Opaque binary data
    Bytes,
}

impl DataType {
    /// All data types, in rank order.
    pub const ALL: [DataType; 7] = [
        DataType::Boolean,
        DataType::Int32,
        DataType::Int64,
        DataType::Float64,
        DataType::String,
        DataType::DateTime,
        DataType::Bytes,
    ];

    /// Returns whether this type is nullable by default.
    pub fn is_nullable_by_default(&self) -> bool {
        matches!(self, DataType::Bytes)
    }

    /// Returns whether this type can be used as an index key.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, DataType::Bytes)
    }

    /// Returns whether values of this type support ordering comparisons
    /// (LT, GT, BETWEEN, ...).
    pub fn is_ordered(&self) -> bool {
        !matches!(self, DataType::Boolean | DataType::Bytes)
    }

    /// Returns whether this type is numeric (usable by SUM/AVG/STDDEV/GEOMEAN).
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "boolean",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::String => "string",
            DataType::DateTime => "datetime",
            DataType::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_nullable_by_default() {
        assert!(!DataType::Boolean.is_nullable_by_default());
        assert!(!DataType::Int32.is_nullable_by_default());
        assert!(!DataType::String.is_nullable_by_default());
        assert!(DataType::Bytes.is_nullable_by_default());
    }

    #[test]
    fn test_indexable() {
        for dt in DataType::ALL {
            assert_eq!(dt.is_indexable(), dt != DataType::Bytes);
        }
    }

    #[test]
    fn test_ordered_and_numeric() {
        assert!(DataType::DateTime.is_ordered());
        assert!(!DataType::Boolean.is_ordered());
        assert!(DataType::Float64.is_numeric());
        assert!(!DataType::String.is_numeric());
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Int64.to_string(), "int64");
        assert_eq!(DataType::DateTime.to_string(), "datetime");
    }
}

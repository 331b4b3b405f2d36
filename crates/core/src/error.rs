//! The error type shared by every Strata crate.

use crate::row::RowId;
use crate::types::DataType;
use alloc::string::String;
use core::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    TypeMismatch { expected: DataType, got: DataType },
    NullConstraint { column: String },
    /// Duplicate key in a unique index (primary keys included).
    UniqueConstraint { index: String, key: String },
    ForeignKeyViolation { constraint: String, message: String },
    RowNotFound { table: String, row_id: RowId },
    InvalidSchema { message: String },
    ColumnNotFound { table: String, column: String },
    TableNotFound { name: String },
    IndexNotFound { index: String },
    /// A journal touched a table it was not opened for.
    ScopeViolation { table: String },
    /// A journal was used after commit or rollback.
    InvalidState { message: String },
    /// Malformed query, or one whose binders are missing or out of range.
    InvalidQuery { message: String },
    /// A broken invariant inside the engine.
    Internal { message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {}, got {}", expected, got)
            }
            Error::NullConstraint { column } => write!(f, "{} cannot be null", column),
            Error::UniqueConstraint { index, key } => {
                write!(f, "duplicate key {} in unique index {}", key, index)
            }
            Error::ForeignKeyViolation { constraint, message } => {
                write!(f, "foreign key {} violated: {}", constraint, message)
            }
            Error::RowNotFound { table, row_id } => write!(f, "no row {} in {}", row_id, table),
            Error::InvalidSchema { message } => write!(f, "invalid schema: {}", message),
            Error::ColumnNotFound { table, column } => write!(f, "unknown column {}.{}", table, column),
            Error::TableNotFound { name } => write!(f, "unknown table {}", name),
            Error::IndexNotFound { index } => write!(f, "unknown index {}", index),
            Error::ScopeViolation { table } => write!(f, "{} is outside the journal scope", table),
            Error::InvalidState { message } => write!(f, "invalid state: {}", message),
            Error::InvalidQuery { message } => write!(f, "invalid query: {}", message),
            Error::Internal { message } => write!(f, "internal error: {}", message),
        }
    }
}

impl Error {
    pub fn type_mismatch(expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch { expected, got }
    }

    pub fn null_constraint(column: impl Into<String>) -> Self {
        Error::NullConstraint { column: column.into() }
    }

    pub fn unique_constraint(index: impl Into<String>, key: impl Into<String>) -> Self {
        Error::UniqueConstraint { index: index.into(), key: key.into() }
    }

    pub fn foreign_key(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ForeignKeyViolation { constraint: constraint.into(), message: message.into() }
    }

    pub fn row_not_found(table: impl Into<String>, row_id: RowId) -> Self {
        Error::RowNotFound { table: table.into(), row_id }
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema { message: message.into() }
    }

    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound { table: table.into(), column: column.into() }
    }

    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    pub fn index_not_found(index: impl Into<String>) -> Self {
        Error::IndexNotFound { index: index.into() }
    }

    pub fn scope_violation(table: impl Into<String>) -> Self {
        Error::ScopeViolation { table: table.into() }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState { message: message.into() }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal { message: message.into() }
    }

    /// Not-null, unique and foreign key failures. The journal rolls back
    /// on these and stays usable.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::NullConstraint { .. } | Error::UniqueConstraint { .. } | Error::ForeignKeyViolation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::type_mismatch(DataType::Int32, DataType::String).to_string(),
            "type mismatch: expected int32, got string"
        );
        assert_eq!(Error::column_not_found("Job", "title").to_string(), "unknown column Job.title");
        assert_eq!(Error::scope_violation("Job").to_string(), "Job is outside the journal scope");
    }

    #[test]
    fn test_constraint_classification() {
        assert!(Error::unique_constraint("Employee.pkEmployee", "[1]").is_constraint_violation());
        assert!(Error::null_constraint("Employee.name").is_constraint_violation());
        assert!(!Error::invalid_state("terminated").is_constraint_violation());
        assert!(!Error::scope_violation("Job").is_constraint_violation());
    }
}

//! Column references and predicate operands.

use crate::ast::predicate::{EvalType, JoinPredicate, Predicate, ValuePredicate};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use strata_core::schema::{Schema, Table};
use strata_core::{DataType, Result, Value};

/// Reference to a column of a table, possibly through an alias.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table name in the schema.
    pub table: String,
    /// Alias the table is queried under.
    pub alias: Option<String>,
    /// Column name.
    pub column: String,
    /// Position of the column in the table's rows.
    pub index: usize,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnRef {
    /// Resolves `column` of `table`.
    pub fn of(table: &Table, column: &str) -> Result<Self> {
        let col = table.column(column)?;
        Ok(Self {
            table: table.name().to_string(),
            alias: None,
            column: col.name().to_string(),
            index: col.index(),
            data_type: col.data_type(),
            nullable: col.is_nullable(),
        })
    }

    /// The same column seen through `alias`.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name the column's table goes by in a query: its alias if any.
    #[inline]
    pub fn scope(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// `scope.column`.
    pub fn normalized_name(&self) -> String {
        format!("{}.{}", self.scope(), self.column)
    }

    fn value_predicate(&self, eval_type: EvalType, operands: Vec<Operand>) -> Predicate {
        Predicate::Value(ValuePredicate::new(self.clone(), eval_type, operands))
    }

    pub fn eq(&self, operand: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Eq, alloc::vec![operand.into()])
    }

    pub fn neq(&self, operand: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Neq, alloc::vec![operand.into()])
    }

    pub fn lt(&self, operand: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Lt, alloc::vec![operand.into()])
    }

    pub fn lte(&self, operand: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Lte, alloc::vec![operand.into()])
    }

    pub fn gt(&self, operand: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Gt, alloc::vec![operand.into()])
    }

    pub fn gte(&self, operand: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Gte, alloc::vec![operand.into()])
    }

    /// Matches string values against a regular expression.
    pub fn matches(&self, pattern: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Match, alloc::vec![pattern.into()])
    }

    /// Inclusive on both ends.
    pub fn between(&self, from: impl Into<Operand>, to: impl Into<Operand>) -> Predicate {
        self.value_predicate(EvalType::Between, alloc::vec![from.into(), to.into()])
    }

    pub fn in_list<I, T>(&self, values: I) -> Predicate
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.value_predicate(EvalType::In, values.into_iter().map(Into::into).collect())
    }

    /// Matches null values.
    pub fn is_null(&self) -> Predicate {
        self.eq(Value::Null)
    }

    /// Compares this column with a column of another table.
    pub fn compare_col(&self, eval_type: EvalType, other: &ColumnRef) -> Predicate {
        Predicate::Join(JoinPredicate::new(self.clone(), other.clone(), eval_type))
    }

    /// Equi-join with a column of another table.
    pub fn eq_col(&self, other: &ColumnRef) -> Predicate {
        self.compare_col(EvalType::Eq, other)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope(), self.column)
    }
}

/// Resolves `table.column` in `schema`.
pub fn col(schema: &Schema, table: &str, column: &str) -> Result<ColumnRef> {
    ColumnRef::of(schema.table(table)?, column)
}

/// Placeholder for a value supplied when the query is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binder(pub usize);

/// Creates a placeholder for the `index`-th bound value.
pub fn bind(index: usize) -> Binder {
    Binder(index)
}

/// The right-hand side of a value predicate.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Value(Value),
    Binder(usize),
}

impl Operand {
    /// The literal, unless this is an unbound placeholder.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Binder(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Binder(i) => write!(f, "?{}", i),
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Binder> for Operand {
    fn from(b: Binder) -> Self {
        Operand::Binder(b.0)
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Value(v.into())
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Value(v.into())
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Value(v.into())
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Value(v.into())
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Operand::Value(v.into())
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Operand::Value(v.into())
    }
}

/// Converts a literal to the column type where that loses nothing, so
/// `Int32` columns can be compared with `i64` literals and so on.
pub(crate) fn coerce(value: Value, data_type: DataType) -> Value {
    match (value, data_type) {
        (Value::Int64(v), DataType::Int32) if i32::try_from(v).is_ok() => Value::Int32(v as i32),
        (Value::Int32(v), DataType::Int64) => Value::Int64(v as i64),
        (Value::Int32(v), DataType::Float64) => Value::Float64(v as f64),
        (Value::Int64(v), DataType::Float64) => Value::Float64(v as f64),
        (Value::Int64(v), DataType::DateTime) => Value::DateTime(v),
        (value, _) => value,
    }
}

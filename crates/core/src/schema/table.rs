//! Tables and `TableBuilder`.

use super::column::Column;
use super::constraint::{ConstraintAction, ConstraintTiming, Constraints, ForeignKey};
use super::index::{IndexDef, IndexedColumn, Order};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::DataType;
use crate::value::Value;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    /// The primary key, when present, comes first.
    indices: Vec<IndexDef>,
    constraints: Constraints,
    persistent_index: bool,
}

impl Table {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[inline]
    pub fn indices(&self) -> &[IndexDef] {
        &self.indices
    }

    #[inline]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Whether a backing store should persist this table's indices
    /// rather than rebuild them on load.
    #[inline]
    pub fn persistent_index(&self) -> bool {
        self.persistent_index
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like `get_column`, failing with `ColumnNotFound`.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_column(name)
            .ok_or_else(|| Error::column_not_found(&self.name, name))
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.get_column(name).map(Column::index)
    }

    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indices.iter().find(|i| i.name() == name)
    }

    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.constraints.primary_key()
    }

    /// The key `row` is filed under in `index`. Columns missing from the
    /// row read as null.
    pub fn index_key(&self, index: &IndexDef, row: &Row) -> Vec<Value> {
        let mut key = Vec::with_capacity(index.columns().len());
        for part in index.columns() {
            let value = self
                .get_column_index(&part.name)
                .and_then(|pos| row.get(pos));
            key.push(value.cloned().unwrap_or(Value::Null));
        }
        key
    }

    /// The row as `(column name, value)` pairs.
    pub fn payload<'r>(&'r self, row: &'r Row) -> Vec<(&'r str, &'r Value)> {
        self.columns
            .iter()
            .map(|c| c.name())
            .zip(row.values())
            .collect()
    }

    /// Lays out `(column, value)` pairs as a full row. Columns that are
    /// not mentioned get their default.
    pub fn row_values(&self, values: &[(&str, Value)]) -> Result<Vec<Value>> {
        let mut out: Vec<Value> = self.columns.iter().map(Column::default_value).collect();
        for (name, value) in values {
            let column = self.column(name)?;
            match value.data_type() {
                Some(got) if got != column.data_type => {
                    return Err(Error::type_mismatch(column.data_type, got));
                }
                _ => out[column.position] = value.clone(),
            }
        }
        Ok(out)
    }
}

/// Collects columns, indices and constraints, then validates them as a
/// whole in `build`.
pub struct TableBuilder {
    name: String,
    columns: Vec<Column>,
    indices: Vec<IndexDef>,
    primary_key: Option<IndexDef>,
    foreign_keys: Vec<ForeignKey>,
    persistent_index: bool,
}

/// Table, column and index names: an ASCII letter or `_`, then letters,
/// digits or `_`.
fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first == '_' || first.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_schema(format!("invalid name: {:?}", name)))
    }
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            indices: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            persistent_index: false,
        })
    }

    fn indexable_column(&self, name: &str) -> Result<&Column> {
        let column = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::column_not_found(&self.name, name))?;
        if column.is_indexable() {
            Ok(column)
        } else {
            Err(Error::invalid_schema(format!(
                "{} cannot be indexed",
                column.normalized_name(&self.name)
            )))
        }
    }

    fn check_index_name(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let taken = self.indices.iter().any(|i| i.name() == name)
            || self.primary_key.as_ref().is_some_and(|pk| pk.name() == name);
        if taken {
            return Err(Error::invalid_schema(format!(
                "index {}.{} defined twice",
                self.name, name
            )));
        }
        Ok(())
    }

    /// Columns are laid out in the order they are added.
    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        if self.columns.iter().any(|c| c.name == name) {
            return Err(Error::invalid_schema(format!(
                "column {}.{} defined twice",
                self.name, name
            )));
        }
        let position = self.columns.len();
        self.columns.push(Column::new(name, data_type, position));
        Ok(self)
    }

    /// Unknown names are ignored.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for column in self.columns.iter_mut() {
            if columns.contains(&column.name.as_str()) {
                column.nullable = true;
            }
        }
        self
    }

    /// Declares the primary key, indexed as `pk<Table>`. Auto increment
    /// only applies to a single integer column.
    pub fn add_primary_key(mut self, columns: &[&str], auto_increment: bool) -> Result<Self> {
        let mut parts = Vec::with_capacity(columns.len());
        for name in columns {
            let column = self.indexable_column(name)?;
            let integer = matches!(column.data_type, DataType::Int32 | DataType::Int64);
            if auto_increment && columns.len() == 1 && !integer {
                return Err(Error::invalid_schema(format!(
                    "auto increment key {} must be an integer",
                    column.normalized_name(&self.name)
                )));
            }
            parts.push(IndexedColumn::new(*name, Order::Asc));
        }
        let pk_name = format!("pk{}", capitalize(&self.name));
        self.check_index_name(&pk_name)?;
        self.primary_key = Some(
            IndexDef::new(pk_name, &self.name, parts, true).with_auto_increment(auto_increment),
        );
        Ok(self)
    }

    /// A unique index. Uniqueness of a single column also makes it a
    /// valid foreign key target.
    pub fn add_unique(self, name: impl Into<String>, columns: &[&str]) -> Result<Self> {
        self.add_index(name, columns, true)
    }

    /// An index with every column ascending.
    pub fn add_index(self, name: impl Into<String>, columns: &[&str], unique: bool) -> Result<Self> {
        let ordered: Vec<(&str, Order)> = columns.iter().map(|c| (*c, Order::Asc)).collect();
        self.add_ordered_index(name, &ordered, unique)
    }

    pub fn add_ordered_index(
        mut self,
        name: impl Into<String>,
        columns: &[(&str, Order)],
        unique: bool,
    ) -> Result<Self> {
        let name = name.into();
        self.check_index_name(&name)?;
        let mut parts = Vec::with_capacity(columns.len());
        for (column, order) in columns {
            self.indexable_column(column)?;
            parts.push(IndexedColumn::new(*column, *order));
        }
        let def = IndexDef::new(name, &self.name, parts, unique);
        self.indices.push(def);
        Ok(self)
    }

    /// A restricting, immediately checked foreign key.
    pub fn add_foreign_key(
        self,
        name: impl Into<String>,
        child_column: &str,
        parent_table: &str,
        parent_column: &str,
    ) -> Result<Self> {
        self.add_foreign_key_with(
            name,
            child_column,
            parent_table,
            parent_column,
            ConstraintAction::Restrict,
            ConstraintTiming::Immediate,
        )
    }

    /// Declares a foreign key and indexes the child column under the
    /// constraint's name, so parents can find their children.
    pub fn add_foreign_key_with(
        mut self,
        name: impl Into<String>,
        child_column: &str,
        parent_table: &str,
        parent_column: &str,
        action: ConstraintAction,
        timing: ConstraintTiming,
    ) -> Result<Self> {
        let name = name.into();
        if self.foreign_keys.iter().any(|fk| fk.name == name) {
            return Err(Error::invalid_schema(format!(
                "foreign key {} defined twice",
                name
            )));
        }
        self.foreign_keys.push(ForeignKey {
            name: name.clone(),
            child_table: self.name.clone(),
            child_column: child_column.to_string(),
            parent_table: parent_table.to_string(),
            parent_column: parent_column.to_string(),
            action,
            timing,
        });
        self.add_index(name, &[child_column], false)
    }

    pub fn persistent_index(mut self, on: bool) -> Self {
        self.persistent_index = on;
        self
    }

    pub fn build(self) -> Result<Table> {
        let Self {
            name,
            mut columns,
            mut indices,
            primary_key,
            foreign_keys,
            persistent_index,
        } = self;

        if let Some(pk) = &primary_key {
            indices.insert(0, pk.clone());
        }
        for column in columns.iter_mut() {
            column.unique = indices.iter().any(|i| {
                i.is_unique() && i.is_single_column() && i.columns()[0].name == column.name
            });
        }
        let not_nullable = columns
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| c.name.clone())
            .collect();

        Ok(Table {
            name,
            columns,
            indices,
            constraints: Constraints {
                primary_key,
                not_nullable,
                foreign_keys,
            },
            persistent_index,
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
    out
}

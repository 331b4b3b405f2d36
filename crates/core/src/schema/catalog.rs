//! The set of tables an engine instance works against.

use super::constraint::ForeignKey;
use super::table::Table;
use crate::error::{Error, Result};
use alloc::format;
use alloc::vec::Vec;

/// A collection of table definitions.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table. Foreign keys may only reference tables that are
    /// already present (or the table itself).
    pub fn add_table(mut self, table: Table) -> Result<Self> {
        if self.get_table(table.name()).is_some() {
            return Err(Error::invalid_schema(format!(
                "Table already exists: {}",
                table.name()
            )));
        }
        for fk in table.constraints().foreign_keys() {
            let parent = if fk.parent_table == table.name() {
                &table
            } else {
                self.table(&fk.parent_table)?
            };
            let column = parent.column(&fk.parent_column)?;
            if !column.is_unique() {
                return Err(Error::invalid_schema(format!(
                    "Foreign key {} must reference a unique column",
                    fk.name
                )));
            }
        }
        self.tables.push(table);
        Ok(self)
    }

    /// Returns all tables in insertion order.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Looks up a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Looks up a table by name, failing with `TableNotFound`.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.get_table(name).ok_or_else(|| Error::table_not_found(name))
    }

    /// Returns the foreign keys whose parent is `parent_table`.
    pub fn foreign_keys_referencing(&self, parent_table: &str) -> Vec<&ForeignKey> {
        self.tables
            .iter()
            .flat_map(|t| t.constraints().foreign_keys())
            .filter(|fk| fk.parent_table == parent_table)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableBuilder;
    use crate::types::DataType;

    fn job() -> Table {
        TableBuilder::new("Job")
            .unwrap()
            .add_column("id", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .build()
            .unwrap()
    }

    fn employee() -> Table {
        TableBuilder::new("Employee")
            .unwrap()
            .add_column("id", DataType::Int64)
            .unwrap()
            .add_column("jobId", DataType::String)
            .unwrap()
            .add_primary_key(&["id"], false)
            .unwrap()
            .add_foreign_key("fkJob", "jobId", "Job", "id")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_referencing_foreign_keys() {
        let schema = Schema::new().add_table(job()).unwrap().add_table(employee()).unwrap();
        let refs = schema.foreign_keys_referencing("Job");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].child_table, "Employee");
        assert!(schema.foreign_keys_referencing("Employee").is_empty());
    }

    #[test]
    fn test_parent_must_exist() {
        let result = Schema::new().add_table(employee());
        assert!(matches!(result, Err(Error::TableNotFound { .. })));
    }

    #[test]
    fn test_duplicate_table() {
        let result = Schema::new().add_table(job()).unwrap().add_table(job());
        assert!(result.is_err());
    }
}

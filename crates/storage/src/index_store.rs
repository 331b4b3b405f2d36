//! Named index registry.
//!
//! Every index declared by the schema is created up front and addressed
//! by its normalized name (`table.index`).

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use strata_core::schema::{IndexDef, Schema, Table};
use strata_core::{Error, Result};
use strata_index::{Index, OrderedIndex};

/// Owns the indices of every table.
#[derive(Default)]
pub struct IndexStore {
    indices: BTreeMap<String, Box<dyn Index>>,
    /// Table name to the normalized names of its indices, primary key first.
    by_table: BTreeMap<String, Vec<String>>,
}

impl core::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexStore")
            .field("indices", &self.indices.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl IndexStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an `OrderedIndex` for every index of every table.
    pub fn from_schema(schema: &Schema) -> Self {
        let mut store = Self::new();
        for table in schema.tables() {
            store.register_table(table);
        }
        store
    }

    /// Creates the indices of `table`.
    pub fn register_table(&mut self, table: &Table) {
        let names = self.by_table.entry(table.name().to_string()).or_default();
        for def in table.indices() {
            let name = def.normalized_name();
            if !names.contains(&name) {
                names.push(name.clone());
            }
            self.indices.insert(name, Box::new(Self::build(def)));
        }
    }

    fn build(def: &IndexDef) -> OrderedIndex {
        OrderedIndex::new(def.normalized_name(), def.orders(), def.is_unique())
    }

    /// Looks up an index by normalized name.
    pub fn get(&self, name: &str) -> Option<&dyn Index> {
        self.indices.get(name).map(|idx| idx.as_ref())
    }

    /// Looks up an index by normalized name for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Index + 'static)> {
        self.indices.get_mut(name).map(|idx| idx.as_mut())
    }

    /// Like `get`, failing with `IndexNotFound`.
    pub fn index(&self, name: &str) -> Result<&dyn Index> {
        self.get(name).ok_or_else(|| Error::index_not_found(name))
    }

    /// Like `get_mut`, failing with `IndexNotFound`.
    pub fn index_mut(&mut self, name: &str) -> Result<&mut (dyn Index + 'static)> {
        self.get_mut(name).ok_or_else(|| Error::index_not_found(name))
    }

    /// Returns the indices of `table`, primary key first.
    pub fn table_indices(&self, table: &str) -> Vec<&dyn Index> {
        self.by_table
            .get(table)
            .map(|names| names.iter().filter_map(|n| self.get(n)).collect())
            .unwrap_or_default()
    }

    /// Returns the number of indices.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true if no index is registered.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

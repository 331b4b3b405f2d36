//! The shared in-memory state a journal mutates.

use crate::cache::RowCache;
use crate::index_store::IndexStore;
use alloc::vec::Vec;
use strata_core::schema::Schema;
use strata_core::{Row, RowId, RowIdGenerator, Value};

/// Cache, indices and row id allocation for one schema.
#[derive(Debug)]
pub struct Store {
    cache: RowCache,
    indices: IndexStore,
    row_ids: RowIdGenerator,
}

impl Store {
    /// Creates an empty store with an index for every index in `schema`.
    pub fn new(schema: &Schema) -> Self {
        let mut cache = RowCache::new();
        for table in schema.tables() {
            cache.create_table(table.name());
        }
        Self {
            cache,
            indices: IndexStore::from_schema(schema),
            row_ids: RowIdGenerator::starting_at(1),
        }
    }

    /// Allocates a row id and wraps `values` in a row.
    pub fn create_row(&mut self, values: Vec<Value>) -> Row {
        Row::new(self.row_ids.next_id(), values)
    }

    /// Allocates a fresh row id.
    pub fn next_row_id(&mut self) -> RowId {
        self.row_ids.next_id()
    }

    /// Records that `id` is in use.
    pub fn observe_row_id(&mut self, id: RowId) {
        self.row_ids.bump_past(id);
    }

    #[inline]
    pub fn cache(&self) -> &RowCache {
        &self.cache
    }

    #[inline]
    pub fn indices(&self) -> &IndexStore {
        &self.indices
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut RowCache, &mut IndexStore) {
        (&mut self.cache, &mut self.indices)
    }
}
